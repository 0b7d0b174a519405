//! Provider abstractions for embeddings and chat completion
//!
//! Remote backends are trait objects so the service can run against
//! llama.cpp, Ollama or in-process fakes without changing callers.

pub mod embedding;
pub mod llm;
pub mod ollama;
pub mod openai;
pub mod retry;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, EmbeddingConfig, LlmConfig};
use crate::error::Result;

pub use embedding::EmbeddingProvider;
pub use llm::{ChatMessage, LlmProvider, Role};
pub use ollama::OllamaEmbedder;
pub use openai::{OpenAiChatClient, OpenAiEmbedder};
pub use retry::RetryPolicy;

/// Build the embedding provider selected in config
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingBackend::OpenAi => Arc::new(OpenAiEmbedder::new(config)?),
        EmbeddingBackend::Ollama => Arc::new(OllamaEmbedder::new(config)?),
    };
    tracing::info!(
        provider = provider.name(),
        model = %config.model,
        dimensions = config.dimensions,
        "Embedding provider initialized"
    );
    Ok(provider)
}

/// Build the chat completion client
pub fn build_llm(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    let llm = Arc::new(OpenAiChatClient::new(config)?);
    tracing::info!(base_url = %config.base_url, model = %config.model, "Chat client initialized");
    Ok(llm)
}

/// Join a base URL and an API path, tolerating a trailing slash and a base
/// that already ends in `/v1`
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    match (base.ends_with("/v1"), path.strip_prefix("/v1")) {
        (true, Some(rest)) => format!("{}{}", base, rest),
        _ => format!("{}{}", base, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        assert_eq!(
            endpoint("http://localhost:8080", "/v1/embeddings"),
            "http://localhost:8080/v1/embeddings"
        );
        assert_eq!(
            endpoint("http://localhost:8080/", "/v1/models"),
            "http://localhost:8080/v1/models"
        );
        assert_eq!(
            endpoint("http://localhost:8080/v1", "/v1/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
        assert_eq!(
            endpoint("http://localhost:11434", "/api/tags"),
            "http://localhost:11434/api/tags"
        );
    }
}
