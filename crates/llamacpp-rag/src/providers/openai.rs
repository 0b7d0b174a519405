//! OpenAI-compatible clients for a llama.cpp server
//!
//! llama.cpp's `llama-server` exposes `/v1/chat/completions`, `/v1/embeddings`
//! (when started with `--embedding`) and `/v1/models`.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::endpoint;
use super::llm::{ChatMessage, LlmProvider};
use super::retry::RetryPolicy;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

fn http_client(timeout_secs: u64) -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .pool_max_idle_per_host(5)
        .build()?)
}

fn with_auth(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) if !key.is_empty() => request.bearer_auth(key),
        _ => request,
    }
}

/// Status plus the server's error message, or the raw body when it is not
/// an OpenAI error object
async fn describe_failure(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    format!("HTTP {} - {}", status, message)
}

/// `GET /v1/models`, used as a liveness probe
async fn models_ok(client: &Client, base_url: &str, api_key: Option<&str>) -> bool {
    let url = endpoint(base_url, "/v1/models");
    match with_auth(client.get(&url), api_key).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Embeddings through `POST /v1/embeddings`
pub struct OpenAiEmbedder {
    client: Client,
    config: EmbeddingConfig,
    retry: RetryPolicy,
}

impl OpenAiEmbedder {
    /// Create a new embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            retry: RetryPolicy::new(config.max_retries),
            config: config.clone(),
        })
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = endpoint(&self.config.base_url, "/v1/embeddings");
        let body = EmbeddingRequest {
            model: &self.config.model,
            input: texts,
        };

        tracing::debug!(model = %self.config.model, count = texts.len(), "Requesting embeddings");

        let response = with_auth(self.client.post(&url), self.config.api_key.as_deref())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let failure = describe_failure(response).await;
            tracing::error!(url = %url, "Embedding request rejected: {}", failure);
            return Err(Error::embedding(failure));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        let embeddings: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();
        for embedding in &embeddings {
            Error::check_dimensions(self.config.dimensions, embedding.len())?;
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = [text.to_string()];
        let mut embeddings = self.embed_batch(&input).await?;
        embeddings
            .pop()
            .ok_or_else(|| Error::embedding("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.retry.run(|| self.request(texts)).await
    }

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(models_ok(&self.client, &self.config.base_url, self.config.api_key.as_deref()).await)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Chat completions through `POST /v1/chat/completions`
pub struct OpenAiChatClient {
    client: Client,
    config: LlmConfig,
    retry: RetryPolicy,
}

impl OpenAiChatClient {
    /// Create a new chat client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            retry: RetryPolicy::new(config.max_retries),
            config: config.clone(),
        })
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = endpoint(&self.config.base_url, "/v1/chat/completions");
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let response = with_auth(self.client.post(&url), self.config.api_key.as_deref())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Chat request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::llm(format!(
                "Chat completion failed: {}",
                describe_failure(response).await
            )));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse chat response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| Error::llm("Chat completion returned no choices"))
    }
}

#[async_trait]
impl LlmProvider for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        tracing::info!(model = %self.config.model, messages = messages.len(), "Requesting chat completion");
        self.retry.run(|| self.request(messages)).await
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(models_ok(&self.client, &self.config.base_url, self.config.api_key.as_deref()).await)
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
