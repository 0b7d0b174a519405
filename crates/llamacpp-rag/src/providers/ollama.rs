//! Ollama embedding provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::endpoint;
use super::retry::RetryPolicy;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Client,
    config: EmbeddingConfig,
    retry: RetryPolicy,
}

impl OllamaEmbedder {
    /// Create a new Ollama embedder
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()?;

        Ok(Self {
            client,
            retry: RetryPolicy::new(config.max_retries),
            config: config.clone(),
        })
    }

    /// Override the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request(&self, text: &str) -> Result<Vec<f32>> {
        let url = endpoint(&self.config.base_url, "/api/embeddings");
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.config.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Embedding failed: HTTP {} - {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        Error::check_dimensions(self.config.dimensions, parsed.embedding.len())?;
        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.retry.run(|| self.request(text)).await
    }

    // Ollama's /api/embeddings takes one prompt per call, so the default
    // sequential embed_batch applies.

    fn dimensions(&self) -> usize {
        self.config.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        let url = endpoint(&self.config.base_url, "/api/tags");
        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_server;
    use axum::{routing::get, routing::post, Json, Router};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_embed_batch_calls_per_text() {
        let router = Router::new()
            .route(
                "/api/embeddings",
                post(|Json(body): Json<Value>| async move {
                    let len = body["prompt"].as_str().map_or(0, |p| p.len()) as f32;
                    Json(json!({"embedding": [len, 1.0]}))
                }),
            )
            .route("/api/tags", get(|| async { Json(json!({"models": []})) }));
        let base = spawn_server(router).await;

        let embedder = OllamaEmbedder::new(&EmbeddingConfig {
            base_url: base,
            dimensions: 2,
            ..EmbeddingConfig::default()
        })
        .unwrap();

        let vectors = embedder
            .embed_batch(&["ab".to_string(), "abcd".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors, vec![vec![2.0, 1.0], vec![4.0, 1.0]]);
        assert!(embedder.health_check().await.unwrap());
        assert_eq!(embedder.name(), "ollama");
    }
}
