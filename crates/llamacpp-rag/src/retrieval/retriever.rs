//! Top-K similarity retrieval

use std::sync::Arc;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::storage::VectorStoreProvider;
use crate::types::{QueryRequest, RetrievedChunk};

/// Embeds queries and fetches the most similar chunks
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    defaults: RetrievalConfig,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
        defaults: RetrievalConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            defaults,
        }
    }

    /// Retrieval defaults applied when a query leaves them unset
    pub fn defaults(&self) -> &RetrievalConfig {
        &self.defaults
    }

    /// Chunks scoring at least the threshold, best first, at most top_k
    pub async fn retrieve(&self, query: &QueryRequest) -> Result<Vec<RetrievedChunk>> {
        query.validate()?;

        let top_k = query.top_k.unwrap_or(self.defaults.top_k);
        let threshold = query
            .similarity_threshold
            .unwrap_or(self.defaults.similarity_threshold);

        let embedding = self.embedder.embed(query.question.trim()).await?;
        Error::check_dimensions(self.store.dimensions(), embedding.len())?;

        let mut results = self
            .store
            .similarity_search(&embedding, top_k, threshold, &query.filter())
            .await?;

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);

        tracing::debug!(
            top_k,
            threshold,
            found = results.len(),
            best = results.first().map(|r| r.score),
            "Retrieved chunks"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryVectorStore;
    use crate::testing::FakeEmbedder;
    use crate::types::{Chunk, Document, FileType};

    async fn seeded() -> Retriever {
        let embedder = Arc::new(FakeEmbedder::new(256));
        let store = Arc::new(InMemoryVectorStore::new(256));

        let texts = [
            ("/docs/pgvector.md", "pgvector stores embeddings inside postgres tables"),
            ("/docs/llama.md", "llama server exposes chat completions over http"),
            ("/docs/cooking.txt", "bake bread with flour water yeast and salt"),
        ];
        let mut chunks = Vec::new();
        for (source, text) in texts {
            let doc = Document::new(source, FileType::Markdown, "h", text);
            let embedding = embedder.embed(text).await.unwrap();
            chunks.push(Chunk::new(text, doc.chunk_metadata(0)).with_embedding(embedding));
        }
        store.add(&chunks).await.unwrap();

        Retriever::new(embedder, store, RetrievalConfig::default())
    }

    #[tokio::test]
    async fn test_retrieves_best_match_first() {
        let retriever = seeded().await;
        let results = retriever
            .retrieve(&QueryRequest::new("how does pgvector store embeddings").with_threshold(0.1))
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].chunk.metadata.source, "/docs/pgvector.md");
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_threshold_excludes_unrelated() {
        let retriever = seeded().await;
        let results = retriever
            .retrieve(&QueryRequest::new("quantum chromodynamics lattice"))
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_top_k_and_filters() {
        let retriever = seeded().await;
        let all = retriever
            .retrieve(&QueryRequest::new("embeddings chat bread").with_threshold(0.0).with_top_k(2))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let only_llama = retriever
            .retrieve(
                &QueryRequest::new("embeddings chat bread")
                    .with_threshold(0.0)
                    .with_sources(vec!["/docs/llama.md".to_string()]),
            )
            .await
            .unwrap();
        assert_eq!(only_llama.len(), 1);
        assert_eq!(only_llama[0].chunk.metadata.source, "/docs/llama.md");
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let retriever = seeded().await;
        let err = retriever.retrieve(&QueryRequest::new("  ")).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }
}
