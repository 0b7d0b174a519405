//! Vector storage: chunk text, embedding and metadata with similarity search

mod memory;
mod pgvector;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::{RagConfig, VectorStoreBackend};
use crate::error::Result;
use crate::types::{Chunk, RetrievedChunk, SearchFilter};

pub use memory::InMemoryVectorStore;
pub use pgvector::PgVectorStore;

/// Trait for vector storage and similarity search
///
/// Every stored and queried vector must be exactly [`dimensions`] long;
/// implementations reject anything else with `Error::EmbeddingDimension`.
///
/// Implementations:
/// - `PgVectorStore`: PostgreSQL + pgvector (HNSW, cosine)
/// - `InMemoryVectorStore`: brute-force cosine search in process memory
///
/// [`dimensions`]: VectorStoreProvider::dimensions
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Store embedded chunks
    async fn add(&self, chunks: &[Chunk]) -> Result<()>;

    /// Chunks scoring at least `threshold`, best first, at most `top_k`
    async fn similarity_search(
        &self,
        embedding: &[f32],
        top_k: usize,
        threshold: f32,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievedChunk>>;

    /// Swap every stored chunk of `source` for `chunks` in one step
    ///
    /// On error the previously stored chunks of the source are left in place.
    async fn replace_source(&self, source: &str, chunks: &[Chunk]) -> Result<()>;

    /// Delete all chunks of a source, returning how many were removed
    async fn delete_by_source(&self, source: &str) -> Result<usize>;

    /// Content hash recorded for a source, if any of its chunks are stored
    async fn source_hash(&self, source: &str) -> Result<Option<String>>;

    /// Get total number of chunks stored
    async fn count(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.count().await? == 0)
    }

    /// Check if the backend is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Embedding width of the store
    fn dimensions(&self) -> usize;

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Build the vector store selected in config
pub async fn build_vector_store(config: &RagConfig) -> Result<Arc<dyn VectorStoreProvider>> {
    let dimensions = config.embeddings.dimensions;
    let store: Arc<dyn VectorStoreProvider> = match config.vector_db.backend {
        VectorStoreBackend::PgVector => {
            Arc::new(PgVectorStore::connect(&config.vector_db, dimensions).await?)
        }
        VectorStoreBackend::Memory => Arc::new(InMemoryVectorStore::new(dimensions)),
    };
    tracing::info!(backend = store.name(), dimensions, "Vector store initialized");
    Ok(store)
}

/// Cosine similarity; zero when either vector has zero norm
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
