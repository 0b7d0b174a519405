//! Process-local vector store

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Chunk, RetrievedChunk, SearchFilter};

use super::{cosine_similarity, VectorStoreProvider};

/// Brute-force cosine search over chunks held in memory
pub struct InMemoryVectorStore {
    chunks: RwLock<HashMap<Uuid, Chunk>>,
    dimensions: usize,
}

impl InMemoryVectorStore {
    pub fn new(dimensions: usize) -> Self {
        Self {
            chunks: RwLock::new(HashMap::new()),
            dimensions,
        }
    }
}

#[async_trait]
impl VectorStoreProvider for InMemoryVectorStore {
    async fn add(&self, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            Error::check_dimensions(self.dimensions, chunk.embedding.len())?;
        }

        let mut stored = self.chunks.write();
        for chunk in chunks {
            stored.insert(chunk.id, chunk.clone());
        }
        Ok(())
    }

    async fn replace_source(&self, source: &str, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            Error::check_dimensions(self.dimensions, chunk.embedding.len())?;
        }

        let mut stored = self.chunks.write();
        stored.retain(|_, chunk| chunk.metadata.source != source);
        for chunk in chunks {
            stored.insert(chunk.id, chunk.clone());
        }
        Ok(())
    }

    async fn similarity_search(
        &self,
        embedding: &[f32],
        top_k: usize,
        threshold: f32,
        filter: &SearchFilter,
    ) -> Result<Vec<RetrievedChunk>> {
        Error::check_dimensions(self.dimensions, embedding.len())?;

        let stored = self.chunks.read();
        let mut results: Vec<RetrievedChunk> = stored
            .values()
            .filter(|chunk| filter.matches(&chunk.metadata))
            .map(|chunk| RetrievedChunk {
                score: cosine_similarity(embedding, &chunk.embedding),
                chunk: chunk.clone(),
            })
            .filter(|r| r.score >= threshold)
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        Ok(results)
    }

    async fn delete_by_source(&self, source: &str) -> Result<usize> {
        let mut stored = self.chunks.write();
        let before = stored.len();
        stored.retain(|_, chunk| chunk.metadata.source != source);
        Ok(before - stored.len())
    }

    async fn source_hash(&self, source: &str) -> Result<Option<String>> {
        Ok(self
            .chunks
            .read()
            .values()
            .find(|chunk| chunk.metadata.source == source)
            .map(|chunk| chunk.metadata.content_hash.clone()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.chunks.read().len())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "memory"
    }
}
