//! Response types for ingestion, chat and query endpoints

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::Chunk;

/// A chunk returned by similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedChunk {
    /// The matched chunk
    pub chunk: Chunk,
    /// Cosine similarity (1 - cosine distance)
    pub score: f32,
}

/// Source reference returned with query answers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub chunk_id: Uuid,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    pub chunk_index: usize,
    pub content: String,
    pub score: f32,
}

impl From<&RetrievedChunk> for SourceRef {
    fn from(result: &RetrievedChunk) -> Self {
        Self {
            chunk_id: result.chunk.id,
            source: result.chunk.metadata.source.clone(),
            page: result.chunk.metadata.page,
            chunk_index: result.chunk.metadata.chunk_index,
            content: result.chunk.content.clone(),
            score: result.score,
        }
    }
}

/// Body of `GET /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub question: String,
    pub answer: String,
}

/// Body of `POST /api/query`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// The question as asked
    pub question: String,
    /// Generated answer
    pub answer: String,
    /// Chunks the answer was grounded on, best first
    pub sources: Vec<SourceRef>,
    /// Whether the answer came from the cache
    pub cached: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Outcome of an ingestion run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestResult {
    /// Raw documents extracted (PDF pages count individually)
    pub documents: usize,
    /// Chunks written to the vector store
    pub chunks: usize,
    /// Files skipped because their content was already stored
    #[serde(default)]
    pub unchanged: usize,
    /// Per-file problems; a warning never aborts the run
    pub warnings: Vec<String>,
}

impl IngestResult {
    /// Result carrying a single warning
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            warnings: vec![message.into()],
            ..Default::default()
        }
    }

    /// Fold another result into this one
    pub fn merge(&mut self, other: IngestResult) {
        self.documents += other.documents;
        self.chunks += other.chunks;
        self.unchanged += other.unchanged;
        self.warnings.extend(other.warnings);
    }
}

/// Body of `GET /api/cache/stats`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatsResponse {
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
    pub eviction_count: u64,
    pub estimated_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_result_merge() {
        let mut total = IngestResult::default();
        total.merge(IngestResult {
            documents: 3,
            chunks: 7,
            unchanged: 0,
            warnings: vec![],
        });
        total.merge(IngestResult::warning("Failed reading PDF /x.pdf: bad header"));
        assert_eq!(total.documents, 3);
        assert_eq!(total.chunks, 7);
        assert_eq!(total.warnings.len(), 1);
    }

    #[test]
    fn test_cache_stats_field_names() {
        let stats = CacheStatsResponse {
            hit_count: 2,
            miss_count: 2,
            hit_rate: 0.5,
            eviction_count: 0,
            estimated_size: 1,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["hitCount"], 2);
        assert_eq!(json["missCount"], 2);
        assert_eq!(json["hitRate"], 0.5);
        assert_eq!(json["evictionCount"], 0);
        assert_eq!(json["estimatedSize"], 1);
    }
}
