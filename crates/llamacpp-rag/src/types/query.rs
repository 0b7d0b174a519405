//! Query request types

use serde::{Deserialize, Serialize};

use super::document::{ChunkMetadata, FileType};

/// Query request for `POST /api/query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub question: String,
    /// Number of chunks to retrieve (default from config)
    #[serde(default)]
    pub top_k: Option<usize>,
    /// Minimum similarity score (default from config)
    #[serde(default)]
    pub similarity_threshold: Option<f32>,
    /// Only search chunks from these sources
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    /// Only search chunks of these file types
    #[serde(default)]
    pub file_types: Option<Vec<FileType>>,
}

impl QueryRequest {
    /// Create a query with default retrieval parameters
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    /// Set top_k
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Set similarity threshold
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = Some(threshold);
        self
    }

    /// Restrict to the given sources
    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = Some(sources);
        self
    }

    /// Metadata filter for the vector store
    pub fn filter(&self) -> SearchFilter {
        SearchFilter {
            sources: self.sources.clone(),
            file_types: self.file_types.clone(),
        }
    }

    /// Reject parameters outside their valid range
    pub fn validate(&self) -> crate::Result<()> {
        if self.question.trim().is_empty() {
            return Err(crate::Error::bad_request("question must not be empty"));
        }
        if self.top_k == Some(0) {
            return Err(crate::Error::bad_request("top_k must be > 0"));
        }
        if let Some(t) = self.similarity_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(crate::Error::bad_request(
                    "similarity_threshold must be within [0, 1]",
                ));
            }
        }
        Ok(())
    }
}

/// Metadata filter applied during similarity search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    /// Exact `source` values to match
    pub sources: Option<Vec<String>>,
    /// File types to match
    pub file_types: Option<Vec<FileType>>,
}

impl SearchFilter {
    /// True when no constraint is set
    pub fn is_empty(&self) -> bool {
        self.sources.is_none() && self.file_types.is_none()
    }

    /// Whether a chunk's metadata passes the filter
    pub fn matches(&self, metadata: &ChunkMetadata) -> bool {
        let source_ok = self
            .sources
            .as_ref()
            .map_or(true, |s| s.iter().any(|src| *src == metadata.source));
        let type_ok = self
            .file_types
            .as_ref()
            .map_or(true, |t| t.contains(&metadata.file_type));
        source_ok && type_ok
    }

    /// File type names as stored in metadata, for SQL binding
    pub fn file_type_names(&self) -> Option<Vec<String>> {
        self.file_types
            .as_ref()
            .map(|types| types.iter().map(|t| t.as_str().to_string()).collect())
    }
}

/// Query string of `GET /api/chat`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatParams {
    /// The question; absent or blank is a bad request
    pub q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(source: &str, file_type: FileType) -> ChunkMetadata {
        ChunkMetadata {
            source: source.to_string(),
            file_type,
            page: None,
            chunk_index: 0,
            content_hash: String::new(),
        }
    }

    #[test]
    fn test_filter_matching() {
        let empty = SearchFilter::default();
        assert!(empty.is_empty());
        assert!(empty.matches(&meta("/a.pdf", FileType::Pdf)));

        let by_source = QueryRequest::new("q")
            .with_sources(vec!["/a.pdf".to_string()])
            .filter();
        assert!(by_source.matches(&meta("/a.pdf", FileType::Pdf)));
        assert!(!by_source.matches(&meta("/b.pdf", FileType::Pdf)));

        let by_type = SearchFilter {
            sources: None,
            file_types: Some(vec![FileType::Markdown]),
        };
        assert!(by_type.matches(&meta("/notes.md", FileType::Markdown)));
        assert!(!by_type.matches(&meta("/a.pdf", FileType::Pdf)));
        assert_eq!(by_type.file_type_names(), Some(vec!["md".to_string()]));
    }

    #[test]
    fn test_request_validation() {
        assert!(QueryRequest::new("What is pgvector?").validate().is_ok());
        assert!(QueryRequest::new("   ").validate().is_err());
        assert!(QueryRequest::new("q").with_top_k(0).validate().is_err());
        assert!(QueryRequest::new("q").with_threshold(1.2).validate().is_err());
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let req: QueryRequest =
            serde_json::from_str(r#"{"question": "What is HNSW?", "file_types": ["pdf"]}"#)
                .unwrap();
        assert_eq!(req.top_k, None);
        assert_eq!(req.file_types, Some(vec![FileType::Pdf]));
    }
}
