//! Document and chunk types with source tracking

use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document, ingested page by page
    Pdf,
    /// Plain text file
    Txt,
    /// Markdown file
    #[serde(rename = "md")]
    Markdown,
}

impl FileType {
    /// Detect file type from a file name, case-insensitively
    pub fn from_filename(name: &str) -> Option<Self> {
        let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        Self::from_extension(&ext)
    }

    /// Detect file type from an extension without the dot
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Txt),
            "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    /// Value stored in the `fileType` metadata field
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Txt => "txt",
            Self::Markdown => "md",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw text extracted from a file (or one PDF page) before splitting.
///
/// Documents are never persisted; only their chunks are.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Absolute path or uploaded file name
    pub source: String,
    /// File type
    pub file_type: FileType,
    /// 1-based page number for PDFs
    pub page: Option<u32>,
    /// SHA-256 of the whole source file
    pub content_hash: String,
    /// Extracted text
    pub content: String,
}

impl Document {
    /// Create a document for a whole text file
    pub fn new(
        source: impl Into<String>,
        file_type: FileType,
        content_hash: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            file_type,
            page: None,
            content_hash: content_hash.into(),
            content: content.into(),
        }
    }

    /// Attach a page number
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Metadata inherited by the chunk at `chunk_index`
    pub fn chunk_metadata(&self, chunk_index: usize) -> ChunkMetadata {
        ChunkMetadata {
            source: self.source.clone(),
            file_type: self.file_type,
            page: self.page,
            chunk_index,
            content_hash: self.content_hash.clone(),
        }
    }
}

/// Metadata stored alongside each chunk (the pgvector `metadata` jsonb column)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChunkMetadata {
    /// Source document identity
    pub source: String,
    /// File type of the source
    pub file_type: FileType,
    /// Page number (PDF only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Position within the split document (0-based)
    pub chunk_index: usize,
    /// SHA-256 of the source file at ingestion time
    pub content_hash: String,
}

/// An immutable chunk of a document, optionally carrying its embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Chunk text
    pub content: String,
    /// Embedding vector (empty until embedded)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// Back-reference to the source document and position
    pub metadata: ChunkMetadata,
}

impl Chunk {
    /// Create a chunk without an embedding
    pub fn new(content: impl Into<String>, metadata: ChunkMetadata) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            embedding: Vec::new(),
            metadata,
        }
    }

    /// Attach an embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }
}
