//! Core types for the RAG service

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkMetadata, Document, FileType};
pub use query::{ChatParams, QueryRequest, SearchFilter};
pub use response::{
    CacheStatsResponse, ChatResponse, IngestResult, QueryResponse, RetrievedChunk, SourceRef,
};
