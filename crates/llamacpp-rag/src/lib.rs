//! llamacpp-rag: retrieval-augmented question answering over local documents
//!
//! PDF, text and Markdown files are split into token windows, embedded through
//! an OpenAI-compatible (llama.cpp) or Ollama endpoint and stored in
//! PostgreSQL with pgvector. Questions are answered by a llama.cpp chat model
//! prompted with the most similar chunks, behind an answer cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use server::RagServer;
pub use types::{Chunk, Document, FileType, IngestResult, QueryRequest, QueryResponse};
