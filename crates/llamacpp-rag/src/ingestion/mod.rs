//! Document ingestion: PDF, text and Markdown files into the vector store

pub(crate) mod parser;
mod processor;
mod splitter;

pub use parser::{hash_content, FileParser};
pub use processor::DocumentIngestor;
pub use splitter::TokenTextSplitter;
