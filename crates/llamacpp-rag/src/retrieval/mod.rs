//! Query-time retrieval: embed the question, search the vector store

mod retriever;

pub use retriever::Retriever;
