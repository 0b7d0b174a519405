//! Prompt templates for RAG generation

use crate::types::RetrievedChunk;

const CONTEXT_TEMPLATE: &str = r#"Context information is below.

---------------------
{context}
---------------------

Given the context information and no prior knowledge, answer the query.

Follow these rules:

1. If the answer is not in the context, just say that you don't know.
2. Avoid statements like "Based on the context..." or "The provided information...".

Query: {query}

Answer:"#;

const EMPTY_CONTEXT_TEMPLATE: &str = r#"The user query is outside your knowledge base.
Politely inform the user that you can't answer it.

Query: {query}

Answer:"#;

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Chunk texts joined by blank lines, best match first
    pub fn build_context(results: &[RetrievedChunk]) -> String {
        results
            .iter()
            .map(|r| r.chunk.content.trim())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// The user message sent to the model: the query augmented with context,
    /// or the out-of-scope prompt when nothing was retrieved
    pub fn build_augmented_prompt(query: &str, results: &[RetrievedChunk]) -> String {
        if results.is_empty() {
            return EMPTY_CONTEXT_TEMPLATE.replace("{query}", query);
        }
        // context is substituted last so chunk text containing "{query}" stays literal
        CONTEXT_TEMPLATE
            .replace("{query}", query)
            .replace("{context}", &Self::build_context(results))
    }
}
