//! Retrieval-augmented chat client

use std::sync::Arc;

use crate::error::Result;
use crate::providers::{ChatMessage, LlmProvider};
use crate::retrieval::Retriever;
use crate::types::{QueryRequest, RetrievedChunk};

use super::prompt::PromptBuilder;

/// Answer plus the chunks it was grounded on
#[derive(Debug, Clone)]
pub struct GeneratedAnswer {
    pub answer: String,
    pub sources: Vec<RetrievedChunk>,
}

/// Retrieves context for a query, augments the prompt and calls the model
#[derive(Clone)]
pub struct AugmentedChatClient {
    retriever: Retriever,
    llm: Arc<dyn LlmProvider>,
    system_prompt: Option<String>,
}

impl AugmentedChatClient {
    pub fn new(retriever: Retriever, llm: Arc<dyn LlmProvider>) -> Self {
        Self {
            retriever,
            llm,
            system_prompt: None,
        }
    }

    /// Prepend a system message to every conversation
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Retrieve, augment, generate
    pub async fn call(&self, query: &QueryRequest) -> Result<GeneratedAnswer> {
        let sources = self.retriever.retrieve(query).await?;
        let prompt = PromptBuilder::build_augmented_prompt(query.question.trim(), &sources);

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(prompt));

        for message in &messages {
            tracing::info!(role = ?message.role, "AUGMENTED PROMPT [REQ]: {}", message.content);
        }

        let answer = self.llm.complete(&messages).await?;
        tracing::info!(
            model = self.llm.model(),
            sources = sources.len(),
            "AUGMENTED PROMPT RESPONSE: {}",
            answer
        );

        Ok(GeneratedAnswer { answer, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::providers::{EmbeddingProvider, Role};
    use crate::storage::{InMemoryVectorStore, VectorStoreProvider};
    use crate::testing::{FakeEmbedder, FakeLlm};
    use crate::types::{Chunk, Document, FileType};

    #[tokio::test]
    async fn test_call_sends_context_to_model() {
        let embedder = Arc::new(FakeEmbedder::new(256));
        let store = Arc::new(InMemoryVectorStore::new(256));
        let text = "The pgvector extension adds the vector column type to postgres";
        let doc = Document::new("/data/pg.md", FileType::Markdown, "h", text);
        let embedding = embedder.embed(text).await.unwrap();
        store
            .add(&[Chunk::new(text, doc.chunk_metadata(0)).with_embedding(embedding)])
            .await
            .unwrap();

        let llm = Arc::new(FakeLlm::new("It adds a vector column type."));
        let client = AugmentedChatClient::new(
            Retriever::new(embedder, store, RetrievalConfig::default()),
            llm.clone(),
        )
        .with_system_prompt(Some("You answer briefly.".to_string()));

        let result = client
            .call(&QueryRequest::new(
                "What does the pgvector extension add to the postgres vector column type?",
            ))
            .await
            .unwrap();

        assert_eq!(result.answer, "It adds a vector column type.");
        assert_eq!(result.sources.len(), 1);

        let messages = llm.last_messages.lock().clone();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[1].content.contains(text));
    }

    #[tokio::test]
    async fn test_call_without_matches_uses_out_of_scope_prompt() {
        let embedder = Arc::new(FakeEmbedder::new(256));
        let store = Arc::new(InMemoryVectorStore::new(256));
        let llm = Arc::new(FakeLlm::new("Sorry, I can't answer that."));
        let client = AugmentedChatClient::new(
            Retriever::new(embedder, store, RetrievalConfig::default()),
            llm.clone(),
        );

        let result = client.call(&QueryRequest::new("Who painted the Mona Lisa?")).await.unwrap();
        assert!(result.sources.is_empty());
        assert!(llm.last_prompt().contains("outside your knowledge base"));
    }
}
