//! Application state for the RAG server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::cache::AnswerCache;
use crate::config::RagConfig;
use crate::error::Result;
use crate::generation::{AugmentedChatClient, RagChatService};
use crate::ingestion::DocumentIngestor;
use crate::providers::{build_embedder, build_llm, EmbeddingProvider, LlmProvider};
use crate::retrieval::Retriever;
use crate::storage::{build_vector_store, VectorStoreProvider};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    vector_store: Arc<dyn VectorStoreProvider>,
    answer_cache: Arc<AnswerCache>,
    chat: RagChatService,
    ingestor: DocumentIngestor,
    ready: RwLock<bool>,
}

impl AppState {
    /// Connect to the configured backends and wire the services
    pub async fn new(config: RagConfig) -> Result<Self> {
        tracing::info!(
            embeddings = ?config.embeddings.provider,
            vector_store = ?config.vector_db.backend,
            "Initializing RAG application state..."
        );

        let embedder = build_embedder(&config.embeddings)?;
        let llm = build_llm(&config.llm)?;
        let vector_store = build_vector_store(&config).await?;

        Ok(Self::from_parts(config, embedder, llm, vector_store))
    }

    /// Wire the services around already-built providers
    pub fn from_parts(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        vector_store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        let answer_cache = Arc::new(AnswerCache::from_config(&config.cache));

        let retriever = Retriever::new(
            Arc::clone(&embedder),
            Arc::clone(&vector_store),
            config.retrieval.clone(),
        );
        let client = AugmentedChatClient::new(retriever, Arc::clone(&llm))
            .with_system_prompt(config.llm.system_prompt.clone());
        let chat = RagChatService::new(client, Arc::clone(&answer_cache));

        let ingestor =
            DocumentIngestor::from_config(&config, Arc::clone(&embedder), Arc::clone(&vector_store))
                .with_cache(Arc::clone(&answer_cache));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                embedder,
                llm,
                vector_store,
                answer_cache,
                chat,
                ingestor,
                ready: RwLock::new(true),
            }),
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedder
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.inner.llm
    }

    pub fn vector_store(&self) -> &Arc<dyn VectorStoreProvider> {
        &self.inner.vector_store
    }

    pub fn answer_cache(&self) -> &Arc<AnswerCache> {
        &self.inner.answer_cache
    }

    pub fn chat(&self) -> &RagChatService {
        &self.inner.chat
    }

    pub fn ingestor(&self) -> &DocumentIngestor {
        &self.inner.ingestor
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
