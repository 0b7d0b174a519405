//! Cached question answering

use std::sync::Arc;
use std::time::Instant;

use crate::cache::{AnswerCache, CachedAnswer};
use crate::error::{Error, Result};
use crate::types::{QueryRequest, QueryResponse, SourceRef};

use super::client::AugmentedChatClient;

/// Answers that are never cached
const UNCACHEABLE_ANSWER: &str = "I don't know";

/// Question answering with an answer cache in front of the model
pub struct RagChatService {
    client: AugmentedChatClient,
    cache: Arc<AnswerCache>,
}

impl RagChatService {
    pub fn new(client: AugmentedChatClient, cache: Arc<AnswerCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<AnswerCache> {
        &self.cache
    }

    /// Answer a question with default retrieval parameters
    pub async fn ask(&self, question: &str) -> Result<String> {
        let response = self.query(QueryRequest::new(question)).await?;
        Ok(response.answer)
    }

    /// Answer a query, returning the sources used
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        let started = Instant::now();
        request.validate()?;

        tracing::info!("QUESTION: {}", request.question);
        let key = self.cache_key(&request);

        if let Some(cached) = self.cache.get(&key) {
            tracing::info!(key = %key, "CACHE HIT");
            return Ok(QueryResponse {
                question: request.question,
                answer: cached.answer,
                sources: cached.sources,
                cached: true,
                processing_time_ms: started.elapsed().as_millis() as u64,
            });
        }

        tracing::info!(key = %key, "CACHE MISS");
        let generation = self.cache.generation();
        tracing::info!("AI REQUEST: {}", request.question);

        let generated = self.client.call(&request).await?;
        tracing::info!("AI RESPONSE: {}", generated.answer);

        let sources: Vec<SourceRef> = generated.sources.iter().map(SourceRef::from).collect();

        if is_cacheable(&generated.answer) {
            self.cache.put_if_current(
                key,
                CachedAnswer {
                    answer: generated.answer.clone(),
                    sources: sources.clone(),
                },
                generation,
            );
        } else {
            tracing::debug!("Answer not cached");
        }

        Ok(QueryResponse {
            question: request.question,
            answer: generated.answer,
            sources,
            cached: false,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Question key, extended with any retrieval parameter that differs from
    /// the defaults so `ask` and default `query` calls share entries
    fn cache_key(&self, request: &QueryRequest) -> String {
        let defaults = self.client.retriever().defaults();
        let mut key = AnswerCache::question_key(&request.question);

        if let Some(k) = request.top_k.filter(|k| *k != defaults.top_k) {
            key.push_str(&format!("|k={}", k));
        }
        if let Some(t) = request
            .similarity_threshold
            .filter(|t| *t != defaults.similarity_threshold)
        {
            key.push_str(&format!("|t={}", t));
        }
        if let Some(sources) = &request.sources {
            let mut sources = sources.clone();
            sources.sort();
            key.push_str(&format!("|src={}", sources.join(",")));
        }
        if let Some(types) = request.filter().file_type_names() {
            let mut types = types;
            types.sort();
            key.push_str(&format!("|ft={}", types.join(",")));
        }
        key
    }
}

/// Blank answers and a bare "I don't know" are not worth caching
fn is_cacheable(answer: &str) -> bool {
    let trimmed = answer.trim();
    !trimmed.is_empty() && !trimmed.eq_ignore_ascii_case(UNCACHEABLE_ANSWER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::providers::{ChatMessage, EmbeddingProvider, LlmProvider};
    use crate::retrieval::Retriever;
    use crate::storage::{InMemoryVectorStore, VectorStoreProvider};
    use crate::testing::{FakeEmbedder, FakeLlm};
    use crate::types::{Chunk, Document, FileType};
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const POLICY: &str = "Employees may work remotely up to three days per week";

    async fn service(reply: &str) -> (RagChatService, Arc<FakeLlm>) {
        let embedder = Arc::new(FakeEmbedder::new(256));
        let store = Arc::new(InMemoryVectorStore::new(256));
        let doc = Document::new("/data/policy.txt", FileType::Txt, "h", POLICY);
        let embedding = embedder.embed(POLICY).await.unwrap();
        store
            .add(&[Chunk::new(POLICY, doc.chunk_metadata(0)).with_embedding(embedding)])
            .await
            .unwrap();

        let llm = Arc::new(FakeLlm::new(reply));
        let client = AugmentedChatClient::new(
            Retriever::new(embedder, store, RetrievalConfig::default()),
            llm.clone(),
        );
        let cache = Arc::new(AnswerCache::new(500, Duration::from_secs(1800)));
        (RagChatService::new(client, cache), llm)
    }

    /// Model that clears the answer cache while it is generating, the way a
    /// concurrent ingestion run would
    struct IngestDuringAnswer {
        cache: Arc<AnswerCache>,
    }

    #[async_trait]
    impl LlmProvider for IngestDuringAnswer {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            self.cache.invalidate_all();
            Ok("Three days per week.".to_string())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "ingest-during-answer"
        }

        fn model(&self) -> &str {
            "fake-model"
        }
    }

    #[tokio::test]
    async fn test_second_ask_is_served_from_cache() {
        let (service, llm) = service("Three days per week.").await;

        let first = service.ask("How many days may employees work remotely?").await.unwrap();
        let second = service.ask("  HOW many days may employees work remotely?  ").await.unwrap();

        assert_eq!(first, "Three days per week.");
        assert_eq!(second, first);
        assert_eq!(llm.call_count(), 1);

        let stats = service.cache().stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
    }

    #[tokio::test]
    async fn test_i_dont_know_is_not_cached() {
        let (service, llm) = service("  i don't KNOW ").await;

        service.ask("What is the parking policy?").await.unwrap();
        service.ask("What is the parking policy?").await.unwrap();

        assert_eq!(llm.call_count(), 2);
        assert_eq!(service.cache().estimated_size(), 0);
    }

    #[tokio::test]
    async fn test_blank_answer_is_not_cached() {
        let (service, llm) = service("   ").await;
        service.ask("Anything?").await.unwrap();
        service.ask("Anything?").await.unwrap();
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_query_returns_sources_and_cached_flag() {
        let (service, _llm) = service("Up to three days.").await;
        let request = QueryRequest::new("How many days per week may employees work remotely?");

        let first = service.query(request.clone()).await.unwrap();
        assert!(!first.cached);
        assert_eq!(first.sources.len(), 1);
        assert_eq!(first.sources[0].source, "/data/policy.txt");

        let second = service.query(request).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.sources, first.sources);
    }

    #[tokio::test]
    async fn test_cache_key_includes_non_default_params() {
        let (service, llm) = service("Up to three days.").await;
        let question = "How many days per week may employees work remotely?";

        service.ask(question).await.unwrap();
        // explicit defaults share the entry
        service
            .query(QueryRequest::new(question).with_top_k(3).with_threshold(0.5))
            .await
            .unwrap();
        assert_eq!(llm.call_count(), 1);

        service
            .query(QueryRequest::new(question).with_top_k(1))
            .await
            .unwrap();
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_model_failure_propagates_and_is_not_cached() {
        let (service, llm) = service("unused").await;
        llm.fail.store(true, Ordering::SeqCst);

        let err = service.ask("How many remote days?").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
        assert_eq!(service.cache().estimated_size(), 0);
    }

    #[tokio::test]
    async fn test_answer_from_before_ingestion_is_not_cached() {
        let embedder = Arc::new(FakeEmbedder::new(64));
        let store = Arc::new(InMemoryVectorStore::new(64));
        let cache = Arc::new(AnswerCache::default());
        let llm = Arc::new(IngestDuringAnswer { cache: cache.clone() });
        let client = AugmentedChatClient::new(
            Retriever::new(embedder, store, RetrievalConfig::default()),
            llm,
        );
        let service = RagChatService::new(client, cache.clone());

        let answer = service.ask("How many remote days?").await.unwrap();
        assert_eq!(answer, "Three days per week.");
        assert_eq!(cache.estimated_size(), 0);
    }

    #[tokio::test]
    async fn test_blank_question_rejected_before_model() {
        let (service, llm) = service("unused").await;
        let err = service.ask("   ").await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(llm.call_count(), 0);
    }
}
