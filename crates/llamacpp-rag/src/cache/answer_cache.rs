//! Size- and age-bounded answer cache with hit/miss statistics
//!
//! Entries expire a fixed time after they were written. When the cache is
//! full, expired entries are purged first and then the oldest entry is
//! evicted. Expirations and evictions both count toward `evictionCount`.
//!
//! Every `invalidate_all` starts a new generation. An answer computed while
//! an older generation was current is dropped by [`AnswerCache::put_if_current`].

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::config::CacheConfig;
use crate::types::{CacheStatsResponse, SourceRef};

/// Cached answer with the sources it was grounded on
#[derive(Debug, Clone, PartialEq)]
pub struct CachedAnswer {
    /// Generated answer
    pub answer: String,
    /// Retrieved chunks at generation time
    pub sources: Vec<SourceRef>,
}

struct CacheEntry {
    value: CachedAnswer,
    written_at: Instant,
}

/// Answer cache keyed by normalized question
pub struct AnswerCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    max_entries: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    generation: AtomicU64,
}

impl AnswerCache {
    /// Create a new answer cache
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    /// Create from config
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, Duration::from_secs(config.ttl_secs))
    }

    /// Cache key for a question: `q:` + trimmed, lower-cased text
    pub fn question_key(question: &str) -> String {
        format!("q:{}", question.trim().to_lowercase())
    }

    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.written_at) >= self.ttl
    }

    /// Look up a key, recording a hit or a miss
    pub fn get(&self, key: &str) -> Option<CachedAnswer> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let expired = match entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.remove(key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, "Cache entry expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Current generation; read it before computing a value to store
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Store a value, replacing any previous entry for the key
    pub fn put(&self, key: impl Into<String>, value: CachedAnswer) {
        let mut entries = self.entries.lock();
        self.insert(&mut entries, key.into(), value);
    }

    /// Store a value only if the cache was not invalidated since `generation`
    pub fn put_if_current(&self, key: impl Into<String>, value: CachedAnswer, generation: u64) -> bool {
        let key = key.into();
        let mut entries = self.entries.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(key = %key, "Cache invalidated while answering; not stored");
            return false;
        }
        self.insert(&mut entries, key, value);
        true
    }

    fn insert(&self, entries: &mut HashMap<String, CacheEntry>, key: String, value: CachedAnswer) {
        let now = Instant::now();
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let purged = self.purge_expired(entries, now);
            if purged == 0 {
                if let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, e)| e.written_at)
                    .map(|(k, _)| k.clone())
                {
                    entries.remove(&oldest);
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                written_at: now,
            },
        );
    }

    fn purge_expired(&self, entries: &mut HashMap<String, CacheEntry>, now: Instant) -> usize {
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        let purged = before - entries.len();
        self.evictions.fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    /// Drop expired entries now instead of on access
    pub fn clean_up(&self) -> usize {
        let mut entries = self.entries.lock();
        self.purge_expired(&mut entries, Instant::now())
    }

    /// Remove every entry; statistics are kept
    pub fn invalidate_all(&self) {
        let mut entries = self.entries.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        let n = entries.len();
        entries.clear();
        if n > 0 {
            tracing::info!(entries = n, "Answer cache cleared");
        }
    }

    /// Number of stored entries, possibly including expired ones not yet purged
    pub fn estimated_size(&self) -> usize {
        self.entries.lock().len()
    }

    /// Hit, miss and eviction counters
    pub fn stats(&self) -> CacheStatsResponse {
        let hit_count = self.hits.load(Ordering::Relaxed);
        let miss_count = self.misses.load(Ordering::Relaxed);
        let requests = hit_count + miss_count;

        CacheStatsResponse {
            hit_count,
            miss_count,
            hit_rate: if requests == 0 {
                1.0
            } else {
                hit_count as f64 / requests as f64
            },
            eviction_count: self.evictions.load(Ordering::Relaxed),
            estimated_size: self.estimated_size() as u64,
        }
    }
}

impl Default for AnswerCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(text: &str) -> CachedAnswer {
        CachedAnswer {
            answer: text.to_string(),
            sources: Vec::new(),
        }
    }

    #[test]
    fn test_question_key_normalization() {
        assert_eq!(AnswerCache::question_key("  What is RAG? "), "q:what is rag?");
        assert_eq!(
            AnswerCache::question_key("WHAT IS RAG?"),
            AnswerCache::question_key("what is rag?")
        );
    }

    #[test]
    fn test_cache_hit_and_stats() {
        let cache = AnswerCache::new(10, Duration::from_secs(60));
        assert!(cache.get("q:what is rag?").is_none());

        cache.put("q:what is rag?", answer("Retrieval-augmented generation."));
        let hit = cache.get("q:what is rag?").unwrap();
        assert_eq!(hit.answer, "Retrieval-augmented generation.");

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_rate, 0.5);
        assert_eq!(stats.estimated_size, 1);
        assert_eq!(stats.eviction_count, 0);
    }

    #[test]
    fn test_empty_cache_hit_rate() {
        let cache = AnswerCache::default();
        assert_eq!(cache.stats().hit_rate, 1.0);
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let cache = AnswerCache::new(2, Duration::from_secs(60));
        cache.put("q:a", answer("a"));
        std::thread::sleep(Duration::from_millis(2));
        cache.put("q:b", answer("b"));
        std::thread::sleep(Duration::from_millis(2));
        cache.put("q:c", answer("c"));

        assert_eq!(cache.estimated_size(), 2);
        assert!(cache.get("q:a").is_none());
        assert!(cache.get("q:b").is_some());
        assert!(cache.get("q:c").is_some());
        assert_eq!(cache.stats().eviction_count, 1);

        // overwriting an existing key does not evict
        cache.put("q:c", answer("c2"));
        assert_eq!(cache.estimated_size(), 2);
        assert_eq!(cache.get("q:c").unwrap().answer, "c2");
    }

    #[test]
    fn test_entries_expire_after_write() {
        let cache = AnswerCache::new(10, Duration::from_millis(30));
        cache.put("q:a", answer("a"));
        cache.put("q:b", answer("b"));
        std::thread::sleep(Duration::from_millis(60));

        assert!(cache.get("q:a").is_none());
        assert_eq!(cache.clean_up(), 1);
        assert_eq!(cache.estimated_size(), 0);

        let stats = cache.stats();
        assert_eq!(stats.eviction_count, 2);
        assert_eq!(stats.miss_count, 1);
    }

    #[test]
    fn test_invalidate_all_keeps_stats() {
        let cache = AnswerCache::new(10, Duration::from_secs(60));
        cache.put("q:a", answer("a"));
        cache.get("q:a");
        cache.invalidate_all();

        assert_eq!(cache.estimated_size(), 0);
        assert!(cache.get("q:a").is_none());
        assert_eq!(cache.stats().hit_count, 1);
    }

    #[test]
    fn test_put_after_invalidation_is_dropped() {
        let cache = AnswerCache::new(10, Duration::from_secs(60));
        let generation = cache.generation();
        assert!(cache.put_if_current("q:a", answer("a"), generation));

        let before_clear = cache.generation();
        cache.invalidate_all();
        assert!(!cache.put_if_current("q:b", answer("stale"), before_clear));
        assert!(cache.get("q:b").is_none());

        assert!(cache.put_if_current("q:b", answer("fresh"), cache.generation()));
        assert_eq!(cache.get("q:b").unwrap().answer, "fresh");
    }
}
