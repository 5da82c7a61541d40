//! Translation cache.
//!
//! A bounded in-memory map keyed by `hash(normalize(content)):target`.
//! Entries expire after a TTL and the map evicts the least-recently-accessed
//! entry under size pressure. The cache is purely advisory: the pipeline
//! behaves identically (just slower) when every lookup misses.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use flowtalk_shared::Language;

/// Fixed bookkeeping overhead charged per entry in the memory estimate.
const ENTRY_OVERHEAD_BYTES: usize = 48;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub max_entries: usize,
    pub ttl: Duration,
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            ttl: Duration::from_secs(3600),
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// A cache that never stores anything. Lookups miss, writes are dropped.
    pub fn disabled() -> Self {
        Self {
            max_entries: 0,
            ..Self::default()
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: String,
    inserted_at: Instant,
    last_accessed: Instant,
    access_count: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    hits: u64,
    misses: u64,
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub memory_bytes: usize,
    pub hit_rate: f64,
}

pub struct TranslationCache {
    inner: Mutex<CacheInner>,
    config: CacheConfig,
}

impl TranslationCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            config,
        }
    }

    pub fn cleanup_interval(&self) -> Duration {
        self.config.cleanup_interval
    }

    /// Look up a translation. Expiry wins over presence: an expired entry is
    /// removed and reported as a miss, never returned.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock().await;
        let ttl = self.config.ttl;

        let mut expired = false;
        let mut value = None;
        if let Some(entry) = inner.entries.get_mut(key) {
            if entry.inserted_at.elapsed() <= ttl {
                entry.last_accessed = Instant::now();
                entry.access_count += 1;
                value = Some(entry.value.clone());
            } else {
                expired = true;
            }
        }

        if expired {
            inner.entries.remove(key);
        }
        match value {
            Some(_) => inner.hits += 1,
            None => inner.misses += 1,
        }
        value
    }

    /// Insert or replace a translation. When the map is full and the key is
    /// new, the least-recently-accessed entry makes room.
    pub async fn set(&self, key: &str, value: &str) {
        if self.config.max_entries == 0 {
            return;
        }

        let mut inner = self.inner.lock().await;

        if !inner.entries.contains_key(key) && inner.entries.len() >= self.config.max_entries {
            let evict = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_accessed)
                .map(|(k, _)| k.clone());
            if let Some(stale) = evict {
                inner.entries.remove(&stale);
            }
        }

        let now = Instant::now();
        inner.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_string(),
                inserted_at: now,
                last_accessed: now,
                access_count: 0,
            },
        );
    }

    /// Drop every expired entry and return how many were removed.
    pub async fn cleanup(&self) -> usize {
        let mut inner = self.inner.lock().await;
        let ttl = self.config.ttl;
        let before = inner.entries.len();
        inner.entries.retain(|_, entry| entry.inserted_at.elapsed() <= ttl);
        before - inner.entries.len()
    }

    /// Empty the cache and reset the statistics.
    pub async fn clear(&self) {
        let mut inner = self.inner.lock().await;
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        let memory_bytes = inner
            .entries
            .iter()
            .map(|(k, entry)| k.len() + entry.value.len() + ENTRY_OVERHEAD_BYTES)
            .sum();
        let lookups = inner.hits + inner.misses;

        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entries: inner.entries.len(),
            memory_bytes,
            hit_rate: if lookups > 0 {
                inner.hits as f64 / lookups as f64
            } else {
                0.0
            },
        }
    }
}

/// Normalization used for cache keys only: trim, collapse interior
/// whitespace, lowercase. Never applied to display or translation input.
pub fn normalize(content: &str) -> String {
    content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// The composite cache key for `(content, target)` pairs.
pub fn cache_key(content: &str, target: Language) -> String {
    let digest = blake3::hash(normalize(content).as_bytes());
    format!("{}:{}", hex::encode(digest.as_bytes()), target.code())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cache(max_entries: usize, ttl: Duration) -> TranslationCache {
        TranslationCache::new(CacheConfig {
            max_entries,
            ttl,
            cleanup_interval: Duration::from_secs(300),
        })
    }

    #[test]
    fn normalize_trims_collapses_lowercases() {
        assert_eq!(normalize("  Hello   World \n"), "hello world");
    }

    #[test]
    fn key_is_stable_under_normalization() {
        assert_eq!(
            cache_key("Hello World", Language::Fr),
            cache_key("  hello   world ", Language::Fr)
        );
        assert_ne!(
            cache_key("Hello World", Language::Fr),
            cache_key("Hello World", Language::Es)
        );
    }

    #[tokio::test]
    async fn hit_and_miss_accounting() {
        let cache = small_cache(10, Duration::from_secs(60));
        let key = cache_key("hello", Language::Es);

        assert_eq!(cache.get(&key).await, None);
        cache.set(&key, "hola").await;
        assert_eq!(cache.get(&key).await.as_deref(), Some("hola"));

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
        assert!((stats.hit_rate - 0.5).abs() < f64::EPSILON);
        assert!(stats.memory_bytes > 0);
    }

    #[tokio::test]
    async fn expired_entries_are_never_returned() {
        let cache = small_cache(10, Duration::ZERO);
        let key = cache_key("hello", Language::Es);

        cache.set(&key, "hola").await;
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.get(&key).await, None);

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test]
    async fn least_recently_accessed_is_evicted() {
        let cache = small_cache(2, Duration::from_secs(60));

        cache.set("a", "1").await;
        std::thread::sleep(Duration::from_millis(2));
        cache.set("b", "2").await;
        std::thread::sleep(Duration::from_millis(2));

        // Touch "a" so "b" becomes the least recently accessed.
        assert!(cache.get("a").await.is_some());
        std::thread::sleep(Duration::from_millis(2));

        cache.set("c", "3").await;

        assert!(cache.get("a").await.is_some());
        assert!(cache.get("b").await.is_none());
        assert!(cache.get("c").await.is_some());
    }

    #[tokio::test]
    async fn replacing_existing_key_does_not_evict() {
        let cache = small_cache(2, Duration::from_secs(60));
        cache.set("a", "1").await;
        cache.set("b", "2").await;
        cache.set("a", "1-updated").await;

        assert_eq!(cache.get("a").await.as_deref(), Some("1-updated"));
        assert!(cache.get("b").await.is_some());
    }

    #[tokio::test]
    async fn cleanup_reports_removed_count() {
        let cache = small_cache(10, Duration::ZERO);
        cache.set("a", "1").await;
        cache.set("b", "2").await;
        std::thread::sleep(Duration::from_millis(2));

        assert_eq!(cache.cleanup().await, 2);
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn clear_resets_statistics() {
        let cache = small_cache(10, Duration::from_secs(60));
        cache.set("a", "1").await;
        let _ = cache.get("a").await;
        let _ = cache.get("missing").await;

        cache.clear().await;
        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses, stats.entries), (0, 0, 0));
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = TranslationCache::new(CacheConfig::disabled());
        cache.set("a", "1").await;
        assert_eq!(cache.get("a").await, None);
    }

    #[tokio::test]
    async fn hit_rate_is_monotone_for_repeated_hits() {
        let cache = small_cache(10, Duration::from_secs(60));
        cache.set("a", "1").await;

        let mut previous = 0.0;
        for _ in 0..5 {
            let _ = cache.get("a").await;
            let rate = cache.stats().await.hit_rate;
            assert!(rate >= previous);
            previous = rate;
        }
    }
}
