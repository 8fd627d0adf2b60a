use crate::constants::{DEFAULT_RESPONSE_CACHE_CAPACITY, DEFAULT_RESPONSE_CACHE_TTL_SECS};
use crate::utils::hash_text;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Clone)]
struct CachedAnswer {
    value: String,
    created_at: Instant,
}

/// Time- and size-bounded cache of generated answers.
///
/// The key is a fingerprint of the normalized question plus the trimmed
/// context it was answered against, so whitespace variants of the same
/// question hit the same entry. Entries expire after the configured TTL
/// (evicted lazily on read) and the least-recently-used entry is dropped
/// whenever the cache would exceed its capacity. Entries are immutable once
/// written; a put for an existing key replaces the entry wholesale.
pub struct ResponseCache {
    inner: Mutex<LruCache<String, CachedAnswer>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    fn cache_key(query: &str, context: &str) -> String {
        let normalized = query.trim().to_lowercase();
        hash_text(&format!("{}\n{}", normalized, context))
    }

    /// Look up a cached answer. Entries older than the TTL count as absent
    /// and are evicted on the spot; a hit marks the entry recently used.
    pub fn get(&self, query: &str, context: &str) -> Option<String> {
        let key = Self::cache_key(query, context);
        let mut cache = self.inner.lock().expect("response cache poisoned");

        match cache.get(&key) {
            Some(entry) if entry.created_at.elapsed() <= self.ttl => Some(entry.value.clone()),
            Some(_) => {
                cache.pop(&key);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, query: &str, context: &str, value: String) {
        let key = Self::cache_key(query, context);
        let mut cache = self.inner.lock().expect("response cache poisoned");

        // Replace rather than mutate in place.
        cache.pop(&key);
        cache.put(
            key,
            CachedAnswer {
                value,
                created_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("response cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().expect("response cache poisoned").clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(
            DEFAULT_RESPONSE_CACHE_CAPACITY,
            Duration::from_secs(DEFAULT_RESPONSE_CACHE_TTL_SECS),
        )
    }
}
