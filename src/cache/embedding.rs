use crate::constants::EMBEDDING_CACHE_CAPACITY;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Content-addressed cache mapping a chunk fingerprint to its embedding.
///
/// Keys are fingerprints of chunk text, not source paths, so identical chunks
/// appearing in different files share one entry. Entries never expire (a
/// fingerprint's meaning cannot change); the cache is LRU-bounded only to cap
/// memory, and cleared on process restart or an explicit [`clear`].
///
/// [`clear`]: EmbeddingCache::clear
pub struct EmbeddingCache {
    inner: Mutex<LruCache<String, Vec<f32>>>,
    hits: Mutex<u64>,
    misses: Mutex<u64>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::with_capacity(EMBEDDING_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: Mutex::new(0),
            misses: Mutex::new(0),
        }
    }

    /// Look up the vector for a chunk fingerprint, marking it recently used.
    pub fn get(&self, fingerprint: &str) -> Option<Vec<f32>> {
        let mut cache = self.inner.lock().expect("embedding cache poisoned");
        match cache.get(fingerprint) {
            Some(vector) => {
                *self.hits.lock().expect("embedding cache poisoned") += 1;
                Some(vector.clone())
            }
            None => {
                *self.misses.lock().expect("embedding cache poisoned") += 1;
                None
            }
        }
    }

    pub fn put(&self, fingerprint: String, vector: Vec<f32>) {
        let mut cache = self.inner.lock().expect("embedding cache poisoned");
        cache.put(fingerprint, vector);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("embedding cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().expect("embedding cache poisoned").clear();
    }

    /// (hits, misses) since startup; used by status reporting.
    pub fn stats(&self) -> (u64, u64) {
        (
            *self.hits.lock().expect("embedding cache poisoned"),
            *self.misses.lock().expect("embedding cache poisoned"),
        )
    }
}

impl Default for EmbeddingCache {
    fn default() -> Self {
        Self::new()
    }
}
