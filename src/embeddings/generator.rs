use crate::cache::EmbeddingCache;
use crate::embeddings::EmbeddingProvider;
use crate::error::ProviderError;
use crate::models::Chunk;
use crate::retry::RetryPolicy;
use crate::utils::hash_text;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Result of embedding a batch of chunks: vectors aligned to the chunk
/// indices that succeeded, plus the indices that failed all retries.
#[derive(Debug, Clone, Default)]
pub struct EmbedOutcome {
    pub vectors: Vec<(usize, Vec<f32>)>,
    pub failed: Vec<usize>,
}

/// Dispatches embedding requests with a cache-first lookup, a global
/// concurrency ceiling, and a declarative retry schedule.
///
/// The semaphore lives here rather than per caller, so the provider sees at
/// most `workers` in-flight calls no matter how many files are being
/// reconciled at once. A chunk that fails every attempt is reported in
/// `failed` and the rest of the batch proceeds.
pub struct EmbeddingGenerator {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Arc<EmbeddingCache>,
    semaphore: Arc<Semaphore>,
    policy: RetryPolicy,
}

impl EmbeddingGenerator {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        cache: Arc<EmbeddingCache>,
        workers: usize,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            cache,
            semaphore: Arc::new(Semaphore::new(workers.max(1))),
            policy,
        }
    }

    /// Embed every chunk in the batch, consulting the cache first and making
    /// at most one provider call per distinct chunk text.
    pub async fn embed_all(&self, chunks: &[Chunk]) -> EmbedOutcome {
        // Identical texts collapse into one lookup/call; the result fans back
        // out to every index that carried that text.
        let mut groups: HashMap<String, (String, Vec<usize>)> = HashMap::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let fingerprint = hash_text(&chunk.text);
            groups
                .entry(fingerprint)
                .or_insert_with(|| (chunk.text.clone(), Vec::new()))
                .1
                .push(i);
        }

        let tasks = groups.into_iter().map(|(fingerprint, (text, indices))| async move {
            if let Some(vector) = self.cache.get(&fingerprint) {
                debug!(fingerprint = %fingerprint, "embedding cache hit");
                return (indices, Some(vector));
            }

            let _permit = match self.semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return (indices, None),
            };

            match self.embed_with_retry(&text).await {
                Ok(vector) => {
                    self.cache.put(fingerprint, vector.clone());
                    (indices, Some(vector))
                }
                Err(e) => {
                    warn!(error = %e, "chunk failed all embedding attempts");
                    (indices, None)
                }
            }
        });

        let mut outcome = EmbedOutcome::default();
        for (indices, result) in futures::future::join_all(tasks).await {
            match result {
                Some(vector) => {
                    for i in indices {
                        outcome.vectors.push((i, vector.clone()));
                    }
                }
                None => outcome.failed.extend(indices),
            }
        }

        outcome.vectors.sort_by_key(|(i, _)| *i);
        outcome.failed.sort_unstable();
        outcome
    }

    /// Embed a single query under the same retry schedule and concurrency
    /// ceiling, bypassing the cache (queries are one-off).
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("semaphore closed: {e}")))?;
        self.embed_with_retry(text).await
    }

    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut last_error = None;

        for attempt in 0..self.policy.attempts() {
            match self
                .provider
                .embed(text, self.policy.timeout_for(attempt))
                .await
            {
                Ok(vector) => return Ok(vector),
                Err(e) => {
                    warn!(attempt, error = %e, "embedding attempt failed");
                    last_error = Some(e);
                    if !self.policy.is_last_attempt(attempt) {
                        tokio::time::sleep(self.policy.pause()).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ProviderError::InvalidResponse("no attempts made".to_string())))
    }

    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockProvider {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
        fail_text: Option<String>,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
                fail_text: None,
            }
        }

        fn failing_on(text: &str) -> Self {
            let mut provider = Self::new();
            provider.fail_text = Some(text.to_string());
            provider
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl EmbeddingProvider for MockProvider {
        async fn embed(&self, text: &str, _timeout: Duration) -> Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_text.as_deref() == Some(text) {
                return Err(ProviderError::Http {
                    url: "http://mock".to_string(),
                    status: 503,
                });
            }
            Ok(vec![text.len() as f32, 1.0, 2.0])
        }

        fn dimension(&self) -> usize {
            3
        }
    }

    fn chunk(text: &str, index: usize, total: usize) -> Chunk {
        Chunk {
            text: text.to_string(),
            source_path: PathBuf::from("/docs/a.txt"),
            index,
            total,
        }
    }

    fn fast_policy(attempts: usize) -> RetryPolicy {
        RetryPolicy::new(
            vec![Duration::from_secs(1); attempts],
            Duration::from_millis(1),
        )
    }

    #[tokio::test]
    async fn test_embed_all_success() {
        let provider = Arc::new(MockProvider::new());
        let generator = EmbeddingGenerator::new(
            provider.clone(),
            Arc::new(EmbeddingCache::new()),
            4,
            fast_policy(3),
        );

        let chunks = vec![chunk("alpha", 0, 2), chunk("beta", 1, 2)];
        let outcome = generator.embed_all(&chunks).await;

        assert_eq!(outcome.vectors.len(), 2);
        assert!(outcome.failed.is_empty());
        assert_eq!(outcome.vectors[0].0, 0);
        assert_eq!(outcome.vectors[1].0, 1);
    }

    #[tokio::test]
    async fn test_identical_chunks_cost_one_call() {
        let provider = Arc::new(MockProvider::new());
        let generator = EmbeddingGenerator::new(
            provider.clone(),
            Arc::new(EmbeddingCache::new()),
            4,
            fast_policy(3),
        );

        let chunks = vec![
            chunk("repeated boilerplate", 0, 3),
            chunk("repeated boilerplate", 1, 3),
            chunk("unique text", 2, 3),
        ];
        let outcome = generator.embed_all(&chunks).await;

        assert_eq!(outcome.vectors.len(), 3);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_second_batch_served_from_cache() {
        let provider = Arc::new(MockProvider::new());
        let generator = EmbeddingGenerator::new(
            provider.clone(),
            Arc::new(EmbeddingCache::new()),
            4,
            fast_policy(3),
        );

        let chunks = vec![chunk("cached once", 0, 1)];
        generator.embed_all(&chunks).await;
        generator.embed_all(&chunks).await;

        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        // Chunk 3 of 5 exhausts its retries; the rest succeed.
        let provider = Arc::new(MockProvider::failing_on("doomed"));
        let generator = EmbeddingGenerator::new(
            provider.clone(),
            Arc::new(EmbeddingCache::new()),
            4,
            fast_policy(3),
        );

        let chunks = vec![
            chunk("zero", 0, 5),
            chunk("one", 1, 5),
            chunk("two", 2, 5),
            chunk("doomed", 3, 5),
            chunk("four", 4, 5),
        ];
        let outcome = generator.embed_all(&chunks).await;

        let indices: Vec<usize> = outcome.vectors.iter().map(|(i, _)| *i).collect();
        assert_eq!(indices, vec![0, 1, 2, 4]);
        assert_eq!(outcome.failed, vec![3]);
        // The doomed chunk was retried the full schedule.
        assert_eq!(provider.call_count(), 4 + 3);
    }

    #[tokio::test]
    async fn test_concurrency_stays_under_ceiling() {
        let provider = Arc::new(MockProvider::new());
        let generator = EmbeddingGenerator::new(
            provider.clone(),
            Arc::new(EmbeddingCache::new()),
            2,
            fast_policy(1),
        );

        let chunks: Vec<Chunk> = (0..12)
            .map(|i| chunk(&format!("text number {}", i), i, 12))
            .collect();
        let outcome = generator.embed_all(&chunks).await;

        assert_eq!(outcome.vectors.len(), 12);
        assert!(provider.peak_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_failed_chunk_not_cached() {
        let cache = Arc::new(EmbeddingCache::new());
        let provider = Arc::new(MockProvider::failing_on("doomed"));
        let generator =
            EmbeddingGenerator::new(provider.clone(), cache.clone(), 4, fast_policy(2));

        generator.embed_all(&[chunk("doomed", 0, 1)]).await;
        assert_eq!(cache.get(&hash_text("doomed")), None);
    }

    #[tokio::test]
    async fn test_embed_query_retries() {
        let provider = Arc::new(MockProvider::failing_on("bad query"));
        let generator = EmbeddingGenerator::new(
            provider.clone(),
            Arc::new(EmbeddingCache::new()),
            4,
            fast_policy(2),
        );

        assert!(generator.embed_query("bad query").await.is_err());
        assert_eq!(provider.call_count(), 2);

        assert!(generator.embed_query("good query").await.is_ok());
    }
}
