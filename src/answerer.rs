use crate::cache::ResponseCache;
use crate::constants::{CANNOT_ANSWER, CONTEXT_SEGMENT_BUDGET, CONTEXT_TOTAL_BUDGET};
use crate::embeddings::EmbeddingGenerator;
use crate::llm::ChatProvider;
use crate::models::VectorMatch;
use crate::store::VectorStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// The question-answering path: nearest chunks from the vector store, a
/// size-bounded context, the response cache, then the chat provider.
///
/// Fully decoupled from the indexing pipeline except through the shared
/// store. Every failure mode degrades to the fixed cannot-answer reply;
/// callers never see a raw provider error.
pub struct Answerer {
    store: Arc<dyn VectorStore>,
    generator: Arc<EmbeddingGenerator>,
    chat: Arc<dyn ChatProvider>,
    cache: Arc<ResponseCache>,
    top_k: usize,
}

impl Answerer {
    pub fn new(
        store: Arc<dyn VectorStore>,
        generator: Arc<EmbeddingGenerator>,
        chat: Arc<dyn ChatProvider>,
        cache: Arc<ResponseCache>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            generator,
            chat,
            cache,
            top_k: top_k.max(1),
        }
    }

    /// Answer a question from the indexed documents.
    pub async fn answer(&self, question: &str) -> String {
        if question.trim().is_empty() {
            return CANNOT_ANSWER.to_string();
        }

        let embedding = match self.generator.embed_query(question).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "query embedding failed");
                return CANNOT_ANSWER.to_string();
            }
        };

        let matches = match self.store.query(&embedding, self.top_k).await {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "vector store query failed");
                return CANNOT_ANSWER.to_string();
            }
        };

        let context = build_context(&matches);
        if context.is_empty() {
            debug!("no usable context for question");
            return CANNOT_ANSWER.to_string();
        }

        if let Some(cached) = self.cache.get(question, &context) {
            debug!("response cache hit");
            return cached;
        }

        let prompt = build_prompt(&context, question);
        match self.chat.complete(&prompt).await {
            Ok(answer) if !answer.trim().is_empty() => {
                self.cache.put(question, &context, answer.clone());
                answer
            }
            Ok(_) => CANNOT_ANSWER.to_string(),
            Err(e) => {
                warn!(error = %e, "chat completion failed");
                CANNOT_ANSWER.to_string()
            }
        }
    }
}

/// Concatenate retrieved chunks into a bounded context block. Each segment is
/// capped, and segments are dropped entirely once the total budget runs out.
pub fn build_context(matches: &[VectorMatch]) -> String {
    let mut segments = Vec::new();
    let mut total = 0usize;

    for m in matches {
        let trimmed = m.text.trim();
        if trimmed.is_empty() {
            continue;
        }

        let segment: String = trimmed.chars().take(CONTEXT_SEGMENT_BUDGET).collect();
        let len = segment.chars().count();
        if total + len > CONTEXT_TOTAL_BUDGET {
            break;
        }
        total += len;
        segments.push(segment);
    }

    segments.join("\n\n")
}

fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "You are an assistant answering questions about a document collection.\n\
         Use only the context below. If the context does not contain the\n\
         answer, say so clearly instead of guessing.\n\n\
         Context:\n{}\n\n\
         Question: {}\n\
         Answer: ",
        context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EmbeddingCache;
    use crate::embeddings::EmbeddingProvider;
    use crate::error::ProviderError;
    use crate::models::{ChunkMetadata, VectorRecord};
    use crate::retry::RetryPolicy;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedEmbedder;

    #[async_trait::async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, _text: &str, _timeout: Duration) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }
    }

    struct MockChat {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl MockChat {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait::async_trait]
    impl ChatProvider for MockChat {
        async fn complete(&self, _prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ProviderError::Http {
                    url: "http://mock".to_string(),
                    status: 500,
                });
            }
            Ok("Here is the answer.".to_string())
        }
    }

    fn record(id: &str, text: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            embedding: vec![1.0, 0.0],
            text: text.to_string(),
            metadata: ChunkMetadata {
                source_path: "/docs/a.txt".to_string(),
                filename: "a.txt".to_string(),
                fingerprint: "fp".to_string(),
                chunk_index: 0,
                total_chunks: 1,
                indexed_at: 0,
            },
        }
    }

    fn matched(text: &str) -> VectorMatch {
        VectorMatch {
            id: "id".to_string(),
            text: text.to_string(),
            metadata: ChunkMetadata {
                source_path: "/docs/a.txt".to_string(),
                filename: "a.txt".to_string(),
                fingerprint: "fp".to_string(),
                chunk_index: 0,
                total_chunks: 1,
                indexed_at: 0,
            },
            distance: 0.1,
        }
    }

    async fn answerer_with(
        store: Arc<MemoryStore>,
        chat: Arc<MockChat>,
        cache: Arc<ResponseCache>,
    ) -> Answerer {
        let generator = Arc::new(EmbeddingGenerator::new(
            Arc::new(FixedEmbedder),
            Arc::new(EmbeddingCache::new()),
            2,
            RetryPolicy::new(vec![Duration::from_secs(1)], Duration::from_millis(1)),
        ));
        Answerer::new(store, generator, chat, cache, 5)
    }

    #[tokio::test]
    async fn test_answers_from_indexed_content() {
        let store = Arc::new(MemoryStore::new());
        store
            .upsert(vec![record("a0", "The capital of France is Paris.")])
            .await
            .unwrap();

        let chat = Arc::new(MockChat::new());
        let answerer =
            answerer_with(store, chat.clone(), Arc::new(ResponseCache::default())).await;

        let answer = answerer.answer("What is the capital of France?").await;
        assert_eq!(answer, "Here is the answer.");
        assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_store_degrades_to_cannot_answer() {
        let store = Arc::new(MemoryStore::new());
        let chat = Arc::new(MockChat::new());
        let answerer =
            answerer_with(store, chat.clone(), Arc::new(ResponseCache::default())).await;

        let answer = answerer.answer("Anything at all?").await;
        assert_eq!(answer, CANNOT_ANSWER);
        assert_eq!(chat.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repeat_question_hits_response_cache() {
        let store = Arc::new(MemoryStore::new());
        store.upsert(vec![record("a0", "Some context.")]).await.unwrap();

        let chat = Arc::new(MockChat::new());
        let answerer =
            answerer_with(store, chat.clone(), Arc::new(ResponseCache::default())).await;

        let first = answerer.answer("What is in the docs?").await;
        // Whitespace/case variants of the question share the cache entry.
        let second = answerer.answer("  WHAT IS IN THE DOCS?  ").await;

        assert_eq!(first, second);
        assert_eq!(chat.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_chat_failure_degrades_and_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        store.upsert(vec![record("a0", "Some context.")]).await.unwrap();

        let chat = Arc::new(MockChat::new());
        chat.fail.store(true, Ordering::SeqCst);
        let answerer =
            answerer_with(store, chat.clone(), Arc::new(ResponseCache::default())).await;

        assert_eq!(answerer.answer("Question?").await, CANNOT_ANSWER);

        // Once the provider recovers the question is asked again, not served
        // from a cached failure.
        chat.fail.store(false, Ordering::SeqCst);
        assert_eq!(answerer.answer("Question?").await, "Here is the answer.");
        assert_eq!(chat.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_question_short_circuits() {
        let store = Arc::new(MemoryStore::new());
        let chat = Arc::new(MockChat::new());
        let answerer =
            answerer_with(store, chat.clone(), Arc::new(ResponseCache::default())).await;

        assert_eq!(answerer.answer("   ").await, CANNOT_ANSWER);
    }

    #[test]
    fn test_build_context_caps_each_segment() {
        let long = "a".repeat(CONTEXT_SEGMENT_BUDGET * 2);
        let context = build_context(&[matched(&long)]);
        assert_eq!(context.chars().count(), CONTEXT_SEGMENT_BUDGET);
    }

    #[test]
    fn test_build_context_respects_total_budget() {
        let segment = "b".repeat(CONTEXT_SEGMENT_BUDGET);
        let matches: Vec<VectorMatch> = (0..10).map(|_| matched(&segment)).collect();
        let context = build_context(&matches);

        // 4 full segments fit in the total budget; the rest are dropped.
        let kept = CONTEXT_TOTAL_BUDGET / CONTEXT_SEGMENT_BUDGET;
        let expected = kept * CONTEXT_SEGMENT_BUDGET + (kept - 1) * 2;
        assert_eq!(context.chars().count(), expected);
    }

    #[test]
    fn test_build_context_skips_blank_segments() {
        let context = build_context(&[matched("   "), matched("real content")]);
        assert_eq!(context, "real content");
    }

    #[test]
    fn test_build_prompt_mentions_context_and_question() {
        let prompt = build_prompt("CTX", "Why?");
        assert!(prompt.contains("CTX"));
        assert!(prompt.contains("Why?"));
        assert!(prompt.contains("does not contain"));
    }
}
