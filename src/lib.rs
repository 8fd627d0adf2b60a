pub mod answerer;
pub mod cache;
pub mod chunker;
pub mod config;
pub mod constants;
pub mod debounce;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod models;
pub mod reconciler;
pub mod retry;
pub mod store;
pub mod utils;
pub mod watcher;

pub use answerer::Answerer;
pub use cache::{EmbeddingCache, ResponseCache};
pub use config::Config;
pub use debounce::Debouncer;
pub use embeddings::{EmbeddingGenerator, EmbeddingProvider, OllamaEmbeddingProvider};
pub use extractor::ExtractorRegistry;
pub use llm::{ChatProvider, OllamaChatProvider};
pub use models::{IndexTask, StatusReport, TaskKind, WatchedFile};
pub use reconciler::Reconciler;
pub use retry::RetryPolicy;
pub use store::{ChromaStore, MemoryStore, VectorStore};
pub use watcher::{FileWatcher, FsEvent};
