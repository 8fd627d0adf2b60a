pub mod generator;
pub mod ollama;
pub mod r#trait;

pub use generator::{EmbedOutcome, EmbeddingGenerator};
pub use ollama::OllamaEmbeddingProvider;
pub use r#trait::EmbeddingProvider;
