pub mod ollama;
pub mod r#trait;

pub use ollama::OllamaChatProvider;
pub use r#trait::ChatProvider;
