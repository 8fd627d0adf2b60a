use crate::error::ProviderError;

/// Trait for chat-completion providers used on the answer path
#[async_trait::async_trait]
pub trait ChatProvider: Send + Sync {
    /// Generate a completion for a fully constructed prompt
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}
