use crate::error::ProviderError;
use std::time::Duration;

/// Trait for embedding providers that can compute semantic vectors from text
///
/// The per-call timeout comes from the caller so a retry schedule can widen
/// it on successive attempts.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Compute an embedding vector for one piece of text
    async fn embed(&self, text: &str, timeout: Duration) -> Result<Vec<f32>, ProviderError>;

    /// Dimension of the vectors this provider produces
    fn dimension(&self) -> usize;
}
