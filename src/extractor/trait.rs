use crate::error::ExtractError;
use std::path::Path;

/// Trait for text extractors that can pull plain text out of a file format
#[async_trait::async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text content from a file
    async fn extract(&self, path: &Path) -> Result<String, ExtractError>;

    /// Check if this extractor supports the given file extension
    fn supports_extension(&self, ext: &str) -> bool;
}
