pub mod docx;
pub mod pdf;
pub mod text;
pub mod r#trait;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use text::PlainTextExtractor;
pub use r#trait::TextExtractor;

use crate::error::ExtractError;
use crate::utils;
use std::path::Path;

/// Dispatches extraction to the first extractor claiming a file's extension.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Registry covering every supported document format.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PlainTextExtractor::new()));
        registry.register(Box::new(PdfExtractor::new()));
        registry.register(Box::new(DocxExtractor::new()));
        registry
    }

    pub fn register(&mut self, extractor: Box<dyn TextExtractor>) {
        self.extractors.push(extractor);
    }

    pub fn supports(&self, ext: &str) -> bool {
        self.extractors.iter().any(|e| e.supports_extension(ext))
    }

    /// Extract text for a path, routed by extension.
    pub async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let ext = utils::get_extension(path)
            .ok_or_else(|| ExtractError::UnsupportedType("<none>".to_string()))?;

        let extractor = self
            .extractors
            .iter()
            .find(|e| e.supports_extension(&ext))
            .ok_or(ExtractError::UnsupportedType(ext))?;

        extractor.extract(path).await
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
