use crate::error::ExtractError;
use crate::extractor::TextExtractor;
use std::path::Path;

/// PDF text extractor backed by the pdf-extract crate. Parsing runs on a
/// blocking thread since it is CPU-bound.
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let owned = path.to_path_buf();
        let result = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
            .await
            .map_err(|e| ExtractError::Parse {
                path: path.to_path_buf(),
                message: format!("extraction task panicked: {e}"),
            })?;

        match result {
            Ok(text) => Ok(text),
            Err(e) => Err(ExtractError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    fn supports_extension(&self, ext: &str) -> bool {
        ext.eq_ignore_ascii_case("pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supports_pdf_only() {
        let extractor = PdfExtractor::new();
        assert!(extractor.supports_extension("pdf"));
        assert!(extractor.supports_extension("PDF"));
        assert!(!extractor.supports_extension("docx"));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_parse_error() {
        let mut file = tempfile::NamedTempFile::with_suffix(".pdf").unwrap();
        std::io::Write::write_all(&mut file, b"not really a pdf").unwrap();

        let extractor = PdfExtractor::new();
        let err = extractor.extract(file.path()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Parse { .. }));
    }
}
