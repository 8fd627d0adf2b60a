use crate::error::ExtractError;
use crate::extractor::TextExtractor;
use std::path::Path;

/// Extractor for plain-text formats (txt, md). Invalid UTF-8 sequences are
/// replaced rather than failing the whole file.
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlainTextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| ExtractError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "txt" | "md")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_extract_plain_text() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        write!(file, "hello world").unwrap();
        file.flush().unwrap();

        let extractor = PlainTextExtractor::new();
        let text = extractor.extract(file.path()).await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_extract_missing_file_is_io_error() {
        let extractor = PlainTextExtractor::new();
        let err = extractor
            .extract(Path::new("/nonexistent/file.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_replaced() {
        let mut file = NamedTempFile::with_suffix(".txt").unwrap();
        file.write_all(&[b'o', b'k', 0xff, 0xfe, b'!']).unwrap();
        file.flush().unwrap();

        let extractor = PlainTextExtractor::new();
        let text = extractor.extract(file.path()).await.unwrap();
        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
    }

    #[test]
    fn test_supported_extensions() {
        let extractor = PlainTextExtractor::new();
        assert!(extractor.supports_extension("txt"));
        assert!(extractor.supports_extension("MD"));
        assert!(!extractor.supports_extension("pdf"));
    }
}
