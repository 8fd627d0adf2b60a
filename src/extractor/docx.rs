use crate::error::ExtractError;
use crate::extractor::TextExtractor;
use std::io::Read;
use std::path::Path;

/// DOCX text extractor. A .docx is a ZIP archive whose body text lives in
/// word/document.xml; paragraphs become lines, all other markup is dropped.
pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }

    fn read_document_xml(path: &Path) -> Result<String, ExtractError> {
        let file = std::fs::File::open(path).map_err(|e| ExtractError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractError::Parse {
            path: path.to_path_buf(),
            message: format!("not a zip archive: {e}"),
        })?;

        let mut entry = archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractError::Parse {
                path: path.to_path_buf(),
                message: format!("missing word/document.xml: {e}"),
            })?;

        let mut xml = String::new();
        entry.read_to_string(&mut xml).map_err(|e| ExtractError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(xml)
    }

    /// Strip WordprocessingML down to its text runs. Closing paragraph tags
    /// turn into newlines so sentence structure survives for the chunker.
    fn strip_markup(xml: &str) -> String {
        let mut text = String::with_capacity(xml.len() / 4);
        let mut rest = xml;

        while let Some(open) = rest.find('<') {
            text.push_str(&rest[..open]);
            let tail = &rest[open..];
            match tail.find('>') {
                Some(close) => {
                    let tag = &tail[..=close];
                    if tag.starts_with("</w:p>") || tag.starts_with("<w:br") {
                        text.push('\n');
                    } else if tag.starts_with("<w:tab") {
                        text.push('\t');
                    }
                    rest = &tail[close + 1..];
                }
                None => break,
            }
        }
        text.push_str(rest);
        text
    }
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextExtractor for DocxExtractor {
    async fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        let owned = path.to_path_buf();
        let xml = tokio::task::spawn_blocking(move || Self::read_document_xml(&owned))
            .await
            .map_err(|e| ExtractError::Parse {
                path: path.to_path_buf(),
                message: format!("extraction task panicked: {e}"),
            })??;

        Ok(Self::strip_markup(&xml))
    }

    fn supports_extension(&self, ext: &str) -> bool {
        ext.eq_ignore_ascii_case("docx")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_supports_docx_only() {
        let extractor = DocxExtractor::new();
        assert!(extractor.supports_extension("docx"));
        assert!(extractor.supports_extension("DOCX"));
        assert!(!extractor.supports_extension("doc"));
    }

    #[test]
    fn test_strip_markup_extracts_runs() {
        let xml = r#"<w:document><w:body><w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p><w:p><w:r><w:t>Second</w:t></w:r><w:r><w:t> half.</w:t></w:r></w:p></w:body></w:document>"#;
        let text = DocxExtractor::strip_markup(xml);
        assert_eq!(text, "First paragraph.\nSecond half.\n");
    }

    #[test]
    fn test_strip_markup_handles_breaks_and_tabs() {
        let xml = "<w:p><w:t>a</w:t><w:br/><w:t>b</w:t><w:tab/><w:t>c</w:t></w:p>";
        assert_eq!(DocxExtractor::strip_markup(xml), "a\nb\tc\n");
    }

    #[tokio::test]
    async fn test_docx_round_trip() {
        // Build a minimal docx in memory: a zip with word/document.xml.
        let file = tempfile::NamedTempFile::with_suffix(".docx").unwrap();
        {
            let mut writer = zip::ZipWriter::new(file.reopen().unwrap());
            let options = zip::write::FileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer
                .write_all(b"<w:document><w:p><w:t>Hello docx world.</w:t></w:p></w:document>")
                .unwrap();
            writer.finish().unwrap();
        }

        let extractor = DocxExtractor::new();
        let text = extractor.extract(file.path()).await.unwrap();
        assert_eq!(text.trim(), "Hello docx world.");
    }

    #[tokio::test]
    async fn test_not_a_zip_is_parse_error() {
        let mut file = tempfile::NamedTempFile::with_suffix(".docx").unwrap();
        file.write_all(b"plain bytes").unwrap();
        file.flush().unwrap();

        let extractor = DocxExtractor::new();
        let err = extractor.extract(file.path()).await.unwrap_err();
        assert!(matches!(err, ExtractError::Parse { .. }));
    }
}
