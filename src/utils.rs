use crate::constants::{HASH_BLOCK_SIZE, SHORT_FINGERPRINT_LEN};
use anyhow::Result;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Compute the Blake3 fingerprint of a file, streaming it in fixed-size
/// blocks so arbitrarily large files stay within bounded memory.
pub fn compute_file_hash(file_path: &Path) -> Result<String> {
    let mut file = File::open(file_path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; HASH_BLOCK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Blake3 fingerprint of a piece of text, used to address embedding cache
/// entries and response cache keys.
pub fn hash_text(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// The leading hex characters of a fingerprint, as carried in record ids.
pub fn short_fingerprint(fingerprint: &str) -> &str {
    &fingerprint[..SHORT_FINGERPRINT_LEN.min(fingerprint.len())]
}

/// Get file extension from path (without the dot), lowercased
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
}

/// Filename without its extension, used as the stable part of record ids.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_compute_file_hash_deterministic() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "same content").unwrap();
        file.flush().unwrap();

        let hash1 = compute_file_hash(file.path()).unwrap();
        let hash2 = compute_file_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_compute_file_hash_differs_on_content() {
        let mut file1 = NamedTempFile::new().unwrap();
        write!(file1, "content one").unwrap();
        file1.flush().unwrap();

        let mut file2 = NamedTempFile::new().unwrap();
        write!(file2, "content two").unwrap();
        file2.flush().unwrap();

        assert_ne!(
            compute_file_hash(file1.path()).unwrap(),
            compute_file_hash(file2.path()).unwrap()
        );
    }

    #[test]
    fn test_compute_file_hash_matches_text_hash() {
        // A file's fingerprint and the fingerprint of its text agree, so the
        // chunk cache can be primed from either side.
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "shared body").unwrap();
        file.flush().unwrap();

        assert_eq!(
            compute_file_hash(file.path()).unwrap(),
            hash_text("shared body")
        );
    }

    #[test]
    fn test_hash_text_deterministic() {
        assert_eq!(hash_text("chunk"), hash_text("chunk"));
        assert_ne!(hash_text("chunk"), hash_text("chunk "));
    }

    #[test]
    fn test_short_fingerprint() {
        let full = hash_text("anything");
        assert_eq!(short_fingerprint(&full).len(), SHORT_FINGERPRINT_LEN);
        assert_eq!(short_fingerprint("ab"), "ab");
    }

    #[test]
    fn test_get_extension_lowercase() {
        assert_eq!(
            get_extension(Path::new("/path/to/file.TXT")),
            Some("txt".to_string())
        );
        assert_eq!(get_extension(Path::new("/path/to/file")), None);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("/docs/report.docx")), "report");
        assert_eq!(file_stem(Path::new("/docs/notes")), "notes");
    }
}
