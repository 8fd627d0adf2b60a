use std::path::PathBuf;
use thiserror::Error;

/// Failures talking to a network-backed provider (embeddings or chat).
///
/// Timeouts and HTTP errors are retryable; the retry policy decides how often.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("request to {url} timed out after {seconds}s")]
    Timeout { url: String, seconds: u64 },

    #[error("provider at {url} returned HTTP {status}")]
    Http { url: String, status: u16 },

    #[error("transport error talking to {url}: {message}")]
    Transport { url: String, message: String },

    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Classify a reqwest failure against the URL it was sent to.
    pub fn from_reqwest(url: &str, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout {
                url: url.to_string(),
                seconds: timeout_secs,
            }
        } else if let Some(status) = err.status() {
            ProviderError::Http {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            ProviderError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Text extraction failures. Never fatal to the pipeline; the affected file
/// lands in the retryable failed set instead.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("io error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Vector store failures. A write failure must leave the stored fingerprint
/// untouched so the file stays eligible for retry.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("store at {url} returned HTTP {status}: {body}")]
    Http {
        url: String,
        status: u16,
        body: String,
    },

    #[error("collection error: {0}")]
    Collection(String),

    #[error("invalid store response: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::Timeout {
            url: "http://localhost:11434".to_string(),
            seconds: 30,
        };
        assert_eq!(
            err.to_string(),
            "request to http://localhost:11434 timed out after 30s"
        );

        let err = ProviderError::Http {
            url: "http://localhost:11434".to_string(),
            status: 503,
        };
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_extract_error_display() {
        let err = ExtractError::UnsupportedType("xlsx".to_string());
        assert_eq!(err.to_string(), "unsupported file type: xlsx");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Http {
            url: "http://localhost:8000".to_string(),
            status: 500,
            body: "internal".to_string(),
        };
        assert!(err.to_string().contains("500"));
        assert!(err.to_string().contains("internal"));
    }
}
