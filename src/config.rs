use crate::constants;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration loaded from settings.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub watch: WatchConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chroma: ChromaConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub response_cache: ResponseCacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Directory tree to keep indexed
    pub root: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_scan_workers")]
    pub scan_workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub url: String,
    pub model: String,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_embed_workers")]
    pub workers: usize,
    #[serde(default = "default_embed_timeouts")]
    pub timeouts_secs: Vec<u64>,
    #[serde(default = "default_retry_pause_ms")]
    pub retry_pause_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromaConfig {
    pub url: String,
    pub collection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseCacheConfig {
    pub capacity: usize,
    pub ttl_secs: u64,
}

fn default_extensions() -> Vec<String> {
    constants::SUPPORTED_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_scan_workers() -> usize {
    constants::DEFAULT_SCAN_WORKERS
}

fn default_embed_workers() -> usize {
    constants::DEFAULT_EMBED_WORKERS
}

fn default_embed_timeouts() -> Vec<u64> {
    constants::DEFAULT_EMBED_TIMEOUTS_SECS.to_vec()
}

fn default_retry_pause_ms() -> u64 {
    constants::DEFAULT_RETRY_PAUSE_MS
}

fn default_top_k() -> usize {
    constants::DEFAULT_TOP_K
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from default locations or return defaults
    pub fn load() -> Result<Self> {
        let default_paths = [
            PathBuf::from("config/settings.toml"),
            PathBuf::from("./config/settings.toml"),
            PathBuf::from(shellexpand::tilde("~/.config/knowbase/settings.toml").into_owned()),
        ];

        for path in &default_paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch: WatchConfig {
                root: PathBuf::from("./documents"),
                extensions: default_extensions(),
                scan_workers: default_scan_workers(),
            },
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            chroma: ChromaConfig::default(),
            chat: ChatConfig::default(),
            response_cache: ResponseCacheConfig::default(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            size: constants::DEFAULT_CHUNK_SIZE,
            overlap: constants::DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dims: None,
            workers: default_embed_workers(),
            timeouts_secs: default_embed_timeouts(),
            retry_pause_ms: default_retry_pause_ms(),
        }
    }
}

impl Default for ChromaConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000".to_string(),
            collection: "knowbase".to_string(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:11434".to_string(),
            model: "mistral".to_string(),
            temperature: 0.7,
            max_tokens: 1024,
            timeout_secs: 60,
            top_k: default_top_k(),
        }
    }
}

impl Default for ResponseCacheConfig {
    fn default() -> Self {
        Self {
            capacity: constants::DEFAULT_RESPONSE_CACHE_CAPACITY,
            ttl_secs: constants::DEFAULT_RESPONSE_CACHE_TTL_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.url, "http://127.0.0.1:11434");
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.chroma.url, "http://127.0.0.1:8000");
        assert_eq!(config.chunking.size, 1000);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.embedding.workers, 4);
        assert_eq!(config.watch.scan_workers, 3);
    }

    #[test]
    fn test_config_from_file() {
        let temp_file = std::env::temp_dir().join("knowbase_test_config.toml");
        std::fs::write(
            &temp_file,
            r#"
[watch]
root = "/srv/documents"
extensions = ["txt", "pdf"]

[chunking]
size = 800
overlap = 100

[embedding]
url = "http://localhost:11434"
model = "mxbai-embed-large"

[chroma]
url = "http://localhost:8000"
collection = "kb_test"

[chat]
url = "http://localhost:11434"
model = "llama3"
temperature = 0.2
max_tokens = 512
timeout_secs = 30

[response_cache]
capacity = 64
ttl_secs = 600
"#,
        )
        .unwrap();

        let config = Config::from_file(&temp_file).unwrap();
        assert_eq!(config.watch.root, PathBuf::from("/srv/documents"));
        assert_eq!(config.watch.extensions, vec!["txt", "pdf"]);
        assert_eq!(config.chunking.size, 800);
        assert_eq!(config.embedding.model, "mxbai-embed-large");
        assert_eq!(config.chroma.collection, "kb_test");
        assert_eq!(config.chat.model, "llama3");
        assert_eq!(config.response_cache.capacity, 64);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.embedding.workers, 4);
        assert_eq!(config.embedding.timeouts_secs, vec![30, 45, 60]);
        assert_eq!(config.chat.top_k, 5);
    }

    #[test]
    fn test_minimal_config_parses() {
        let temp_file = std::env::temp_dir().join("knowbase_minimal_config.toml");
        std::fs::write(
            &temp_file,
            r#"
[watch]
root = "/data"
"#,
        )
        .unwrap();

        let config = Config::from_file(&temp_file).unwrap();
        assert_eq!(config.watch.root, PathBuf::from("/data"));
        assert_eq!(config.chunking.size, 1000);
        assert_eq!(config.chroma.collection, "knowbase");
    }
}
