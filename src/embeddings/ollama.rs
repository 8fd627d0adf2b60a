use crate::embeddings::EmbeddingProvider;
use crate::error::ProviderError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

/// Embedding provider backed by an Ollama server
pub struct OllamaEmbeddingProvider {
    base_url: String,
    model: String,
    dimension: AtomicUsize, // updated at runtime if the model disagrees
    client: reqwest::Client,
}

impl OllamaEmbeddingProvider {
    /// Known dimensions for common embedding models
    pub(crate) fn dimension_for_model(model: &str) -> usize {
        match model {
            m if m.contains("mxbai-embed") => 1024,
            m if m.contains("nomic-embed") => 768,
            m if m.contains("all-minilm") => 384,
            _ => 768,
        }
    }

    pub fn new(base_url: &str, model: &str, dimension: Option<usize>) -> Self {
        let dimension = dimension.unwrap_or_else(|| Self::dimension_for_model(model));
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            dimension: AtomicUsize::new(dimension),
            client: reqwest::Client::new(),
        }
    }

    /// Cheap connectivity check against the server's model listing
    pub async fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(10))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[derive(Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[async_trait::async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str, timeout: Duration) -> Result<Vec<f32>, ProviderError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "cannot embed empty content".to_string(),
            ));
        }

        let url = format!("{}/api/embeddings", self.base_url);
        let request = OllamaEmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(&url, timeout.as_secs(), e))?;

        if !response.status().is_success() {
            return Err(ProviderError::Http {
                url,
                status: response.status().as_u16(),
            });
        }

        let body: OllamaEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        if body.embedding.is_empty() {
            return Err(ProviderError::InvalidResponse(
                "provider returned an empty embedding".to_string(),
            ));
        }

        let actual = body.embedding.len();
        let expected = self.dimension.load(Ordering::Relaxed);
        if actual != expected {
            info!(
                model = %self.model,
                expected, actual,
                "embedding dimension differs from configured value, updating"
            );
            self.dimension.store(actual, Ordering::Relaxed);
        }

        Ok(body.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = OllamaEmbeddingProvider::new("http://127.0.0.1:11434/", "nomic-embed-text", None);
        assert_eq!(provider.base_url, "http://127.0.0.1:11434");
        assert_eq!(provider.model, "nomic-embed-text");
        assert_eq!(provider.dimension(), 768);
    }

    #[test]
    fn test_explicit_dimension_wins() {
        let provider =
            OllamaEmbeddingProvider::new("http://127.0.0.1:11434", "custom-model", Some(1536));
        assert_eq!(provider.dimension(), 1536);
    }

    #[test]
    fn test_dimension_for_model() {
        assert_eq!(
            OllamaEmbeddingProvider::dimension_for_model("mxbai-embed-large"),
            1024
        );
        assert_eq!(
            OllamaEmbeddingProvider::dimension_for_model("nomic-embed-text"),
            768
        );
        assert_eq!(OllamaEmbeddingProvider::dimension_for_model("all-minilm"), 384);
        assert_eq!(OllamaEmbeddingProvider::dimension_for_model("unknown"), 768);
    }

    #[tokio::test]
    #[ignore] // Requires Ollama server running
    async fn test_embed_against_live_server() {
        let provider = OllamaEmbeddingProvider::new("http://127.0.0.1:11434", "nomic-embed-text", None);
        let embedding = provider
            .embed("test content", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(embedding.len(), 768);
    }
}
