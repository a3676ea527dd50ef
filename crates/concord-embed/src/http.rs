//! HTTP Embedding Provider
//!
//! Integration with a local embedding server speaking the Ollama embeddings
//! API. Network failure, timeout, and model absence all surface as
//! [`EmbedError`]; callers fall back to lexical matching.
//!
//! # Features
//!
//! - Async HTTP communication with the embeddings endpoint
//! - Configurable endpoint and model
//! - Retry logic with exponential backoff
//! - Request timeout handling
//!
//! # Examples
//!
//! ```no_run
//! use concord_embed::HttpEmbedder;
//!
//! let embedder = HttpEmbedder::new("http://localhost:11434", "bge-small", 384);
//! // embed() is async; use it from an async context
//! ```

use crate::{EmbedError, Embedder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default embedding server endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default timeout for embedding requests (10 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Embedding provider backed by a local HTTP embedding server
pub struct HttpEmbedder {
    endpoint: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
    max_retries: u32,
}

/// Request body for the embeddings API
#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    prompt: String,
}

/// Response from the embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    /// Create a new HTTP embedder
    ///
    /// # Parameters
    ///
    /// - `endpoint`: embedding server endpoint (e.g. "http://localhost:11434")
    /// - `model`: embedding model name (e.g. "bge-small")
    /// - `dimension`: expected vector dimension for the model
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, dimension: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            dimension,
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Create an embedder against the default local endpoint
    pub fn default_endpoint(model: impl Into<String>, dimension: usize) -> Self {
        Self::new(DEFAULT_ENDPOINT, model, dimension)
    }

    /// Set the maximum number of retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let url = format!("{}/api/embeddings", self.endpoint);

        let request_body = EmbeddingRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
        };

        // Retry loop with exponential backoff
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < self.max_retries {
            match self.client.post(&url).json(&request_body).send().await {
                Ok(response) => {
                    if response.status().is_success() {
                        return match response.json::<EmbeddingResponse>().await {
                            Ok(body) if body.embedding.len() == self.dimension => {
                                Ok(body.embedding)
                            }
                            Ok(body) => Err(EmbedError::InvalidResponse(format!(
                                "Expected dimension {}, got {}",
                                self.dimension,
                                body.embedding.len()
                            ))),
                            Err(e) => Err(EmbedError::InvalidResponse(format!(
                                "Failed to parse response: {}",
                                e
                            ))),
                        };
                    } else if response.status() == reqwest::StatusCode::NOT_FOUND {
                        return Err(EmbedError::ModelNotAvailable(self.model.clone()));
                    } else {
                        let status = response.status();
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        last_error = Some(EmbedError::Communication(format!(
                            "HTTP {}: {}",
                            status, error_text
                        )));
                    }
                }
                Err(e) => {
                    last_error = Some(EmbedError::Communication(format!("Request failed: {}", e)));
                }
            }

            attempts += 1;
            if attempts < self.max_retries {
                // Exponential backoff: 1s, 2s, 4s, ...
                let delay = Duration::from_secs(2u64.pow(attempts - 1));
                tokio::time::sleep(delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| EmbedError::Communication("Max retries exceeded".to_string())))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.is_empty() {
            return Err(EmbedError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }
        self.request_embedding(text).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_embedder_creation() {
        let embedder = HttpEmbedder::new("http://localhost:11434", "bge-small", 384);
        assert_eq!(embedder.endpoint, "http://localhost:11434");
        assert_eq!(embedder.model, "bge-small");
        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_http_embedder_default_endpoint() {
        let embedder = HttpEmbedder::default_endpoint("bge-small", 384);
        assert_eq!(embedder.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_http_embedder_with_max_retries() {
        let embedder = HttpEmbedder::new("http://localhost:11434", "bge-small", 384)
            .with_max_retries(5);
        assert_eq!(embedder.max_retries, 5);
    }

    // Integration test (requires a running embedding server)
    #[tokio::test]
    #[ignore] // Only run when an embedding server is available
    async fn test_http_embed_integration() {
        let embedder = HttpEmbedder::default_endpoint("bge-small", 384).with_max_retries(1);
        let result = embedder.embed("hello").await;
        if let Ok(embedding) = result {
            assert_eq!(embedding.len(), 384);
        }
    }
}
