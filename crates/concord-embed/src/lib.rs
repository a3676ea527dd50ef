//! Concord Embedding Layer
//!
//! The engine treats embedding computation as an injected, potentially slow
//! capability: available when a local embedding server is running, absent
//! otherwise. Every consumer has a lexical fallback path, so a failure here
//! downgrades matching quality but never aborts processing.
//!
//! # Providers
//!
//! - `HashEmbedder`: deterministic hash-based vectors for tests and offline use
//! - `HttpEmbedder`: local embedding server integration (Ollama-compatible API)
//!
//! # Examples
//!
//! ```
//! use concord_embed::{cosine_similarity, Embedder, HashEmbedder};
//!
//! # tokio_test::block_on(async {
//! let model = HashEmbedder::new(384);
//! let a = model.embed("The sky is blue").await.unwrap();
//! let b = model.embed("The sky is blue").await.unwrap();
//! assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
//! # });
//! ```

#![warn(missing_docs)]

pub mod http;

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

pub use http::HttpEmbedder;

/// Errors that can occur while obtaining embeddings
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from the embedding server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Embedding model not available on the server
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// The injected embedding capability
///
/// Implementations must produce deterministic vectors for identical input
/// while they remain configured with the same model. Callers treat any error
/// as "embeddings unavailable" and fall back to lexical matching.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding vector for the given text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// The dimension of vectors produced by this embedder
    fn dimension(&self) -> usize;
}

/// Deterministic hash-based embedder
///
/// Generates pseudo-random but reproducible unit vectors from text content.
/// Not semantically meaningful; it exists so the full pipeline can run in
/// tests and in deployments without an embedding server.
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    /// Create a new hash embedder
    ///
    /// # Parameters
    ///
    /// - `dimension`: the embedding dimension (e.g. 384 for bge-small)
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Hash text with a seed to get a deterministic f32 value
    fn hash_with_seed(text: &str, seed: u64) -> f32 {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        seed.hash(&mut hasher);
        let hash_value = hasher.finish();

        // Convert hash to float in range [-1, 1]
        let normalized = (hash_value as f64 / u64::MAX as f64) * 2.0 - 1.0;
        normalized as f32
    }

    /// Synchronous embedding, for callers outside an async context
    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if text.is_empty() {
            return Err(EmbedError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }

        let mut embedding = Vec::with_capacity(self.dimension);
        for i in 0..self.dimension {
            embedding.push(Self::hash_with_seed(text, i as u64));
        }

        // Normalize to unit length for cosine similarity
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        }

        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        self.embed_sync(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Calculate cosine similarity between two embedding vectors
///
/// Returns a value in [-1, 1]: 1.0 for identical direction, 0.0 for
/// orthogonal, -1.0 for opposite. Zero-magnitude inputs yield 0.0.
///
/// # Panics
///
/// Panics if the vectors have different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vectors must have same length");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
