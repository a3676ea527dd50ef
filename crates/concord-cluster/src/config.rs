//! Configuration for the clusterer

use serde::{Deserialize, Serialize};

/// Configuration for claim clustering
///
/// The thresholds are heuristics inherited from operational tuning, kept
/// configurable rather than fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Minimum cosine similarity between claim-text embeddings (stage 1)
    pub cosine_threshold: f64,

    /// Minimum content-word Jaccard similarity (stage 1 fallback, and the
    /// stage 2 lexical re-check for every pair)
    pub jaccard_threshold: f64,

    /// Maximum members per cluster; larger components are trimmed
    pub max_cluster_size: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            cosine_threshold: 0.85,
            jaccard_threshold: 0.3,
            max_cluster_size: 12,
        }
    }
}

impl ClusterConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.cosine_threshold) {
            return Err(format!(
                "cosine_threshold {} out of range [0.0, 1.0]",
                self.cosine_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.jaccard_threshold) {
            return Err(format!(
                "jaccard_threshold {} out of range [0.0, 1.0]",
                self.jaccard_threshold
            ));
        }
        if self.max_cluster_size < 2 {
            return Err("max_cluster_size must be at least 2".to_string());
        }
        Ok(())
    }
}
