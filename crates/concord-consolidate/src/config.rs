//! Configuration for consolidation

use serde::{Deserialize, Serialize};

/// Configuration for the consolidator
///
/// The tolerance and threshold are heuristics inherited from operational
/// tuning, kept configurable rather than fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatorConfig {
    /// Fraction of conditional assertions above which a group is
    /// context-dependent
    pub conditional_threshold: f64,

    /// Relative tolerance for scalar agreement: values differing by more
    /// than this fraction of the larger magnitude conflict
    pub numeric_tolerance: f64,

    /// Maximum cited sources per canonical claim
    pub max_cited_sources: usize,
}

impl Default for ConsolidatorConfig {
    fn default() -> Self {
        Self {
            conditional_threshold: 0.7,
            numeric_tolerance: 0.05,
            max_cited_sources: 5,
        }
    }
}

impl ConsolidatorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.conditional_threshold) {
            return Err(format!(
                "conditional_threshold {} out of range [0.0, 1.0]",
                self.conditional_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.numeric_tolerance) {
            return Err(format!(
                "numeric_tolerance {} out of range [0.0, 1.0]",
                self.numeric_tolerance
            ));
        }
        if self.max_cited_sources == 0 {
            return Err("max_cited_sources must be greater than 0".to_string());
        }
        Ok(())
    }
}
