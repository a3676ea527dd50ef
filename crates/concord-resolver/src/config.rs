//! Configuration for subject resolution

use serde::{Deserialize, Serialize};

/// Configuration for the subject resolver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum cosine similarity for an embedding match
    pub similarity_threshold: f64,

    /// Minimum lead over the second-best candidate; closer races are
    /// ambiguous no matter how high the top score is
    pub ambiguity_delta: f64,

    /// Similarity at or above which a *created* subject gets a
    /// possible-equivalent suggestion against the near miss
    pub suggest_floor: f64,

    /// Minimum normalized length for a creatable subject name
    pub min_name_chars: usize,

    /// Maximum word count for a creatable subject name
    pub max_name_words: usize,

    /// Generic terms that never become subjects on their own
    pub generic_terms: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            ambiguity_delta: 0.06,
            suggest_floor: 0.75,
            min_name_chars: 3,
            max_name_words: 12,
            generic_terms: [
                "system", "service", "platform", "application", "solution",
                "product", "company", "organization", "team", "customer",
                "user", "vendor", "provider", "document", "data",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ResolverConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(format!(
                "similarity_threshold {} out of range [0.0, 1.0]",
                self.similarity_threshold
            ));
        }
        if !(0.0..=1.0).contains(&self.ambiguity_delta) {
            return Err(format!(
                "ambiguity_delta {} out of range [0.0, 1.0]",
                self.ambiguity_delta
            ));
        }
        if self.suggest_floor > self.similarity_threshold {
            return Err(format!(
                "suggest_floor {} must not exceed similarity_threshold {}",
                self.suggest_floor, self.similarity_threshold
            ));
        }
        if self.min_name_chars == 0 {
            return Err("min_name_chars must be greater than 0".to_string());
        }
        if self.max_name_words == 0 {
            return Err("max_name_words must be greater than 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ResolverConfig::default().validate().is_ok());
    }

    #[test]
    fn test_suggest_floor_above_threshold_rejected() {
        let config = ResolverConfig {
            suggest_floor: 0.9,
            similarity_threshold: 0.85,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
