//! Configuration for the engine

use concord_cluster::ClusterConfig;
use concord_consolidate::ConsolidatorConfig;
use concord_resolver::ResolverConfig;
use concord_temporal::SelectionPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the engine and its components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum time for a single embedding call (seconds); on expiry the
    /// operation proceeds on the lexical path
    #[serde(default = "default_embed_timeout_secs")]
    pub embed_timeout_secs: u64,

    /// Capacity of the document-context resolution cache
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Subject resolver thresholds
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Clusterer thresholds
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Consolidator thresholds
    #[serde(default)]
    pub consolidator: ConsolidatorConfig,

    /// Default latest-selection policy
    #[serde(default)]
    pub selection: SelectionPolicy,
}

fn default_embed_timeout_secs() -> u64 {
    5
}

fn default_cache_capacity() -> usize {
    4096
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embed_timeout_secs: default_embed_timeout_secs(),
            cache_capacity: default_cache_capacity(),
            resolver: ResolverConfig::default(),
            cluster: ClusterConfig::default(),
            consolidator: ConsolidatorConfig::default(),
            selection: SelectionPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Get the embedding timeout as a Duration
    pub fn embed_timeout(&self) -> Duration {
        Duration::from_secs(self.embed_timeout_secs)
    }

    /// Validate the configuration, including every component section
    pub fn validate(&self) -> Result<(), String> {
        if self.embed_timeout_secs == 0 {
            return Err("embed_timeout_secs must be greater than 0".to_string());
        }
        if self.cache_capacity == 0 {
            return Err("cache_capacity must be greater than 0".to_string());
        }
        self.resolver.validate()?;
        self.cluster.validate()?;
        self.consolidator.validate()?;
        self.selection.validate()?;
        Ok(())
    }

    /// Parse a configuration from TOML
    pub fn from_toml_str(input: &str) -> Result<Self, String> {
        let config: Self =
            toml::from_str(input).map_err(|e| format!("Invalid TOML config: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}
