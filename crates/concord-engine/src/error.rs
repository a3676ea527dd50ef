//! Error types for the engine

use thiserror::Error;

/// Errors that can escape the engine's public operations
///
/// Nothing here crashes an ingestion pipeline: abstention (ambiguity,
/// ask-user) travels in-band in result types, dependency unavailability is
/// recovered by fallback, and per-item input rejection is counted and
/// skipped. What remains is malformed input structure and infrastructure
/// failure, both reported with enough context to retry after a fix.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The batch itself was malformed (missing required identifiers)
    #[error("Invalid input (tenant '{tenant}', document '{document}'): {detail}")]
    InvalidInput {
        /// Tenant the batch targeted
        tenant: String,
        /// Document the batch carried
        document: String,
        /// What was wrong
        detail: String,
    },

    /// Store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Resolver failure (store-level; ambiguity is not an error)
    #[error("Resolver error: {0}")]
    Resolver(String),

    /// Configuration rejected at construction
    #[error("Configuration error: {0}")]
    Config(String),
}
