//! Concord Engine
//!
//! The orchestration layer tying the components together: per-document
//! ingestion (subject resolution, claim appends, axis observation), the
//! derive-path operations (clustering, consolidation, latest selection), and
//! the background reconsolidation worker.
//!
//! # Concurrency model
//!
//! Documents may be ingested in parallel, but every mutation of a given
//! subject or axis within a tenant is serialized through a per-key lock, so
//! the no-silent-merge and monotone-confidence invariants hold under
//! concurrent updates. Clustering and consolidation run on snapshots and
//! need no locks beyond a consistent read.
//!
//! # Embeddings
//!
//! The embedding provider is optional and slow by assumption. Every call is
//! wrapped in a timeout; failure or absence downgrades matching to the
//! lexical path and is never fatal.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod locks;
pub mod worker;

pub use cache::ContextCache;
pub use config::EngineConfig;
pub use engine::{ClaimInput, DocumentBatch, Engine, IngestFailure, IngestReport};
pub use error::EngineError;
pub use worker::ReconsolidationWorker;
