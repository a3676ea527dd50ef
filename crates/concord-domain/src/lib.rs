//! Concord Domain Layer
//!
//! This crate contains the core domain model for Concord, the claim
//! aggregation and temporal consistency engine. It defines the fundamental
//! concepts, value objects, and trait interfaces that all other layers
//! depend upon.
//!
//! ## Key Concepts
//!
//! - **Subject**: a stable, tenant-scoped identity for what a claim is about
//! - **Raw Claim**: one document's atomic assertion, immutable and append-only
//! - **Value**: a closed tagged union for claim payloads (never an open map)
//! - **Applicability Axis**: a contextual dimension whose values may or may
//!   not admit a total order, with monotone ordering confidence
//! - **Canonical Claim**: the consolidated view of one (subject, kind, scope)
//!   group, regenerated idempotently, never mutated in place
//!
//! ## Architecture
//!
//! - Pure domain logic only; infrastructure implementations live in other
//!   crates behind the traits in [`traits`]
//! - Two subjects are never silently unified; equivalence is only suggested
//! - Derivations are re-runnable: everything downstream of raw claims can be
//!   recomputed from them at any time

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod axis;
pub mod canonical;
pub mod claim;
pub mod cluster;
pub mod scope;
pub mod subject;
pub mod traits;
pub mod value;

// Re-exports for convenience
pub use axis::{ApplicabilityAxis, OrderType, OrderingConfidence};
pub use canonical::{CanonicalClaim, Maturity, SourceRef};
pub use claim::{ClaimId, RawClaim};
pub use cluster::{ClaimCluster, ClusterId};
pub use scope::ScopeKey;
pub use subject::{normalize_name, Subject, SubjectId};
pub use value::{IneqOp, Value, ValueKind};
