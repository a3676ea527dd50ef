//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and
//! infrastructure. Implementations live in other crates (concord-store for
//! the SQLite-backed stores, concord-embed for the embedding capability).

use crate::{ApplicabilityAxis, CanonicalClaim, ClaimCluster, RawClaim, ScopeKey, Subject, SubjectId};

/// Outcome of an append-only claim write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The claim was new and has been written
    Inserted,
    /// A claim with the same content fingerprint already exists; nothing written
    AlreadyPresent,
}

/// Trait for storing and retrieving subjects
///
/// Mutations to a given subject within one tenant must be serialized by the
/// caller; the store itself does not lock.
pub trait SubjectStore {
    /// Error type for store operations
    type Error;

    /// Get a subject by id
    fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, Self::Error>;

    /// Look up a subject by a normalized name or alias, exact match only
    fn find_by_name(&self, tenant: &str, normalized: &str) -> Result<Option<Subject>, Self::Error>;

    /// All subjects for a tenant
    fn list_subjects(&self, tenant: &str) -> Result<Vec<Subject>, Self::Error>;

    /// Insert or update a subject (keyed by id)
    fn upsert_subject(&mut self, subject: &Subject) -> Result<(), Self::Error>;
}

/// Trait for the append-only raw claim store
pub trait ClaimStore {
    /// Error type for store operations
    type Error;

    /// Append a raw claim, deduplicated by content fingerprint
    fn append_claim(&mut self, claim: &RawClaim) -> Result<AppendOutcome, Self::Error>;

    /// All raw claims for a tenant
    fn claims_for_tenant(&self, tenant: &str) -> Result<Vec<RawClaim>, Self::Error>;

    /// Raw claims for one consolidation group
    fn claims_for_group(
        &self,
        tenant: &str,
        subject_id: SubjectId,
        kind: &str,
        scope: &ScopeKey,
    ) -> Result<Vec<RawClaim>, Self::Error>;
}

/// Trait for persisting derived artifacts with upsert semantics
///
/// Clusters, canonical claims, and axes are all re-derivable; the store only
/// needs merge-by-stable-key writes, never deletes.
pub trait GraphStore {
    /// Error type for store operations
    type Error;

    /// Insert or replace a cluster (keyed by cluster id)
    fn upsert_cluster(&mut self, cluster: &ClaimCluster) -> Result<(), Self::Error>;

    /// Insert or replace a canonical claim (keyed by its group key)
    fn upsert_canonical(&mut self, canonical: &CanonicalClaim) -> Result<(), Self::Error>;

    /// Insert or replace an axis (keyed by tenant + axis key)
    fn upsert_axis(&mut self, axis: &ApplicabilityAxis) -> Result<(), Self::Error>;

    /// Get an axis by tenant and key
    fn get_axis(&self, tenant: &str, key: &str) -> Result<Option<ApplicabilityAxis>, Self::Error>;

    /// All axes for a tenant
    fn list_axes(&self, tenant: &str) -> Result<Vec<ApplicabilityAxis>, Self::Error>;

    /// All canonical claims for a tenant, in group-key order
    fn list_canonical(&self, tenant: &str) -> Result<Vec<CanonicalClaim>, Self::Error>;
}
