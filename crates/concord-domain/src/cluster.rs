//! Claim clusters - cross-document groups of equivalent assertions

use crate::claim::ClaimId;
use std::fmt;

/// Unique identifier for a claim cluster based on UUIDv7
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(u128);

impl ClusterId {
    /// Generate a new UUIDv7-based ClusterId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a ClusterId from a raw u128 value
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for ClusterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// A set of raw claims judged to assert the same fact across documents
///
/// Clusters are derived artifacts: they can be recomputed from raw claims at
/// any time and are not themselves a source of truth.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimCluster {
    /// Unique identifier
    pub id: ClusterId,

    /// Owning tenant
    pub tenant: String,

    /// Member raw claim ids, ascending
    pub member_ids: Vec<ClaimId>,

    /// Representative label: the text of the highest-confidence member
    pub label: String,

    /// Distinct source documents covered by the members
    pub document_ids: Vec<String>,

    /// Mean extractor confidence across members
    pub aggregate_confidence: f64,

    /// When this cluster was derived (timestamp)
    pub created_at: u64,
}

impl ClaimCluster {
    /// Number of member claims
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    /// Whether the cluster has no members (never true for stored clusters)
    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }
}
