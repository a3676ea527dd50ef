//! Raw claim module - one document's atomic assertion

use crate::scope::ScopeKey;
use crate::subject::SubjectId;
use crate::value::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Unique identifier for a raw claim based on UUIDv7
///
/// UUIDv7 provides:
/// - Chronological sortability for temporal queries and recency tie-breaks
/// - 128-bit uniqueness
/// - RFC 9562-standard format with broad ecosystem support
/// - No coordination required for distributed generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClaimId(u128);

impl ClaimId {
    /// Generate a new UUIDv7-based ClaimId
    ///
    /// # Examples
    ///
    /// ```
    /// use concord_domain::ClaimId;
    ///
    /// let id = ClaimId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a ClaimId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a ClaimId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid claim id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }

    /// Get the timestamp component of the UUIDv7 (milliseconds since Unix epoch)
    pub fn timestamp(&self) -> u64 {
        // UUIDv7: top 48 bits are Unix millisecond timestamp
        (self.0 >> 80) as u64
    }
}

impl Default for ClaimId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClaimId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// One document's atomic assertion
///
/// Raw claims are immutable once written and the store that holds them is
/// append-only. Everything downstream (clusters, canonical claims) is a
/// re-derivable projection; corrections happen by appending, never by
/// editing what a document said.
#[derive(Debug, Clone, PartialEq)]
pub struct RawClaim {
    /// Unique identifier
    pub id: ClaimId,

    /// Owning tenant
    pub tenant: String,

    /// The resolved subject this claim is about
    pub subject_id: SubjectId,

    /// Claim kind, e.g. "sla_uptime" or "support_window"
    pub kind: String,

    /// The payload exactly as the document stated it
    pub raw_value: String,

    /// The parsed payload
    pub value: Value,

    /// Canonicalized scope of applicability
    pub scope: ScopeKey,

    /// Verbatim evidence quote; also the claim text used for clustering
    pub evidence: String,

    /// Source document identifier
    pub document_id: String,

    /// Source segment within the document, when known
    pub segment_id: Option<String>,

    /// Whether the document stated the claim conditionally ("if", "unless")
    pub conditional: bool,

    /// Resolved entities mentioned alongside the subject
    pub entities: Vec<SubjectId>,

    /// Extractor confidence in [0, 1]
    pub confidence: f64,

    /// When this claim was recorded (timestamp)
    pub created_at: u64,
}

impl RawClaim {
    /// Content fingerprint for idempotent re-ingestion
    ///
    /// SHA-256 over (tenant, document, subject, kind, scope, normalized
    /// value). Re-ingesting the same document produces the same fingerprints,
    /// so the append-only store can recognize claims it already holds.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.tenant.as_str(),
            self.document_id.as_str(),
            &self.subject_id.to_string(),
            self.kind.as_str(),
            self.scope.as_str(),
            &self.value.normalized(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0x1f]);
        }
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(64);
        for byte in digest {
            hex.push_str(&format!("{:02x}", byte));
        }
        hex
    }

    /// Validate required fields
    ///
    /// Hard failures are limited to malformed structures; the message carries
    /// enough context to retry the item after a fix.
    pub fn validate(&self) -> Result<(), String> {
        if self.tenant.is_empty() {
            return Err("tenant is empty".to_string());
        }
        if self.kind.is_empty() {
            return Err(format!(
                "claim kind is empty (tenant {}, document {})",
                self.tenant, self.document_id
            ));
        }
        if self.document_id.is_empty() {
            return Err(format!("document id is empty (tenant {})", self.tenant));
        }
        if self.evidence.is_empty() {
            return Err(format!(
                "evidence quote is empty (tenant {}, document {}, kind {})",
                self.tenant, self.document_id, self.kind
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(format!(
                "confidence {} out of range [0.0, 1.0] (tenant {}, document {})",
                self.confidence, self.tenant, self.document_id
            ));
        }
        Ok(())
    }
}
