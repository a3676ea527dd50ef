//! Canonical claims - the consolidated view of a (subject, kind, scope) group

use crate::claim::ClaimId;
use crate::scope::ScopeKey;
use crate::subject::SubjectId;
use crate::value::Value;

/// How much independent corroboration a consolidated claim has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Maturity {
    /// A single document asserts the value
    Candidate,
    /// Two or more distinct documents agree
    Validated,
    /// Documents disagree beyond tolerance
    Conflicting,
    /// Most assertions are conditional; the value depends on context
    ContextDependent,
    /// An ordered value family indicates the older assertions were replaced
    Superseded,
}

impl Maturity {
    /// Stable string form for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Maturity::Candidate => "candidate",
            Maturity::Validated => "validated",
            Maturity::Conflicting => "conflicting",
            Maturity::ContextDependent => "context_dependent",
            Maturity::Superseded => "superseded",
        }
    }

    /// Parse the stable string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "candidate" => Some(Maturity::Candidate),
            "validated" => Some(Maturity::Validated),
            "conflicting" => Some(Maturity::Conflicting),
            "context_dependent" => Some(Maturity::ContextDependent),
            "superseded" => Some(Maturity::Superseded),
            _ => None,
        }
    }
}

/// A cited source backing a canonical claim
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    /// The contributing raw claim
    pub claim_id: ClaimId,

    /// Its source document
    pub document_id: String,

    /// Its source segment, when known
    pub segment_id: Option<String>,
}

/// One row per (subject, claim-kind, scope-key) group
///
/// Canonical claims are a pure projection of raw claims: recomputed
/// idempotently, never mutated in place, only regenerated. Running the
/// consolidator twice over an unchanged raw claim set yields identical rows.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalClaim {
    /// Owning tenant
    pub tenant: String,

    /// Group key: the subject
    pub subject_id: SubjectId,

    /// Group key: the claim kind
    pub kind: String,

    /// Group key: the scope
    pub scope: ScopeKey,

    /// The chosen representative payload
    pub value: Value,

    /// The representative payload as a document stated it
    pub raw_value: String,

    /// Distinct source documents in the group
    pub document_count: usize,

    /// Total assertions in the group
    pub assertion_count: usize,

    /// Corroboration summary
    pub maturity: Maturity,

    /// Every contributing raw claim id when the group conflicts, ascending
    pub conflicting_ids: Vec<ClaimId>,

    /// Cited sources, bounded by the consolidator's citation limit
    pub sources: Vec<SourceRef>,
}

impl CanonicalClaim {
    /// Stable identity of the group this row consolidates
    ///
    /// Used as the upsert key in the graph store.
    pub fn group_key(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.tenant, self.subject_id, self.kind, self.scope
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maturity_string_roundtrip() {
        for m in [
            Maturity::Candidate,
            Maturity::Validated,
            Maturity::Conflicting,
            Maturity::ContextDependent,
            Maturity::Superseded,
        ] {
            assert_eq!(Maturity::parse(m.as_str()), Some(m));
        }
        assert_eq!(Maturity::parse("mature"), None);
    }

    #[test]
    fn test_group_key_is_stable() {
        let row = CanonicalClaim {
            tenant: "t1".to_string(),
            subject_id: SubjectId::from_value(9),
            kind: "sla_uptime".to_string(),
            scope: ScopeKey::default_scope(),
            value: Value::Scalar(99.5),
            raw_value: "99.5%".to_string(),
            document_count: 2,
            assertion_count: 2,
            maturity: Maturity::Validated,
            conflicting_ids: vec![],
            sources: vec![],
        };
        assert_eq!(row.group_key(), row.clone().group_key());
        assert!(row.group_key().contains("sla_uptime"));
    }
}
