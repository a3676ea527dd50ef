//! Governance policy for latest-candidate selection

use serde::{Deserialize, Serialize};

/// Declared authority of a document's origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentAuthority {
    /// Published by the owning organization
    Official,
    /// Reviewed or attested by a trusted party
    Verified,
    /// Community-contributed
    Community,
    /// Origin not established
    Unknown,
}

impl DocumentAuthority {
    /// Rank for comparison; higher is more authoritative
    pub fn rank(&self) -> u8 {
        match self {
            DocumentAuthority::Official => 3,
            DocumentAuthority::Verified => 2,
            DocumentAuthority::Community => 1,
            DocumentAuthority::Unknown => 0,
        }
    }

    /// Whether the authority is established at all
    pub fn is_known(&self) -> bool {
        !matches!(self, DocumentAuthority::Unknown)
    }

    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentAuthority::Official => "official",
            DocumentAuthority::Verified => "verified",
            DocumentAuthority::Community => "community",
            DocumentAuthority::Unknown => "unknown",
        }
    }

    /// Parse the stable string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "official" => Some(DocumentAuthority::Official),
            "verified" => Some(DocumentAuthority::Verified),
            "community" => Some(DocumentAuthority::Community),
            "unknown" => Some(DocumentAuthority::Unknown),
            _ => None,
        }
    }
}

/// How to break ties among equally authoritative candidates when the primary
/// axis cannot rank them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreakStrategy {
    /// Deterministic arbitrary pick (lexicographically smallest id)
    Arbitrary,
    /// Select nothing; return every tied candidate as an alternative
    ReturnAll,
    /// Escalate to the user
    AskUser,
}

/// Governance policy driving [`crate::select_latest`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionPolicy {
    /// Only candidates with this status are considered, when set
    pub required_status: Option<String>,

    /// Document types excluded from consideration
    pub excluded_doc_types: Vec<String>,

    /// Minimum fraction of candidates with known authority for the
    /// authority-ranking path
    pub known_ratio_threshold: f64,

    /// Tie-break among the top authority tier when the axis cannot rank
    pub tie_break: TieBreakStrategy,

    /// Whether a CERTAIN axis order may substitute for authority knowledge
    pub allow_axis_fallback: bool,

    /// The axis whose order ranks candidates, e.g. "release"
    pub primary_axis: String,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            required_status: None,
            excluded_doc_types: Vec::new(),
            known_ratio_threshold: 0.5,
            tie_break: TieBreakStrategy::Arbitrary,
            allow_axis_fallback: true,
            primary_axis: "release".to_string(),
        }
    }
}

impl SelectionPolicy {
    /// Validate the policy
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.known_ratio_threshold) {
            return Err(format!(
                "known_ratio_threshold {} out of range [0.0, 1.0]",
                self.known_ratio_threshold
            ));
        }
        if self.primary_axis.is_empty() {
            return Err("primary_axis must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authority_ranking() {
        assert!(DocumentAuthority::Official.rank() > DocumentAuthority::Verified.rank());
        assert!(DocumentAuthority::Verified.rank() > DocumentAuthority::Community.rank());
        assert!(DocumentAuthority::Community.rank() > DocumentAuthority::Unknown.rank());
        assert!(!DocumentAuthority::Unknown.is_known());
    }

    #[test]
    fn test_authority_string_roundtrip() {
        for a in [
            DocumentAuthority::Official,
            DocumentAuthority::Verified,
            DocumentAuthority::Community,
            DocumentAuthority::Unknown,
        ] {
            assert_eq!(DocumentAuthority::parse(a.as_str()), Some(a));
        }
    }

    #[test]
    fn test_default_policy_is_valid() {
        let policy = SelectionPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.known_ratio_threshold, 0.5);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let policy = SelectionPolicy {
            known_ratio_threshold: 1.5,
            ..Default::default()
        };
        assert!(policy.validate().is_err());
    }
}
