//! Scope keys - canonicalized digests of contextual qualifiers

use sha2::{Digest, Sha256};
use std::fmt;

/// The scope key used when a claim carries no qualifiers
pub const DEFAULT_SCOPE: &str = "default";

/// Canonicalized hash of a claim's contextual qualifiers
///
/// Qualifiers such as edition or region narrow where a claim applies. Two
/// claims belong to the same consolidation group only if their qualifier
/// sets canonicalize to the same key. Canonicalization sorts qualifiers by
/// key and normalizes casing/whitespace, so insertion order and spelling
/// variance never split a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey(String);

impl ScopeKey {
    /// The scope for claims with no contextual qualifiers
    pub fn default_scope() -> Self {
        Self(DEFAULT_SCOPE.to_string())
    }

    /// Build a scope key from qualifier pairs
    ///
    /// An empty qualifier set yields the default scope, not a digest of
    /// nothing, so unqualified claims stay readable in storage.
    pub fn from_qualifiers(qualifiers: &[(String, String)]) -> Self {
        let mut canonical: Vec<(String, String)> = qualifiers
            .iter()
            .map(|(k, v)| (canon(k), canon(v)))
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .collect();
        if canonical.is_empty() {
            return Self::default_scope();
        }
        canonical.sort();
        canonical.dedup();

        let mut hasher = Sha256::new();
        for (k, v) in &canonical {
            hasher.update(k.as_bytes());
            hasher.update([0x1f]);
            hasher.update(v.as_bytes());
            hasher.update([0x1e]);
        }
        let digest = hasher.finalize();
        let mut hex = String::with_capacity(64);
        for byte in digest {
            hex.push_str(&format!("{:02x}", byte));
        }
        Self(hex)
    }

    /// Reconstruct a scope key from its stored string form
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The stored string form
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn canon(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_qualifiers_use_default_scope() {
        assert_eq!(ScopeKey::from_qualifiers(&[]).as_str(), DEFAULT_SCOPE);
    }

    #[test]
    fn test_order_insensitive() {
        let a = ScopeKey::from_qualifiers(&pairs(&[("edition", "cloud"), ("region", "eu")]));
        let b = ScopeKey::from_qualifiers(&pairs(&[("region", "eu"), ("edition", "cloud")]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let a = ScopeKey::from_qualifiers(&pairs(&[("Region", "  EU ")]));
        let b = ScopeKey::from_qualifiers(&pairs(&[("region", "eu")]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_qualifiers_distinct_keys() {
        let a = ScopeKey::from_qualifiers(&pairs(&[("region", "eu")]));
        let b = ScopeKey::from_qualifiers(&pairs(&[("region", "us")]));
        assert_ne!(a, b);
    }
}
