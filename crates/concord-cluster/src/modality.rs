//! Deontic modality and negation classification
//!
//! "The service must encrypt data" and "the service may encrypt data" are
//! different facts even when every content word matches. Candidate pairs are
//! rejected unless their modality classes agree and their negation polarity
//! matches.

/// Deontic modality class of a claim text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    /// must / shall / required / mandatory
    StrongObligation,
    /// should / recommended / ought
    WeakObligation,
    /// may / can / optional / permitted
    Permission,
    /// no modal marker
    Neutral,
}

impl Modality {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::StrongObligation => "strong_obligation",
            Modality::WeakObligation => "weak_obligation",
            Modality::Permission => "permission",
            Modality::Neutral => "neutral",
        }
    }
}

const STRONG: &[&str] = &["must", "shall", "required", "mandatory"];
const WEAK: &[&str] = &["should", "recommended", "ought"];
const PERMISSION: &[&str] = &["may", "can", "optional", "permitted", "allowed"];

const NEGATORS: &[&str] = &["not", "never", "cannot", "nor", "neither", "without"];

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Classify the deontic modality of a claim text by keyword matching
///
/// Stronger markers win when several appear: "must, but may defer" is still
/// a strong obligation.
pub fn classify_modality(text: &str) -> Modality {
    let words = tokens(text);
    let has = |set: &[&str]| words.iter().any(|w| set.contains(&w.as_str()));

    if has(STRONG) {
        Modality::StrongObligation
    } else if has(WEAK) {
        Modality::WeakObligation
    } else if has(PERMISSION) {
        Modality::Permission
    } else {
        Modality::Neutral
    }
}

/// Detect negation polarity of a claim text
pub fn is_negated(text: &str) -> bool {
    tokens(text)
        .iter()
        .any(|w| NEGATORS.contains(&w.as_str()) || w.ends_with("n't"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modality_classes() {
        assert_eq!(
            classify_modality("Data must be encrypted at rest"),
            Modality::StrongObligation
        );
        assert_eq!(
            classify_modality("Backups should run nightly"),
            Modality::WeakObligation
        );
        assert_eq!(
            classify_modality("Users may export their data"),
            Modality::Permission
        );
        assert_eq!(
            classify_modality("The system retains logs for 30 days"),
            Modality::Neutral
        );
    }

    #[test]
    fn test_strongest_marker_wins() {
        assert_eq!(
            classify_modality("Vendors must comply, though they may request an extension"),
            Modality::StrongObligation
        );
    }

    #[test]
    fn test_negation_detection() {
        assert!(is_negated("Data is not stored outside the EU"));
        assert!(is_negated("The service never shares credentials"));
        assert!(is_negated("Access isn't granted by default"));
        assert!(!is_negated("Data is stored in the EU"));
        assert!(!is_negated("Nothing here negates"), "token match, not substring");
    }
}
