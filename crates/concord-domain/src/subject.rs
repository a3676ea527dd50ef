//! Subject module - stable identities for what claims are about

use std::fmt;

/// Unique identifier for a subject based on UUIDv7
///
/// UUIDv7 provides:
/// - Chronological sortability (creation order is recoverable)
/// - 128-bit uniqueness with no coordination between workers
/// - RFC 9562-standard format with broad ecosystem support
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubjectId(u128);

impl SubjectId {
    /// Generate a new UUIDv7-based SubjectId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a SubjectId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a SubjectId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid subject id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for SubjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Normalize a raw subject mention for matching
///
/// Lowercases, maps punctuation to spaces, and collapses runs of whitespace.
/// Exact-match resolution compares normalized forms only; the original
/// spelling is preserved on the subject as the canonical display name.
///
/// # Examples
///
/// ```
/// use concord_domain::normalize_name;
///
/// assert_eq!(normalize_name("S/4 Cloud, Public"), "s 4 cloud public");
/// assert_eq!(normalize_name("  ACME   Corp.  "), "acme corp");
/// ```
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = true;
    for ch in raw.chars() {
        let mapped = if ch.is_alphanumeric() {
            Some(ch.to_ascii_lowercase())
        } else if ch.is_whitespace() || ch.is_ascii_punctuation() {
            None
        } else {
            Some(ch)
        };
        match mapped {
            Some(c) => {
                out.push(c);
                last_was_space = false;
            }
            None => {
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
            }
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// A subject - the stable, tenant-scoped identity a claim is about
///
/// Subjects are created on first unresolved mention and never destroyed,
/// only annotated. Two subjects are never silently unified: equivalence
/// candidates go to [`Subject::possible_equivalents`] for human review.
#[derive(Debug, Clone, PartialEq)]
pub struct Subject {
    /// Unique identifier
    pub id: SubjectId,

    /// Owning tenant
    pub tenant: String,

    /// Canonical display name (original spelling of the first mention)
    pub canonical_name: String,

    /// Operator-curated aliases, high trust (matched at confidence 1.0)
    pub aliases: Vec<String>,

    /// System-discovered aliases, medium trust (matched at confidence 0.95)
    pub learned_aliases: Vec<String>,

    /// Optional embedding of the canonical name
    pub embedding: Option<Vec<f32>>,

    /// Possibly-equivalent subject ids, suggested but never auto-merged
    pub possible_equivalents: Vec<SubjectId>,

    /// When this subject was created (timestamp)
    pub created_at: u64,
}

impl Subject {
    /// Create a new subject with no aliases yet
    pub fn new(
        id: SubjectId,
        tenant: impl Into<String>,
        canonical_name: impl Into<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            tenant: tenant.into(),
            canonical_name: canonical_name.into(),
            aliases: Vec::new(),
            learned_aliases: Vec::new(),
            embedding: None,
            possible_equivalents: Vec::new(),
            created_at,
        }
    }

    /// Attach an embedding of the canonical name
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Check a normalized mention against the canonical name and explicit aliases
    pub fn matches_exact(&self, normalized: &str) -> bool {
        normalize_name(&self.canonical_name) == normalized
            || self.aliases.iter().any(|a| normalize_name(a) == normalized)
    }

    /// Check a normalized mention against the learned aliases
    pub fn matches_learned(&self, normalized: &str) -> bool {
        self.learned_aliases
            .iter()
            .any(|a| normalize_name(a) == normalized)
    }

    /// Record a system-discovered alias
    ///
    /// Additive and idempotent: returns false if the alias (in normalized
    /// form) is already known via the canonical name or any alias list.
    pub fn learn_alias(&mut self, alias: &str) -> bool {
        let normalized = normalize_name(alias);
        if normalized.is_empty()
            || self.matches_exact(&normalized)
            || self.matches_learned(&normalized)
        {
            return false;
        }
        self.learned_aliases.push(alias.to_string());
        true
    }

    /// Suggest another subject as possibly equivalent
    ///
    /// Only annotates; resolution of the suggestion is a human decision.
    /// Returns false if the suggestion is already present or is self-referential.
    pub fn suggest_equivalent(&mut self, other: SubjectId) -> bool {
        if other == self.id || self.possible_equivalents.contains(&other) {
            return false;
        }
        self.possible_equivalents.push(other);
        true
    }
}
