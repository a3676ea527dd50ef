//! Applicability axes - contextual dimensions with inferred value orderings

/// How confident the engine is that an axis's values are ordered
///
/// The derived `Ord` ranks `Unknown < Inferred < Certain`. Axis merges rely
/// on this: confidence is monotonically non-decreasing across merges, so a
/// later, less-informative observation can never downgrade what an earlier
/// inference established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrderingConfidence {
    /// No ordering evidence yet
    Unknown,
    /// An ordering was inferred from partial evidence
    Inferred,
    /// Every known value parsed under one ordering shape
    Certain,
}

impl OrderingConfidence {
    /// Stable string form for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderingConfidence::Unknown => "unknown",
            OrderingConfidence::Inferred => "inferred",
            OrderingConfidence::Certain => "certain",
        }
    }

    /// Parse the stable string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unknown" => Some(OrderingConfidence::Unknown),
            "inferred" => Some(OrderingConfidence::Inferred),
            "certain" => Some(OrderingConfidence::Certain),
            _ => None,
        }
    }
}

/// The kind of order an inference produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    /// Every pair of values is comparable
    Total,
    /// Some pairs are incomparable; not currently produced by inference
    Partial,
}

impl OrderType {
    /// Stable string form for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Total => "total",
            OrderType::Partial => "partial",
        }
    }
}

/// One contextual dimension (e.g. "release") and what is known about it
///
/// Invariants, enforced by the merge rule rather than by this struct:
/// - `ordering_confidence` never decreases across merges
/// - a `value_order` of length >= 2 is only replaced by another of length
///   >= 2; an inconclusive inference never clears a successful one
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicabilityAxis {
    /// Owning tenant
    pub tenant: String,

    /// Axis key, e.g. "release" or "edition"
    pub key: String,

    /// Every raw value ever observed, in first-seen order
    pub known_values: Vec<String>,

    /// Whether the values are believed to form an order
    pub is_orderable: bool,

    /// Confidence in the ordering
    pub ordering_confidence: OrderingConfidence,

    /// The known values in ascending order, when orderable
    pub value_order: Option<Vec<String>>,

    /// Last merge timestamp
    pub updated_at: u64,
}

impl ApplicabilityAxis {
    /// Create an empty axis with no ordering knowledge
    pub fn new(tenant: impl Into<String>, key: impl Into<String>, created_at: u64) -> Self {
        Self {
            tenant: tenant.into(),
            key: key.into(),
            known_values: Vec::new(),
            is_orderable: false,
            ordering_confidence: OrderingConfidence::Unknown,
            value_order: None,
            updated_at: created_at,
        }
    }

    /// Record an observed value; returns true if it was previously unseen
    pub fn observe(&mut self, value: &str) -> bool {
        let trimmed = value.trim();
        if trimmed.is_empty() || self.known_values.iter().any(|v| v == trimmed) {
            return false;
        }
        self.known_values.push(trimmed.to_string());
        true
    }

    /// The greatest value under the inferred order, if one exists
    pub fn latest_value(&self) -> Option<&str> {
        self.value_order
            .as_ref()
            .and_then(|order| order.last())
            .map(|s| s.as_str())
    }

    /// Position of a value in the inferred order
    pub fn position(&self, value: &str) -> Option<usize> {
        self.value_order
            .as_ref()
            .and_then(|order| order.iter().position(|v| v == value))
    }
}
