//! Value module - the closed tagged union for claim payloads
//!
//! Claim payloads are dynamic in the wild (numbers, percentages, version
//! strings, enumerations, free text). They are represented here as a closed
//! union with an explicit discriminant, never as an open dictionary, so that
//! every consumer can match exhaustively.

use std::fmt;

/// Comparison operator for inequality-shaped values ("< 200ms")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IneqOp {
    /// Strictly less than the bound
    Less,
    /// Less than or equal to the bound
    LessEq,
    /// Strictly greater than the bound
    Greater,
    /// Greater than or equal to the bound
    GreaterEq,
}

impl IneqOp {
    /// Symbolic form of the operator
    pub fn as_str(&self) -> &'static str {
        match self {
            IneqOp::Less => "<",
            IneqOp::LessEq => "<=",
            IneqOp::Greater => ">",
            IneqOp::GreaterEq => ">=",
        }
    }
}

/// Discriminant for [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// A single dimensionless numeric magnitude
    Scalar,
    /// A percentage magnitude; compared strictly, not under relative tolerance
    Percent,
    /// A closed numeric range
    Interval,
    /// A one-sided numeric bound
    Inequality,
    /// A small enumeration of items
    Set,
    /// A boolean
    Boolean,
    /// A version-like token ("v1.2", "2.4.1")
    Version,
    /// Free text (the fallback)
    Text,
}

impl ValueKind {
    /// Stable string form for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Scalar => "scalar",
            ValueKind::Percent => "percent",
            ValueKind::Interval => "interval",
            ValueKind::Inequality => "inequality",
            ValueKind::Set => "set",
            ValueKind::Boolean => "boolean",
            ValueKind::Version => "version",
            ValueKind::Text => "text",
        }
    }

    /// Parse the stable string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scalar" => Some(ValueKind::Scalar),
            "percent" => Some(ValueKind::Percent),
            "interval" => Some(ValueKind::Interval),
            "inequality" => Some(ValueKind::Inequality),
            "set" => Some(ValueKind::Set),
            "boolean" => Some(ValueKind::Boolean),
            "version" => Some(ValueKind::Version),
            "text" => Some(ValueKind::Text),
            _ => None,
        }
    }
}

/// A claim payload
///
/// Parsing is best-effort and total: anything that does not match a more
/// specific shape lands in [`Value::Text`]. Parsing never invents precision -
/// "around 100" stays text, it does not become a scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A single dimensionless numeric magnitude
    Scalar(f64),
    /// A percentage magnitude ("99.5%")
    ///
    /// Kept apart from `Scalar` because percentages are commitments on a
    /// bounded scale: a 99.5% and a 97.0% SLA are materially different even
    /// though they sit within a few percent of each other, so consistency
    /// checks compare them strictly rather than under relative tolerance.
    Percent(f64),
    /// A closed numeric range [low, high]
    Interval {
        /// Lower end of the range
        low: f64,
        /// Upper end of the range
        high: f64,
    },
    /// A one-sided numeric bound
    Inequality {
        /// The comparison operator
        op: IneqOp,
        /// The bound being compared against
        bound: f64,
    },
    /// A small enumeration of items
    Set(Vec<String>),
    /// A boolean
    Boolean(bool),
    /// A version-like token, stored verbatim
    Version(String),
    /// Free text
    Text(String),
}

impl Value {
    /// The discriminant of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Scalar(_) => ValueKind::Scalar,
            Value::Percent(_) => ValueKind::Percent,
            Value::Interval { .. } => ValueKind::Interval,
            Value::Inequality { .. } => ValueKind::Inequality,
            Value::Set(_) => ValueKind::Set,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Version(_) => ValueKind::Version,
            Value::Text(_) => ValueKind::Text,
        }
    }

    /// Best-effort parse of a raw payload string
    pub fn parse(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Text(String::new());
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" => return Value::Boolean(true),
            "false" | "no" => return Value::Boolean(false),
            _ => {}
        }

        if let Some(v) = parse_inequality(trimmed) {
            return v;
        }
        if let Some(n) = parse_percent(trimmed) {
            return Value::Percent(n);
        }
        if let Some(n) = parse_number(trimmed) {
            return Value::Scalar(n);
        }
        if let Some(v) = parse_interval(trimmed) {
            return v;
        }
        if looks_like_version(trimmed) {
            return Value::Version(trimmed.to_string());
        }
        if let Some(items) = parse_set(trimmed) {
            return Value::Set(items);
        }

        Value::Text(trimmed.to_string())
    }

    /// Parse with an extractor-declared kind hint
    ///
    /// The hint wins when the raw string is representable under it; otherwise
    /// this falls back to [`Value::parse`] rather than fabricating a payload.
    pub fn parse_as(raw: &str, kind: ValueKind) -> Value {
        let trimmed = raw.trim();
        match kind {
            ValueKind::Scalar => {
                if let Some(n) = parse_number(trimmed) {
                    return Value::Scalar(n);
                }
            }
            ValueKind::Percent => {
                if let Some(n) = parse_percent(trimmed).or_else(|| parse_number(trimmed)) {
                    return Value::Percent(n);
                }
            }
            ValueKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" => return Value::Boolean(true),
                "false" | "no" => return Value::Boolean(false),
                _ => {}
            },
            ValueKind::Version => {
                if !trimmed.is_empty() {
                    return Value::Version(trimmed.to_string());
                }
            }
            ValueKind::Interval => {
                if let Some(v) = parse_interval(trimmed) {
                    return v;
                }
            }
            ValueKind::Inequality => {
                if let Some(v) = parse_inequality(trimmed) {
                    return v;
                }
            }
            ValueKind::Set => {
                if let Some(items) = parse_set(trimmed) {
                    return Value::Set(items);
                }
            }
            ValueKind::Text => return Value::Text(trimmed.to_string()),
        }
        Value::parse(trimmed)
    }

    /// The numeric magnitude, if this value has exactly one
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Scalar(n) | Value::Percent(n) => Some(*n),
            _ => None,
        }
    }

    /// Canonical comparison form
    ///
    /// Two claims assert the same payload iff their normalized forms are
    /// equal. Scalars print through f64 formatting so "99.50%" and "99.5"
    /// normalize identically; versions drop a leading "v".
    pub fn normalized(&self) -> String {
        match self {
            Value::Scalar(n) => format!("{}", n),
            Value::Percent(n) => format!("{}%", n),
            Value::Interval { low, high } => format!("{}..{}", low, high),
            Value::Inequality { op, bound } => format!("{}{}", op.as_str(), bound),
            Value::Set(items) => {
                let mut sorted: Vec<String> =
                    items.iter().map(|s| s.trim().to_lowercase()).collect();
                sorted.sort();
                sorted.join(",")
            }
            Value::Boolean(b) => format!("{}", b),
            Value::Version(v) => {
                let lower = v.trim().to_lowercase();
                lower
                    .strip_prefix('v')
                    .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
                    .map(|rest| rest.to_string())
                    .unwrap_or(lower)
            }
            Value::Text(t) => t.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())
    }
}

fn parse_number(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    // Reject tokens a float parse would accept but a reader would not
    // ("inf", "nan"; "1e3" is fine).
    if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_percent(s: &str) -> Option<f64> {
    parse_number(s.strip_suffix('%')?.trim())
}

fn parse_inequality(s: &str) -> Option<Value> {
    let (op, rest) = if let Some(rest) = s.strip_prefix("<=") {
        (IneqOp::LessEq, rest)
    } else if let Some(rest) = s.strip_prefix(">=") {
        (IneqOp::GreaterEq, rest)
    } else if let Some(rest) = s.strip_prefix('<') {
        (IneqOp::Less, rest)
    } else if let Some(rest) = s.strip_prefix('>') {
        (IneqOp::Greater, rest)
    } else {
        return None;
    };
    let rest = rest.trim();
    parse_number(rest)
        .or_else(|| parse_percent(rest))
        .map(|bound| Value::Inequality { op, bound })
}

fn parse_interval(s: &str) -> Option<Value> {
    let (a, b) = s.split_once(" to ").or_else(|| s.split_once(".."))?;
    let low = parse_number(a.trim().trim_end_matches('%'))?;
    let high = parse_number(b.trim().trim_end_matches('%'))?;
    if low <= high {
        Some(Value::Interval { low, high })
    } else {
        None
    }
}

fn looks_like_version(s: &str) -> bool {
    let body = match s.strip_prefix('v').or_else(|| s.strip_prefix('V')) {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest,
        Some(_) => return false,
        None => s,
    };
    // Two or more dotted numeric components that did not already parse as a
    // plain number ("1.2.3"), or an explicit v-prefix ("v2").
    let explicit_prefix = s.len() != body.len();
    let parts: Vec<&str> = body.split('.').collect();
    let all_numeric = !parts.is_empty()
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    all_numeric && (explicit_prefix || parts.len() >= 3)
}

fn parse_set(s: &str) -> Option<Vec<String>> {
    let inner = s
        .strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .or_else(|| s.strip_prefix('{').and_then(|r| r.strip_suffix('}')))?;
    let items: Vec<String> = inner
        .split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if items.len() >= 2 {
        Some(items)
    } else {
        None
    }
}
