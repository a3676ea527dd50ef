//! Axis order inference
//!
//! `infer_order` is a pure function over a set of raw axis values. It tries a
//! fixed family of parseable shapes in priority order; the first shape under
//! which *all* values parse wins, and the values are sorted under that
//! shape's comparison rule with CERTAIN confidence. If no single shape covers
//! every value the result is not orderable - mixed shapes ("I" next to
//! "3.0") never produce a guessed order.

use concord_domain::{OrderType, OrderingConfidence};

/// The value shape an inference succeeded under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// Plain numbers: "2", "3.5", "-1"
    Numeric,
    /// Dotted versions: "1.2.3", "v2.1"
    DottedVersion,
    /// Roman numerals: "II", "IV"
    Roman,
    /// Single 4-digit years: "2023"
    Year,
    /// Quarter-year tokens: "Q1 2024", "2024Q1"
    Quarter,
}

impl ValueShape {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueShape::Numeric => "numeric",
            ValueShape::DottedVersion => "dotted_version",
            ValueShape::Roman => "roman",
            ValueShape::Year => "year",
            ValueShape::Quarter => "quarter",
        }
    }
}

/// Result of an order inference
#[derive(Debug, Clone, PartialEq)]
pub struct OrderInference {
    /// Whether the given values form an order
    pub is_orderable: bool,

    /// The kind of order, when orderable
    pub order_type: Option<OrderType>,

    /// Confidence in the inference
    pub confidence: OrderingConfidence,

    /// The values in ascending order, when orderable
    pub inferred_order: Vec<String>,

    /// The shape the values parsed under, when orderable
    pub shape: Option<ValueShape>,
}

impl OrderInference {
    /// The inconclusive result: nothing learned, nothing guessed
    pub fn not_orderable() -> Self {
        Self {
            is_orderable: false,
            order_type: None,
            confidence: OrderingConfidence::Unknown,
            inferred_order: Vec::new(),
            shape: None,
        }
    }
}

/// Infer whether a family of raw values has a meaningful order
///
/// Shapes are tried in priority order (numeric, dotted version, roman
/// numeral, 4-digit year, quarter token); the first one that parses every
/// value wins with `CERTAIN` confidence and a total order. Duplicates are
/// collapsed before inference. Fewer than two distinct values, or any value
/// no shape covers, yields the inconclusive result.
pub fn infer_order(values: &[String]) -> OrderInference {
    let mut distinct: Vec<&str> = Vec::new();
    for v in values {
        let trimmed = v.trim();
        if !trimmed.is_empty() && !distinct.contains(&trimmed) {
            distinct.push(trimmed);
        }
    }
    if distinct.len() < 2 {
        return OrderInference::not_orderable();
    }

    for shape in [
        ValueShape::Numeric,
        ValueShape::DottedVersion,
        ValueShape::Roman,
        ValueShape::Year,
        ValueShape::Quarter,
    ] {
        if let Some(order) = try_shape(shape, &distinct) {
            return OrderInference {
                is_orderable: true,
                order_type: Some(OrderType::Total),
                confidence: OrderingConfidence::Certain,
                inferred_order: order,
                shape: Some(shape),
            };
        }
    }

    OrderInference::not_orderable()
}

/// Sort the values under one shape's comparison rule, or None if any value
/// does not parse under it. Equal keys fall back to string order so the
/// result is deterministic.
fn try_shape(shape: ValueShape, values: &[&str]) -> Option<Vec<String>> {
    match shape {
        ValueShape::Numeric => sort_under(values, parse_numeric, |a, b| a.total_cmp(b)),
        ValueShape::DottedVersion => sort_under(values, parse_dotted_version, Ord::cmp),
        ValueShape::Roman => sort_under(values, parse_roman, Ord::cmp),
        ValueShape::Year => sort_under(values, parse_year, Ord::cmp),
        ValueShape::Quarter => sort_under(values, parse_quarter, Ord::cmp),
    }
}

fn sort_under<K>(
    values: &[&str],
    parse: impl Fn(&str) -> Option<K>,
    cmp: impl Fn(&K, &K) -> std::cmp::Ordering,
) -> Option<Vec<String>> {
    let mut keyed: Vec<(K, &str)> = Vec::with_capacity(values.len());
    for v in values {
        keyed.push((parse(v)?, v));
    }
    keyed.sort_by(|(ka, va), (kb, vb)| cmp(ka, kb).then_with(|| va.cmp(vb)));
    Some(keyed.into_iter().map(|(_, v)| v.to_string()).collect())
}

fn parse_numeric(s: &str) -> Option<f64> {
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    s.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn parse_dotted_version(s: &str) -> Option<Vec<u64>> {
    let body = match s.strip_prefix('v').or_else(|| s.strip_prefix('V')) {
        Some(rest) => rest,
        None => s,
    };
    let parts: Vec<&str> = body.split('.').collect();
    if parts.is_empty() || parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    parts.iter().map(|p| p.parse::<u64>().ok()).collect()
}

fn parse_roman(s: &str) -> Option<u32> {
    if s.is_empty() || !s.chars().all(|c| "IVXLCDM".contains(c)) {
        return None;
    }
    let digit = |c: char| -> u32 {
        match c {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => 0,
        }
    };
    let chars: Vec<u32> = s.chars().map(digit).collect();
    let mut total = 0u32;
    for (i, &v) in chars.iter().enumerate() {
        if chars.get(i + 1).is_some_and(|&next| next > v) {
            total = total.checked_sub(v)?;
        } else {
            total += v;
        }
    }
    if total == 0 {
        None
    } else {
        Some(total)
    }
}

fn parse_year(s: &str) -> Option<u16> {
    if s.len() != 4 || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<u16>().ok().filter(|y| (1000..=2999).contains(y))
}

/// Quarter tokens: "Q1 2024", "Q1-2024", "2024Q1", "2024 Q2", "FY24Q3" is
/// out of scope. Key is (year, quarter).
fn parse_quarter(s: &str) -> Option<(u16, u8)> {
    let upper = s.to_ascii_uppercase();
    let compact: String = upper.chars().filter(|c| !" -/".contains(*c)).collect();

    if let Some(rest) = compact.strip_prefix('Q') {
        // Q<n><year>
        let quarter = rest.chars().next()?.to_digit(10)? as u8;
        if !(1..=4).contains(&quarter) {
            return None;
        }
        let year = parse_year(&rest[1..])?;
        return Some((year, quarter));
    }
    if compact.len() == 6 && compact.as_bytes()[4] == b'Q' {
        // <year>Q<n>
        let year = parse_year(&compact[..4])?;
        let quarter = compact[5..].parse::<u8>().ok()?;
        if (1..=4).contains(&quarter) {
            return Some((year, quarter));
        }
    }
    None
}
