//! The axis merge rule
//!
//! Axis state is never assigned in place by callers; every update goes
//! through `merge_axis`, a pure function with a documented monotonicity law.
//! The engine calls it under the per-axis lock.

use crate::order::OrderInference;
use concord_domain::ApplicabilityAxis;

/// Merge a fresh inference into existing axis state
///
/// Laws, holding for every `existing` and `inference`:
///
/// - **Monotone confidence**: the merged `ordering_confidence` is the
///   higher-ranked of (existing, inferred) on CERTAIN > INFERRED > UNKNOWN.
///   A later, less-informative observation never downgrades the axis.
/// - **No erasure**: a `value_order` of length >= 2 is only replaced by
///   another of length >= 2; an inconclusive inference leaves the existing
///   order untouched.
///
/// `known_values` are carried over unchanged; observation happens before
/// inference via [`ApplicabilityAxis::observe`].
pub fn merge_axis(
    existing: &ApplicabilityAxis,
    inference: &OrderInference,
    now: u64,
) -> ApplicabilityAxis {
    let mut merged = existing.clone();
    merged.updated_at = now;

    merged.ordering_confidence = existing.ordering_confidence.max(inference.confidence);

    let replacement_ok = inference.is_orderable && inference.inferred_order.len() >= 2;
    if replacement_ok {
        merged.value_order = Some(inference.inferred_order.clone());
        merged.is_orderable = true;
    }
    // Not orderable, or a degenerate order: keep what we had.

    merged
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::order::infer_order;
    use proptest::prelude::*;

    fn arb_value() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u32..40).prop_map(|n| format!("{}.0", n)),
            (0u32..40).prop_map(|n| format!("{}", n)),
            "[a-z]{3,6}".prop_map(|s| s),
            (1000u16..2999).prop_map(|y| format!("{}", y)),
        ]
    }

    proptest! {
        /// Property: for any interleaving of value insertions, the final
        /// confidence is >= the confidence at every prefix.
        #[test]
        fn test_confidence_monotone_over_insertions(
            values in proptest::collection::vec(arb_value(), 1..12)
        ) {
            let mut axis = ApplicabilityAxis::new("t", "axis", 0);
            let mut last = axis.ordering_confidence;

            for (i, value) in values.iter().enumerate() {
                let new = axis.observe(value);
                if new && axis.known_values.len() >= 2 {
                    let inference = infer_order(&axis.known_values);
                    axis = merge_axis(&axis, &inference, i as u64);
                }
                prop_assert!(axis.ordering_confidence >= last,
                    "confidence downgraded at step {}", i);
                last = axis.ordering_confidence;
            }
        }

        /// Property: an established value_order is never replaced by one
        /// shorter than 2 and never cleared.
        #[test]
        fn test_order_never_erased(
            values in proptest::collection::vec(arb_value(), 1..12)
        ) {
            let mut axis = ApplicabilityAxis::new("t", "axis", 0);
            let mut had_order = false;

            for (i, value) in values.iter().enumerate() {
                if axis.observe(value) && axis.known_values.len() >= 2 {
                    axis = merge_axis(&axis, &infer_order(&axis.known_values), i as u64);
                }
                if let Some(order) = &axis.value_order {
                    prop_assert!(order.len() >= 2);
                    had_order = true;
                } else {
                    prop_assert!(!had_order, "value_order was cleared");
                }
            }
        }
    }
}
