//! Latest-candidate selection
//!
//! Given competing document candidates for one context axis, pick the one
//! that is "current" - or refuse to. Every successful result carries a
//! non-empty `why_selected`; that is an output contract, not documentation.
//! When neither document authority nor a certain axis order can justify a
//! pick, the selector abstains with `ask_user_needed` rather than guess.

use crate::policy::{SelectionPolicy, TieBreakStrategy};
use concord_domain::{ApplicabilityAxis, OrderingConfidence};
use tracing::debug;

use crate::policy::DocumentAuthority;

/// One document competing to be "current"
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionCandidate {
    /// Document identifier
    pub id: String,

    /// Declared authority of the document's origin
    pub authority: DocumentAuthority,

    /// Lifecycle status, e.g. "published"
    pub status: Option<String>,

    /// Document type, e.g. "faq" or "contract"
    pub doc_type: Option<String>,

    /// This document's value on the primary axis, when known
    pub axis_value: Option<String>,
}

/// Outcome of a selection
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// The chosen candidate, when one could be justified
    pub selected_id: Option<String>,

    /// Human-readable justification or, on abstention, explanation
    pub why_selected: String,

    /// Whether the axis-order fallback substituted for authority knowledge
    pub fallback_used: bool,

    /// Whether the caller must escalate to a human
    pub ask_user_needed: bool,

    /// Remaining contenders worth showing a human, candidate ids
    pub alternatives: Vec<String>,
}

/// Select the "current" candidate under a declared policy
///
/// Decision ladder:
/// 1. Filter by required status and excluded document types.
/// 2. If the fraction of remaining candidates with known authority reaches
///    the policy threshold: rank by authority; break top-tier ties by the
///    primary axis order, else by the policy's tie-break strategy.
/// 3. Else, if the primary axis has CERTAIN ordering confidence and the
///    policy permits: select the candidate latest in the axis order and
///    declare the fallback in the justification.
/// 4. Else abstain: `ask_user_needed` with an explanation and alternatives.
pub fn select_latest(
    candidates: &[SelectionCandidate],
    axes: &[ApplicabilityAxis],
    policy: &SelectionPolicy,
) -> Selection {
    let remaining: Vec<&SelectionCandidate> = candidates
        .iter()
        .filter(|c| {
            policy
                .required_status
                .as_ref()
                .is_none_or(|required| c.status.as_deref() == Some(required.as_str()))
        })
        .filter(|c| {
            c.doc_type
                .as_ref()
                .is_none_or(|dt| !policy.excluded_doc_types.iter().any(|x| x == dt))
        })
        .collect();

    if remaining.is_empty() {
        return Selection {
            selected_id: None,
            why_selected: format!(
                "no candidates remain after policy filtering ({} given)",
                candidates.len()
            ),
            fallback_used: false,
            ask_user_needed: true,
            alternatives: Vec::new(),
        };
    }

    let axis = axes.iter().find(|a| a.key == policy.primary_axis);

    let known = remaining.iter().filter(|c| c.authority.is_known()).count();
    let known_ratio = known as f64 / remaining.len() as f64;
    debug!(
        known_ratio,
        remaining = remaining.len(),
        "latest selection: authority coverage"
    );

    if known_ratio >= policy.known_ratio_threshold {
        return select_by_authority(&remaining, axis, policy);
    }

    if policy.allow_axis_fallback {
        if let Some(axis) = axis {
            if axis.ordering_confidence == OrderingConfidence::Certain {
                if let Some(selection) = select_by_axis_order(&remaining, axis) {
                    return selection;
                }
            }
        }
    }

    Selection {
        selected_id: None,
        why_selected: format!(
            "only {:.0}% of {} candidates have known document authority \
             (threshold {:.0}%) and axis '{}' offers no certain order; \
             refusing to guess",
            known_ratio * 100.0,
            remaining.len(),
            policy.known_ratio_threshold * 100.0,
            policy.primary_axis
        ),
        fallback_used: false,
        ask_user_needed: true,
        alternatives: alternative_ids(&remaining),
    }
}

fn select_by_authority(
    remaining: &[&SelectionCandidate],
    axis: Option<&ApplicabilityAxis>,
    policy: &SelectionPolicy,
) -> Selection {
    let top_rank = remaining
        .iter()
        .map(|c| c.authority.rank())
        .max()
        .unwrap_or(0);
    let top_tier: Vec<&&SelectionCandidate> = remaining
        .iter()
        .filter(|c| c.authority.rank() == top_rank)
        .collect();

    if top_tier.len() == 1 {
        let chosen = top_tier[0];
        return Selection {
            selected_id: Some(chosen.id.clone()),
            why_selected: format!(
                "highest document authority ({}) among {} candidates",
                chosen.authority.as_str(),
                remaining.len()
            ),
            fallback_used: false,
            ask_user_needed: false,
            alternatives: Vec::new(),
        };
    }

    // Tie among the top authority tier: the primary axis order ranks them
    // when it can.
    if let Some(axis) = axis {
        let mut ranked: Vec<(usize, &&&SelectionCandidate)> = Vec::new();
        for c in &top_tier {
            if let Some(pos) = c.axis_value.as_deref().and_then(|v| axis.position(v)) {
                ranked.push((pos, c));
            }
        }
        if let Some((pos, chosen)) = ranked
            .iter()
            .max_by(|(pa, ca), (pb, cb)| pa.cmp(pb).then_with(|| cb.id.cmp(&ca.id)))
        {
            let value = axis
                .value_order
                .as_ref()
                .map(|order| order[*pos].clone())
                .unwrap_or_default();
            return Selection {
                selected_id: Some(chosen.id.clone()),
                why_selected: format!(
                    "authority tie ({}) broken by axis '{}': value '{}' is latest in its order",
                    chosen.authority.as_str(),
                    axis.key,
                    value
                ),
                fallback_used: false,
                ask_user_needed: false,
                alternatives: Vec::new(),
            };
        }
    }

    let mut tied_ids: Vec<String> = top_tier.iter().map(|c| c.id.clone()).collect();
    tied_ids.sort();

    match policy.tie_break {
        TieBreakStrategy::Arbitrary => {
            let chosen = tied_ids[0].clone();
            Selection {
                selected_id: Some(chosen),
                why_selected: format!(
                    "{} candidates tied at authority rank {}; policy allows an \
                     arbitrary deterministic pick (smallest id)",
                    tied_ids.len(),
                    top_rank
                ),
                fallback_used: false,
                ask_user_needed: false,
                alternatives: tied_ids[1..].to_vec(),
            }
        }
        TieBreakStrategy::ReturnAll => Selection {
            selected_id: None,
            why_selected: format!(
                "{} candidates tied at authority rank {}; policy returns all of them",
                tied_ids.len(),
                top_rank
            ),
            fallback_used: false,
            ask_user_needed: false,
            alternatives: tied_ids,
        },
        TieBreakStrategy::AskUser => Selection {
            selected_id: None,
            why_selected: format!(
                "{} candidates tied at authority rank {}; policy escalates ties",
                tied_ids.len(),
                top_rank
            ),
            fallback_used: false,
            ask_user_needed: true,
            alternatives: tied_ids,
        },
    }
}

fn select_by_axis_order(
    remaining: &[&SelectionCandidate],
    axis: &ApplicabilityAxis,
) -> Option<Selection> {
    let mut best: Option<(usize, &&SelectionCandidate)> = None;
    for c in remaining {
        if let Some(pos) = c.axis_value.as_deref().and_then(|v| axis.position(v)) {
            let better = match best {
                None => true,
                Some((best_pos, best_c)) => {
                    pos > best_pos || (pos == best_pos && c.id < best_c.id)
                }
            };
            if better {
                best = Some((pos, c));
            }
        }
    }

    let (pos, chosen) = best?;
    let value = axis.value_order.as_ref().map(|order| order[pos].clone())?;
    Some(Selection {
        selected_id: Some(chosen.id.clone()),
        why_selected: format!(
            "document authority is mostly unknown; declared fallback to axis \
             '{}' (ordering confidence {}): value '{}' is latest in its order",
            axis.key,
            axis.ordering_confidence.as_str(),
            value
        ),
        fallback_used: true,
        ask_user_needed: false,
        alternatives: Vec::new(),
    })
}

fn alternative_ids(remaining: &[&SelectionCandidate]) -> Vec<String> {
    let mut ids: Vec<String> = remaining.iter().map(|c| c.id.clone()).collect();
    ids.sort();
    ids.truncate(5);
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_domain::ApplicabilityAxis;
    use concord_domain::OrderingConfidence;

    fn candidate(id: &str, authority: DocumentAuthority, axis_value: Option<&str>) -> SelectionCandidate {
        SelectionCandidate {
            id: id.to_string(),
            authority,
            status: Some("published".to_string()),
            doc_type: Some("manual".to_string()),
            axis_value: axis_value.map(|s| s.to_string()),
        }
    }

    fn release_axis(confidence: OrderingConfidence, order: &[&str]) -> ApplicabilityAxis {
        let mut axis = ApplicabilityAxis::new("t1", "release", 0);
        for v in order {
            axis.observe(v);
        }
        axis.is_orderable = !order.is_empty();
        axis.ordering_confidence = confidence;
        if !order.is_empty() {
            axis.value_order = Some(order.iter().map(|s| s.to_string()).collect());
        }
        axis
    }

    #[test]
    fn test_authority_wins_when_known() {
        let candidates = vec![
            candidate("doc-a", DocumentAuthority::Community, None),
            candidate("doc-b", DocumentAuthority::Official, None),
        ];

        let selection = select_latest(&candidates, &[], &SelectionPolicy::default());

        assert_eq!(selection.selected_id.as_deref(), Some("doc-b"));
        assert!(!selection.ask_user_needed);
        assert!(!selection.fallback_used);
        assert!(selection.why_selected.contains("official"));
    }

    #[test]
    fn test_authority_tie_broken_by_axis_order() {
        let candidates = vec![
            candidate("doc-a", DocumentAuthority::Official, Some("2.0")),
            candidate("doc-b", DocumentAuthority::Official, Some("3.0")),
        ];
        let axis = release_axis(OrderingConfidence::Certain, &["2.0", "3.0"]);

        let selection = select_latest(&candidates, &[axis], &SelectionPolicy::default());

        assert_eq!(selection.selected_id.as_deref(), Some("doc-b"));
        assert!(selection.why_selected.contains("release"));
        assert!(!selection.fallback_used);
    }

    #[test]
    fn test_axis_fallback_is_declared() {
        let candidates = vec![
            candidate("doc-a", DocumentAuthority::Unknown, Some("2.0")),
            candidate("doc-b", DocumentAuthority::Unknown, Some("3.0")),
        ];
        let axis = release_axis(OrderingConfidence::Certain, &["2.0", "3.0"]);

        let selection = select_latest(&candidates, &[axis], &SelectionPolicy::default());

        assert_eq!(selection.selected_id.as_deref(), Some("doc-b"));
        assert!(selection.fallback_used);
        assert!(selection.why_selected.contains("release"));
        assert!(selection.why_selected.contains("certain"));
    }

    #[test]
    fn test_never_guesses_without_authority_or_certain_axis() {
        // No-single-candidate rule: even one candidate is not selected when
        // nothing can justify it.
        let candidates = vec![candidate("doc-a", DocumentAuthority::Unknown, Some("beta"))];
        let axis = release_axis(OrderingConfidence::Unknown, &[]);

        let selection = select_latest(&candidates, &[axis], &SelectionPolicy::default());

        assert_eq!(selection.selected_id, None);
        assert!(selection.ask_user_needed);
        assert!(!selection.why_selected.is_empty());
        assert_eq!(selection.alternatives, vec!["doc-a".to_string()]);
    }

    #[test]
    fn test_fallback_disabled_by_policy() {
        let candidates = vec![
            candidate("doc-a", DocumentAuthority::Unknown, Some("2.0")),
            candidate("doc-b", DocumentAuthority::Unknown, Some("3.0")),
        ];
        let axis = release_axis(OrderingConfidence::Certain, &["2.0", "3.0"]);
        let policy = SelectionPolicy {
            allow_axis_fallback: false,
            ..Default::default()
        };

        let selection = select_latest(&candidates, &[axis], &policy);

        assert!(selection.ask_user_needed);
        assert_eq!(selection.selected_id, None);
    }

    #[test]
    fn test_status_and_doc_type_filtering() {
        let mut draft = candidate("doc-a", DocumentAuthority::Official, None);
        draft.status = Some("draft".to_string());
        let mut faq = candidate("doc-b", DocumentAuthority::Official, None);
        faq.doc_type = Some("faq".to_string());
        let good = candidate("doc-c", DocumentAuthority::Verified, None);

        let policy = SelectionPolicy {
            required_status: Some("published".to_string()),
            excluded_doc_types: vec!["faq".to_string()],
            ..Default::default()
        };

        let selection = select_latest(&[draft, faq, good], &[], &policy);

        assert_eq!(selection.selected_id.as_deref(), Some("doc-c"));
    }

    #[test]
    fn test_tie_break_strategies() {
        let candidates = vec![
            candidate("doc-b", DocumentAuthority::Official, None),
            candidate("doc-a", DocumentAuthority::Official, None),
        ];

        let arbitrary = select_latest(&candidates, &[], &SelectionPolicy::default());
        assert_eq!(arbitrary.selected_id.as_deref(), Some("doc-a"), "smallest id");
        assert_eq!(arbitrary.alternatives, vec!["doc-b".to_string()]);

        let policy = SelectionPolicy {
            tie_break: TieBreakStrategy::ReturnAll,
            ..Default::default()
        };
        let all = select_latest(&candidates, &[], &policy);
        assert_eq!(all.selected_id, None);
        assert!(!all.ask_user_needed);
        assert_eq!(all.alternatives.len(), 2);

        let policy = SelectionPolicy {
            tie_break: TieBreakStrategy::AskUser,
            ..Default::default()
        };
        let ask = select_latest(&candidates, &[], &policy);
        assert!(ask.ask_user_needed);
        assert_eq!(ask.selected_id, None);
    }

    #[test]
    fn test_empty_after_filtering_abstains() {
        let policy = SelectionPolicy {
            required_status: Some("published".to_string()),
            ..Default::default()
        };
        let mut c = candidate("doc-a", DocumentAuthority::Official, None);
        c.status = None;

        let selection = select_latest(&[c], &[], &policy);

        assert!(selection.ask_user_needed);
        assert_eq!(selection.selected_id, None);
        assert!(!selection.why_selected.is_empty());
    }
}
