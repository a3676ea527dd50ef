//! The claim consolidator

use crate::config::ConsolidatorConfig;
use concord_domain::{
    CanonicalClaim, Maturity, RawClaim, ScopeKey, SourceRef, SubjectId, ValueKind,
};
use concord_temporal::infer_order;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// The consolidator: a pure projection from raw claims to canonical claims
///
/// Groups by (subject, kind, scope), picks the majority value as the
/// representative (recency breaks ties), and classifies maturity in order:
/// context-dependent, conflicting, superseded, validated, candidate. Output
/// ordering and every tie-break are deterministic, so consolidation over an
/// unchanged snapshot is byte-identical.
pub struct Consolidator {
    config: ConsolidatorConfig,
}

type GroupKey = (SubjectId, String, ScopeKey);

impl Consolidator {
    /// Create a consolidator with the given configuration
    pub fn new(config: ConsolidatorConfig) -> Self {
        Self { config }
    }

    /// Create a consolidator with default configuration
    pub fn default_config() -> Self {
        Self::new(ConsolidatorConfig::default())
    }

    /// Consolidate a snapshot of raw claims
    pub fn consolidate(&self, claims: &[RawClaim]) -> Vec<CanonicalClaim> {
        let mut groups: BTreeMap<GroupKey, Vec<&RawClaim>> = BTreeMap::new();
        for claim in claims {
            groups
                .entry((claim.subject_id, claim.kind.clone(), claim.scope.clone()))
                .or_default()
                .push(claim);
        }

        let mut canonical = Vec::with_capacity(groups.len());
        for ((subject_id, kind, scope), mut members) in groups {
            members.sort_by_key(|c| c.id);
            canonical.push(self.consolidate_group(subject_id, kind, scope, &members));
        }

        debug!(
            claims = claims.len(),
            groups = canonical.len(),
            "consolidation pass complete"
        );
        canonical
    }

    fn consolidate_group(
        &self,
        subject_id: SubjectId,
        kind: String,
        scope: ScopeKey,
        members: &[&RawClaim],
    ) -> CanonicalClaim {
        let documents: HashSet<&str> = members.iter().map(|c| c.document_id.as_str()).collect();
        let document_count = documents.len();
        let assertion_count = members.len();

        let (maturity, representative) = self.classify(members, document_count);

        let conflicting_ids = if maturity == Maturity::Conflicting {
            let mut ids: Vec<_> = members.iter().map(|c| c.id).collect();
            ids.sort();
            ids
        } else {
            Vec::new()
        };

        // Cited sources: highest-confidence first, id as the deterministic
        // tie-break, bounded by the citation limit.
        let mut by_confidence: Vec<&&RawClaim> = members.iter().collect();
        by_confidence.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        let sources: Vec<SourceRef> = by_confidence
            .iter()
            .take(self.config.max_cited_sources)
            .map(|c| SourceRef {
                claim_id: c.id,
                document_id: c.document_id.clone(),
                segment_id: c.segment_id.clone(),
            })
            .collect();

        CanonicalClaim {
            tenant: members[0].tenant.clone(),
            subject_id,
            kind,
            scope,
            value: representative.value.clone(),
            raw_value: representative.raw_value.clone(),
            document_count,
            assertion_count,
            maturity,
            conflicting_ids,
            sources,
        }
    }

    /// Classify maturity and choose the representative claim
    fn classify<'a>(
        &self,
        members: &[&'a RawClaim],
        document_count: usize,
    ) -> (Maturity, &'a RawClaim) {
        let majority = self.majority_claim(members);

        let conditional = members.iter().filter(|c| c.conditional).count();
        if conditional as f64 / members.len() as f64 > self.config.conditional_threshold {
            return (Maturity::ContextDependent, majority);
        }

        // One raw spelling per distinct normalized payload
        let mut distinct: Vec<(&str, String)> = Vec::new();
        for c in members {
            let form = c.value.normalized();
            if !distinct.iter().any(|(_, f)| *f == form) {
                distinct.push((c.raw_value.as_str(), form));
            }
        }

        if distinct.len() > 1 {
            if members.iter().all(|c| c.value.kind() == ValueKind::Scalar) {
                if self.scalars_conflict(members) {
                    return (Maturity::Conflicting, majority);
                }
                // Distinct but within tolerance: the values agree
            } else if members.iter().all(|c| c.value.kind() == ValueKind::Version) {
                // A version family with a certain total order is a
                // progression, not a disagreement: the newest value wins and
                // the older assertions are superseded.
                let raw_values: Vec<String> =
                    distinct.iter().map(|(raw, _)| raw.to_string()).collect();
                let inference = infer_order(&raw_values);
                if inference.is_orderable {
                    let latest = inference
                        .inferred_order
                        .last()
                        .map(|s| s.as_str())
                        .unwrap_or_default();
                    let newest = members
                        .iter()
                        .rev()
                        .find(|c| c.raw_value.trim() == latest)
                        .copied()
                        .unwrap_or(members[members.len() - 1]);
                    return (Maturity::Superseded, newest);
                }
                return (Maturity::Conflicting, majority);
            } else {
                return (Maturity::Conflicting, majority);
            }
        }

        if document_count >= 2 {
            (Maturity::Validated, majority)
        } else {
            (Maturity::Candidate, majority)
        }
    }

    /// Any pair of scalars differing by more than the tolerated fraction of
    /// the larger magnitude conflicts.
    fn scalars_conflict(&self, members: &[&RawClaim]) -> bool {
        let values: Vec<f64> = members
            .iter()
            .filter_map(|c| c.value.as_numeric())
            .collect();
        for (i, &a) in values.iter().enumerate() {
            for &b in &values[i + 1..] {
                let larger = a.abs().max(b.abs());
                if larger == 0.0 {
                    continue;
                }
                if (a - b).abs() > self.config.numeric_tolerance * larger {
                    return true;
                }
            }
        }
        false
    }

    /// Majority normalized value; ties go to the most recent assertion
    /// (creation time, then id).
    fn majority_claim<'a>(&self, members: &[&'a RawClaim]) -> &'a RawClaim {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for c in members {
            *counts.entry(c.value.normalized()).or_insert(0) += 1;
        }

        members
            .iter()
            .max_by(|a, b| {
                let count_a = counts.get(&a.value.normalized()).copied().unwrap_or(0);
                let count_b = counts.get(&b.value.normalized()).copied().unwrap_or(0);
                count_a
                    .cmp(&count_b)
                    .then_with(|| a.created_at.cmp(&b.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            })
            .copied()
            .unwrap_or(members[0])
    }
}
