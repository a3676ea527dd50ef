//! Two-stage claim clustering

use crate::config::ClusterConfig;
use crate::modality::{classify_modality, is_negated};
use crate::similarity::{content_words, jaccard_similarity};
use crate::union_find::UnionFind;
use concord_embed::cosine_similarity;
use concord_domain::{ClaimCluster, ClaimId, ClusterId, RawClaim};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Result of one clustering pass
#[derive(Debug, Clone)]
pub struct ClusterOutcome {
    /// Clusters with at least two members
    pub clusters: Vec<ClaimCluster>,

    /// Members dropped by size trimming; they stay unclustered and may seed
    /// other clusters on a later pass
    pub trimmed: Vec<ClaimId>,

    /// Whether any pair was compared through embeddings (false means the
    /// whole pass ran on the lexical fallback)
    pub embeddings_used: bool,
}

/// The claim clusterer
///
/// Stage 1 proposes candidate pairs by similarity: cosine over claim-text
/// embeddings when both sides have one, content-word Jaccard otherwise.
/// Stage 2 keeps a pair only if every strict check holds; accepted pairs are
/// merged with union-find and components of two or more claims become
/// clusters. False negatives are acceptable here, false positives are not.
pub struct ClaimClusterer {
    config: ClusterConfig,
}

impl ClaimClusterer {
    /// Create a clusterer with the given configuration
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Create a clusterer with default configuration
    pub fn default_config() -> Self {
        Self::new(ClusterConfig::default())
    }

    /// Cluster a batch of raw claims
    ///
    /// `embeddings` maps claim ids to claim-text vectors; it may be empty or
    /// partial, in which case the affected pairs fall back to lexical
    /// similarity. The batch is a snapshot; nothing here mutates shared
    /// state.
    pub fn cluster(
        &self,
        claims: &[RawClaim],
        embeddings: &HashMap<ClaimId, Vec<f32>>,
        now: u64,
    ) -> ClusterOutcome {
        // Sort by id so pair iteration, union order, and output are
        // deterministic for a given snapshot.
        let mut batch: Vec<&RawClaim> = claims.iter().collect();
        batch.sort_by_key(|c| c.id);

        let words: Vec<HashSet<String>> =
            batch.iter().map(|c| content_words(&c.evidence)).collect();
        let modalities: Vec<_> = batch
            .iter()
            .map(|c| classify_modality(&c.evidence))
            .collect();
        let negated: Vec<bool> = batch.iter().map(|c| is_negated(&c.evidence)).collect();

        let mut uf = UnionFind::new(batch.len());
        let mut embeddings_used = false;
        let mut accepted_pairs = 0usize;

        for i in 0..batch.len() {
            for j in (i + 1)..batch.len() {
                if !self.stage1_candidate(
                    batch[i],
                    batch[j],
                    &words[i],
                    &words[j],
                    embeddings,
                    &mut embeddings_used,
                ) {
                    continue;
                }
                if !self.stage2_validate(
                    batch[i],
                    batch[j],
                    &words[i],
                    &words[j],
                    modalities[i] == modalities[j],
                    negated[i] == negated[j],
                ) {
                    continue;
                }
                uf.union(i, j);
                accepted_pairs += 1;
            }
        }

        let mut clusters = Vec::new();
        let mut trimmed = Vec::new();

        for component in uf.components() {
            if component.len() < 2 {
                continue;
            }
            let (kept, dropped) = self.trim_component(&component, &batch, embeddings);
            trimmed.extend(dropped.iter().map(|&idx| batch[idx].id));
            if kept.len() < 2 {
                // Trimming a pathological component below two members leaves
                // nothing to cluster.
                trimmed.extend(kept.iter().map(|&idx| batch[idx].id));
                continue;
            }
            clusters.push(self.build_cluster(&kept, &batch, now));
        }

        debug!(
            claims = batch.len(),
            accepted_pairs,
            clusters = clusters.len(),
            trimmed = trimmed.len(),
            embeddings_used,
            "clustering pass complete"
        );

        ClusterOutcome {
            clusters,
            trimmed,
            embeddings_used,
        }
    }

    /// Stage 1: similarity-based candidate generation
    fn stage1_candidate(
        &self,
        a: &RawClaim,
        b: &RawClaim,
        words_a: &HashSet<String>,
        words_b: &HashSet<String>,
        embeddings: &HashMap<ClaimId, Vec<f32>>,
        embeddings_used: &mut bool,
    ) -> bool {
        if let (Some(va), Some(vb)) = (embeddings.get(&a.id), embeddings.get(&b.id)) {
            if va.len() == vb.len() {
                *embeddings_used = true;
                return f64::from(cosine_similarity(va, vb)) >= self.config.cosine_threshold;
            }
        }
        jaccard_similarity(words_a, words_b) >= self.config.jaccard_threshold
    }

    /// Stage 2: strict validation; every check must hold
    fn stage2_validate(
        &self,
        a: &RawClaim,
        b: &RawClaim,
        words_a: &HashSet<String>,
        words_b: &HashSet<String>,
        modality_matches: bool,
        negation_matches: bool,
    ) -> bool {
        // Resolved entity sets, when both present, must intersect
        if !a.entities.is_empty() && !b.entities.is_empty() {
            let set_a: HashSet<_> = a.entities.iter().collect();
            if !b.entities.iter().any(|e| set_a.contains(e)) {
                return false;
            }
        }

        if !modality_matches || !negation_matches {
            return false;
        }

        // Lexical overlap re-checked for every pair, including those that
        // arrived via embeddings
        jaccard_similarity(words_a, words_b) >= self.config.jaccard_threshold
    }

    /// Trim an oversized component, keeping members nearest the embedding
    /// centroid, or the highest-confidence members when vectors are missing.
    /// Returns (kept, dropped) index lists.
    fn trim_component(
        &self,
        component: &[usize],
        batch: &[&RawClaim],
        embeddings: &HashMap<ClaimId, Vec<f32>>,
    ) -> (Vec<usize>, Vec<usize>) {
        if component.len() <= self.config.max_cluster_size {
            return (component.to_vec(), Vec::new());
        }

        let vectors: Vec<Option<&Vec<f32>>> = component
            .iter()
            .map(|&idx| embeddings.get(&batch[idx].id))
            .collect();
        let all_embedded = vectors.iter().all(|v| v.is_some())
            && vectors
                .iter()
                .flatten()
                .map(|v| v.len())
                .collect::<HashSet<_>>()
                .len()
                == 1;

        let mut ordered: Vec<usize> = component.to_vec();
        if all_embedded {
            let dim = vectors[0].map(|v| v.len()).unwrap_or(0);
            let mut centroid = vec![0.0f32; dim];
            for v in vectors.iter().flatten() {
                for (c, x) in centroid.iter_mut().zip(v.iter()) {
                    *c += x;
                }
            }
            let n = component.len() as f32;
            for c in &mut centroid {
                *c /= n;
            }
            let similarity_to_centroid: HashMap<usize, f32> = component
                .iter()
                .filter_map(|&idx| {
                    embeddings
                        .get(&batch[idx].id)
                        .map(|v| (idx, cosine_similarity(v, &centroid)))
                })
                .collect();
            ordered.sort_by(|&ia, &ib| {
                let sim_a = similarity_to_centroid.get(&ia).copied().unwrap_or(-1.0);
                let sim_b = similarity_to_centroid.get(&ib).copied().unwrap_or(-1.0);
                sim_b
                    .partial_cmp(&sim_a)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| batch[ia].id.cmp(&batch[ib].id))
            });
        } else {
            // Confidence then identifier, for determinism
            ordered.sort_by(|&ia, &ib| {
                batch[ib]
                    .confidence
                    .partial_cmp(&batch[ia].confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| batch[ia].id.cmp(&batch[ib].id))
            });
        }

        let dropped = ordered.split_off(self.config.max_cluster_size);
        (ordered, dropped)
    }

    fn build_cluster(&self, kept: &[usize], batch: &[&RawClaim], now: u64) -> ClaimCluster {
        let mut member_ids: Vec<ClaimId> = kept.iter().map(|&idx| batch[idx].id).collect();
        member_ids.sort();

        // Representative label: text of the highest-confidence member
        let label_claim = kept
            .iter()
            .map(|&idx| batch[idx])
            .max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.id.cmp(&a.id))
            })
            .expect("component has members");

        let mut document_ids: Vec<String> = kept
            .iter()
            .map(|&idx| batch[idx].document_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        document_ids.sort();

        let aggregate_confidence = kept
            .iter()
            .map(|&idx| batch[idx].confidence)
            .sum::<f64>()
            / kept.len() as f64;

        ClaimCluster {
            id: ClusterId::new(),
            tenant: label_claim.tenant.clone(),
            member_ids,
            label: label_claim.evidence.clone(),
            document_ids,
            aggregate_confidence,
            created_at: now,
        }
    }
}
