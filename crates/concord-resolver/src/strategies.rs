//! The ordered resolution strategies
//!
//! Each strategy inspects the same context and answers match / ambiguous /
//! no-match. The resolver runs them in a fixed order and stops at the first
//! answer that is not a no-match, which makes every stage unit-testable in
//! isolation.

use crate::config::ResolverConfig;
use crate::resolver::MatchType;
use concord_domain::{Subject, SubjectId};
use concord_embed::cosine_similarity;

/// Shared input for one resolution attempt
pub struct StrategyContext<'a> {
    /// The normalized raw mention
    pub normalized: &'a str,

    /// Existing subjects for the tenant
    pub candidates: &'a [Subject],

    /// Embedding of the raw mention, when the capability was available
    pub query_embedding: Option<&'a [f32]>,

    /// Resolver thresholds
    pub config: &'a ResolverConfig,
}

/// One strategy's verdict
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyOutcome {
    /// A unique candidate matched
    Match {
        /// Index into the candidate slice
        subject_index: usize,
        /// Confidence of the match
        confidence: f64,
        /// How the match was made
        match_type: MatchType,
    },
    /// More than one candidate is plausible; do not link
    Ambiguous {
        /// The contenders, best first, with their similarities
        near_misses: Vec<(SubjectId, f32)>,
    },
    /// This strategy has nothing to say
    NoMatch {
        /// Best sub-threshold similarities observed, for suggestion use
        near_misses: Vec<(SubjectId, f32)>,
    },
}

impl StrategyOutcome {
    fn no_match() -> Self {
        StrategyOutcome::NoMatch {
            near_misses: Vec::new(),
        }
    }
}

/// A single stage in the resolution ladder
pub trait ResolverStrategy {
    /// Strategy name for logging
    fn name(&self) -> &'static str;

    /// Attempt resolution against the context
    fn try_resolve(&self, ctx: &StrategyContext<'_>) -> StrategyOutcome;
}

/// Stage 1: exact normalized match against canonical names and explicit
/// aliases. Confidence 1.0.
pub struct ExactMatchStrategy;

impl ResolverStrategy for ExactMatchStrategy {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn try_resolve(&self, ctx: &StrategyContext<'_>) -> StrategyOutcome {
        for (index, subject) in ctx.candidates.iter().enumerate() {
            if concord_domain::normalize_name(&subject.canonical_name) == ctx.normalized {
                return StrategyOutcome::Match {
                    subject_index: index,
                    confidence: 1.0,
                    match_type: MatchType::ExactCanonical,
                };
            }
            if subject
                .aliases
                .iter()
                .any(|a| concord_domain::normalize_name(a) == ctx.normalized)
            {
                return StrategyOutcome::Match {
                    subject_index: index,
                    confidence: 1.0,
                    match_type: MatchType::ExactAlias,
                };
            }
        }
        StrategyOutcome::no_match()
    }
}

/// Stage 2: exact normalized match against learned aliases. Confidence 0.95.
pub struct LearnedAliasStrategy;

impl ResolverStrategy for LearnedAliasStrategy {
    fn name(&self) -> &'static str {
        "learned_alias"
    }

    fn try_resolve(&self, ctx: &StrategyContext<'_>) -> StrategyOutcome {
        for (index, subject) in ctx.candidates.iter().enumerate() {
            if subject.matches_learned(ctx.normalized) {
                return StrategyOutcome::Match {
                    subject_index: index,
                    confidence: 0.95,
                    match_type: MatchType::LearnedAlias,
                };
            }
        }
        StrategyOutcome::no_match()
    }
}

/// Stage 3: embedding similarity against every candidate with a vector
///
/// A match requires the top candidate to clear the similarity threshold
/// *and* to lead the runner-up by the ambiguity delta. A close race is
/// ambiguous even when the raw score is high - that is the point.
pub struct EmbeddingStrategy;

impl ResolverStrategy for EmbeddingStrategy {
    fn name(&self) -> &'static str {
        "embedding"
    }

    fn try_resolve(&self, ctx: &StrategyContext<'_>) -> StrategyOutcome {
        let Some(query) = ctx.query_embedding else {
            return StrategyOutcome::no_match();
        };

        let mut scored: Vec<(usize, f32)> = ctx
            .candidates
            .iter()
            .enumerate()
            .filter_map(|(index, subject)| {
                let embedding = subject.embedding.as_deref()?;
                if embedding.len() != query.len() {
                    return None;
                }
                Some((index, cosine_similarity(embedding, query)))
            })
            .collect();

        if scored.is_empty() {
            return StrategyOutcome::no_match();
        }

        scored.sort_by(|(ia, sa), (ib, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ia.cmp(ib))
        });

        let near_misses: Vec<(SubjectId, f32)> = scored
            .iter()
            .take(3)
            .map(|&(index, similarity)| (ctx.candidates[index].id, similarity))
            .collect();

        let (best_index, best) = scored[0];
        if f64::from(best) < ctx.config.similarity_threshold {
            return StrategyOutcome::NoMatch { near_misses };
        }

        if let Some(&(_, second)) = scored.get(1) {
            if f64::from(best - second) < ctx.config.ambiguity_delta {
                return StrategyOutcome::Ambiguous { near_misses };
            }
        }

        StrategyOutcome::Match {
            subject_index: best_index,
            confidence: f64::from(best),
            match_type: MatchType::Embedding,
        }
    }
}

/// Validity filter for stage 4 (creation)
///
/// A creatable name must meet the minimum normalized length, stay within the
/// word limit, and not be a bare generic term.
pub fn passes_validity_filter(normalized: &str, config: &ResolverConfig) -> bool {
    if normalized.len() < config.min_name_chars {
        return false;
    }
    let words = normalized.split_whitespace().count();
    if words == 0 || words > config.max_name_words {
        return false;
    }
    !config.generic_terms.iter().any(|t| t == normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_domain::normalize_name;

    fn subjects(names: &[&str]) -> Vec<Subject> {
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Subject::new(SubjectId::from_value(i as u128 + 1), "t1", *name, 0))
            .collect()
    }

    #[test]
    fn test_exact_strategy_matches_canonical() {
        let candidates = subjects(&["Acme Corporation", "Globex"]);
        let normalized = normalize_name("acme corporation");
        let ctx = StrategyContext {
            normalized: &normalized,
            candidates: &candidates,
            query_embedding: None,
            config: &ResolverConfig::default(),
        };

        match ExactMatchStrategy.try_resolve(&ctx) {
            StrategyOutcome::Match {
                subject_index,
                confidence,
                match_type,
            } => {
                assert_eq!(subject_index, 0);
                assert_eq!(confidence, 1.0);
                assert_eq!(match_type, MatchType::ExactCanonical);
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_strategy_matches_explicit_alias() {
        let mut candidates = subjects(&["Acme Corporation"]);
        candidates[0].aliases.push("Acme".to_string());
        let normalized = normalize_name("ACME");
        let ctx = StrategyContext {
            normalized: &normalized,
            candidates: &candidates,
            query_embedding: None,
            config: &ResolverConfig::default(),
        };

        assert!(matches!(
            ExactMatchStrategy.try_resolve(&ctx),
            StrategyOutcome::Match {
                match_type: MatchType::ExactAlias,
                ..
            }
        ));
    }

    #[test]
    fn test_learned_alias_strategy() {
        let mut candidates = subjects(&["Acme Corporation"]);
        candidates[0].learned_aliases.push("acme co".to_string());
        let normalized = normalize_name("Acme Co");
        let ctx = StrategyContext {
            normalized: &normalized,
            candidates: &candidates,
            query_embedding: None,
            config: &ResolverConfig::default(),
        };

        match LearnedAliasStrategy.try_resolve(&ctx) {
            StrategyOutcome::Match { confidence, .. } => assert_eq!(confidence, 0.95),
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_embedding_strategy_accepts_clear_winner() {
        let mut candidates = subjects(&["Acme Corporation", "Globex"]);
        candidates[0].embedding = Some(vec![1.0, 0.0]);
        candidates[1].embedding = Some(vec![0.0, 1.0]);
        let query = vec![0.98, 0.199];
        let ctx = StrategyContext {
            normalized: "acme corp intl",
            candidates: &candidates,
            query_embedding: Some(&query),
            config: &ResolverConfig::default(),
        };

        match EmbeddingStrategy.try_resolve(&ctx) {
            StrategyOutcome::Match {
                subject_index,
                match_type,
                confidence,
            } => {
                assert_eq!(subject_index, 0);
                assert_eq!(match_type, MatchType::Embedding);
                assert!(confidence > 0.85);
            }
            other => panic!("expected match, got {:?}", other),
        }
    }

    #[test]
    fn test_embedding_strategy_close_race_is_ambiguous() {
        // Top 0.86, runner-up 0.83: delta 0.03 < 0.06, so no auto-link even
        // though the raw score clears the threshold.
        let mut candidates = subjects(&["SAP S/4HANA Cloud, Public Edition", "SAP S/4HANA Cloud"]);
        candidates[0].embedding = Some(vec![0.86, (1.0f32 - 0.86 * 0.86).sqrt()]);
        candidates[1].embedding = Some(vec![0.83, (1.0f32 - 0.83 * 0.83).sqrt()]);
        let query = vec![1.0, 0.0];
        let ctx = StrategyContext {
            normalized: "s 4 cloud public",
            candidates: &candidates,
            query_embedding: Some(&query),
            config: &ResolverConfig::default(),
        };

        match EmbeddingStrategy.try_resolve(&ctx) {
            StrategyOutcome::Ambiguous { near_misses } => {
                assert_eq!(near_misses.len(), 2);
                assert_eq!(near_misses[0].0, candidates[0].id);
                assert!(near_misses[0].1 > near_misses[1].1);
            }
            other => panic!("expected ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_embedding_strategy_below_threshold_is_no_match() {
        let mut candidates = subjects(&["Acme"]);
        candidates[0].embedding = Some(vec![0.5, (1.0f32 - 0.25).sqrt()]);
        let query = vec![1.0, 0.0];
        let ctx = StrategyContext {
            normalized: "unrelated name",
            candidates: &candidates,
            query_embedding: Some(&query),
            config: &ResolverConfig::default(),
        };

        match EmbeddingStrategy.try_resolve(&ctx) {
            StrategyOutcome::NoMatch { near_misses } => {
                assert_eq!(near_misses.len(), 1, "near misses still reported");
            }
            other => panic!("expected no match, got {:?}", other),
        }
    }

    #[test]
    fn test_embedding_strategy_without_query_embedding() {
        let candidates = subjects(&["Acme"]);
        let ctx = StrategyContext {
            normalized: "acme",
            candidates: &candidates,
            query_embedding: None,
            config: &ResolverConfig::default(),
        };

        assert_eq!(
            EmbeddingStrategy.try_resolve(&ctx),
            StrategyOutcome::NoMatch {
                near_misses: vec![]
            }
        );
    }

    #[test]
    fn test_validity_filter() {
        let config = ResolverConfig::default();
        assert!(passes_validity_filter("acme corporation", &config));
        assert!(!passes_validity_filter("ab", &config), "too short");
        assert!(!passes_validity_filter("system", &config), "generic term");
        assert!(!passes_validity_filter("", &config));

        let long_name = vec!["word"; 13].join(" ");
        assert!(!passes_validity_filter(&long_name, &config), "too many words");
    }
}
