//! The subject resolver

use crate::config::ResolverConfig;
use crate::strategies::{
    passes_validity_filter, EmbeddingStrategy, ExactMatchStrategy, LearnedAliasStrategy,
    ResolverStrategy, StrategyContext, StrategyOutcome,
};
use concord_domain::traits::SubjectStore;
use concord_domain::{normalize_name, Subject, SubjectId};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during resolution
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Subject store error
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// How a resolution matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    /// Normalized canonical name matched exactly
    ExactCanonical,
    /// An explicit alias matched exactly
    ExactAlias,
    /// A learned alias matched exactly
    LearnedAlias,
    /// Embedding similarity with a clear lead
    Embedding,
    /// Nothing matched; a new subject was created
    NewSubject,
}

/// Outcome of a resolution attempt
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionStatus {
    /// An existing subject matched
    Resolved,
    /// A new subject was created
    Created,
    /// More than one subject is plausible; escalate, never guess
    Ambiguous,
    /// The mention failed input validation and was skipped
    Rejected,
}

/// Result of resolving one raw mention
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The resolved or created subject, when one exists
    pub subject: Option<Subject>,

    /// What happened
    pub status: ResolutionStatus,

    /// Confidence in the link (1.0 exact, 0.95 learned alias, cosine for
    /// embedding matches, 0.0 otherwise)
    pub confidence: f64,

    /// How the link was made, when one was
    pub match_type: Option<MatchType>,

    /// Contending candidates with similarities, best first
    pub near_misses: Vec<(SubjectId, f32)>,
}

/// The subject resolver: an ordered strategy list with a creation fallback
pub struct SubjectResolver {
    config: ResolverConfig,
    strategies: Vec<Box<dyn ResolverStrategy + Send + Sync>>,
}

impl SubjectResolver {
    /// Create a resolver with the given configuration
    pub fn new(config: ResolverConfig) -> Result<Self, ResolverError> {
        config.validate().map_err(ResolverError::Config)?;
        Ok(Self {
            config,
            strategies: vec![
                Box::new(ExactMatchStrategy),
                Box::new(LearnedAliasStrategy),
                Box::new(EmbeddingStrategy),
            ],
        })
    }

    /// Create a resolver with default configuration
    pub fn default_config() -> Self {
        Self::new(ResolverConfig::default()).expect("default config is valid")
    }

    /// Pure resolution against a candidate snapshot
    ///
    /// Runs the strategies in order and stops at the first match or
    /// ambiguity. Does not touch any store; `resolve` wraps this with the
    /// documented side effects.
    pub fn resolve_against(
        &self,
        raw_name: &str,
        candidates: &[Subject],
        query_embedding: Option<&[f32]>,
    ) -> Resolution {
        let normalized = normalize_name(raw_name);
        if normalized.is_empty() {
            return Resolution {
                subject: None,
                status: ResolutionStatus::Rejected,
                confidence: 0.0,
                match_type: None,
                near_misses: Vec::new(),
            };
        }

        let ctx = StrategyContext {
            normalized: &normalized,
            candidates,
            query_embedding,
            config: &self.config,
        };

        let mut sub_threshold: Vec<(SubjectId, f32)> = Vec::new();
        for strategy in &self.strategies {
            match strategy.try_resolve(&ctx) {
                StrategyOutcome::Match {
                    subject_index,
                    confidence,
                    match_type,
                } => {
                    debug!(strategy = strategy.name(), %confidence, "mention resolved");
                    return Resolution {
                        subject: Some(candidates[subject_index].clone()),
                        status: ResolutionStatus::Resolved,
                        confidence,
                        match_type: Some(match_type),
                        near_misses: Vec::new(),
                    };
                }
                StrategyOutcome::Ambiguous { near_misses } => {
                    debug!(strategy = strategy.name(), "mention ambiguous, not linking");
                    return Resolution {
                        subject: None,
                        status: ResolutionStatus::Ambiguous,
                        confidence: 0.0,
                        match_type: None,
                        near_misses,
                    };
                }
                StrategyOutcome::NoMatch { near_misses } => {
                    if sub_threshold.is_empty() {
                        sub_threshold = near_misses;
                    }
                }
            }
        }

        if !passes_validity_filter(&normalized, &self.config) {
            return Resolution {
                subject: None,
                status: ResolutionStatus::Rejected,
                confidence: 0.0,
                match_type: None,
                near_misses: sub_threshold,
            };
        }

        // Creation itself happens in `resolve`, which has the store. The
        // pure path reports what would be created.
        Resolution {
            subject: None,
            status: ResolutionStatus::Created,
            confidence: 1.0,
            match_type: Some(MatchType::NewSubject),
            near_misses: sub_threshold,
        }
    }

    /// Resolve a raw mention against the store, with side effects
    ///
    /// Side effects, by route:
    /// - exact / learned-alias match: nothing written
    /// - embedding match: the mention is learned as an alias of the match
    /// - creation: a new subject is persisted; a near miss at or above the
    ///   suggest floor is recorded as a possible equivalent on the new
    ///   subject, for human review
    /// - ambiguous or rejected: nothing written, no implicit retry
    pub fn resolve<S>(
        &self,
        tenant: &str,
        raw_name: &str,
        store: &mut S,
        query_embedding: Option<&[f32]>,
        now: u64,
    ) -> Result<Resolution, ResolverError>
    where
        S: SubjectStore,
        S::Error: std::fmt::Display,
    {
        let candidates = store
            .list_subjects(tenant)
            .map_err(|e| ResolverError::Store(format!("list subjects: {}", e)))?;

        let mut resolution = self.resolve_against(raw_name, &candidates, query_embedding);

        match resolution.status {
            ResolutionStatus::Resolved => {
                if resolution.match_type == Some(MatchType::Embedding) {
                    if let Some(subject) = resolution.subject.as_mut() {
                        if subject.learn_alias(raw_name) {
                            store
                                .upsert_subject(subject)
                                .map_err(|e| ResolverError::Store(format!("learn alias: {}", e)))?;
                            info!(
                                subject = %subject.id,
                                alias = raw_name,
                                "learned alias from embedding match"
                            );
                        }
                    }
                }
            }
            ResolutionStatus::Created => {
                let mut subject = Subject::new(SubjectId::new(), tenant, raw_name.trim(), now);
                if let Some(embedding) = query_embedding {
                    subject.embedding = Some(embedding.to_vec());
                }
                for (candidate_id, similarity) in &resolution.near_misses {
                    if f64::from(*similarity) >= self.config.suggest_floor {
                        subject.suggest_equivalent(*candidate_id);
                    }
                }
                store
                    .upsert_subject(&subject)
                    .map_err(|e| ResolverError::Store(format!("create subject: {}", e)))?;
                info!(
                    subject = %subject.id,
                    name = raw_name,
                    suggestions = subject.possible_equivalents.len(),
                    "created new subject"
                );
                resolution.subject = Some(subject);
            }
            ResolutionStatus::Ambiguous | ResolutionStatus::Rejected => {}
        }

        Ok(resolution)
    }
}
