//! Core engine implementation

use crate::cache::ContextCache;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::locks::KeyLocks;
use concord_cluster::{ClaimClusterer, ClusterOutcome};
use concord_consolidate::Consolidator;
use concord_domain::traits::{AppendOutcome, ClaimStore, GraphStore, SubjectStore};
use concord_domain::{
    normalize_name, ApplicabilityAxis, CanonicalClaim, ClaimId, RawClaim, ScopeKey, SubjectId,
    Value, ValueKind,
};
use concord_embed::Embedder;
use concord_resolver::{Resolution, ResolutionStatus, SubjectResolver};
use concord_store::VectorIndex;
use concord_temporal::{
    infer_order, merge_axis, select_latest, OrderInference, Selection, SelectionCandidate,
    SelectionPolicy,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Current timestamp in seconds since the Unix epoch
fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// One extracted claim arriving from the ingestion pipeline
#[derive(Debug, Clone)]
pub struct ClaimInput {
    /// Raw subject mention
    pub subject_name: String,

    /// Claim kind, e.g. "sla_uptime"
    pub kind: String,

    /// The payload as the document stated it
    pub raw_value: String,

    /// Extractor-declared payload kind, when it has one
    pub value_kind: Option<ValueKind>,

    /// Contextual qualifiers narrowing where the claim applies
    pub qualifiers: Vec<(String, String)>,

    /// Verbatim evidence quote
    pub evidence: String,

    /// Source segment within the document
    pub segment_id: Option<String>,

    /// Whether the document stated the claim conditionally
    pub conditional: bool,

    /// Raw mentions of other entities involved in the claim
    pub entity_names: Vec<String>,

    /// Extractor confidence in [0, 1]
    pub confidence: f64,
}

/// One document's worth of extracted content
#[derive(Debug, Clone)]
pub struct DocumentBatch {
    /// Owning tenant
    pub tenant: String,

    /// Source document identifier
    pub document_id: String,

    /// Document-level axis observations, e.g. ("release", "3.0")
    pub axis_values: Vec<(String, String)>,

    /// Extracted claims
    pub claims: Vec<ClaimInput>,
}

/// A claim that was skipped during ingestion
#[derive(Debug, Clone)]
pub struct IngestFailure {
    /// Why it was skipped
    pub reason: String,

    /// The subject mention or evidence it belonged to
    pub raw_text: String,
}

/// What one document's ingestion did
#[derive(Debug, Clone)]
pub struct IngestReport {
    /// Owning tenant
    pub tenant: String,

    /// Source document
    pub document_id: String,

    /// Claims newly appended
    pub claims_appended: usize,

    /// Claims already present (content fingerprint match)
    pub duplicates: usize,

    /// Claims skipped, with reasons
    pub rejected: Vec<IngestFailure>,

    /// Subjects created for first-seen mentions
    pub subjects_created: usize,

    /// Mentions left unresolved because resolution was ambiguous
    pub ambiguous_mentions: usize,

    /// Axes whose state changed
    pub axes_updated: usize,
}

/// The engine: orchestration over a combined store and an optional embedder
pub struct Engine<S>
where
    S: SubjectStore + ClaimStore + GraphStore,
{
    store: Arc<Mutex<S>>,
    embedder: Option<Arc<dyn Embedder>>,
    resolver: SubjectResolver,
    clusterer: ClaimClusterer,
    consolidator: Consolidator,
    config: EngineConfig,
    subject_locks: KeyLocks,
    axis_locks: KeyLocks,
    cache: Mutex<ContextCache>,
    // Per-tenant subject index, rebuilt from the store when it falls behind.
    // The (index, indexed_count) pair detects staleness cheaply.
    subject_indexes: Mutex<HashMap<String, (Arc<VectorIndex>, usize)>>,
}

impl<S> Engine<S>
where
    S: SubjectStore + ClaimStore + GraphStore,
    <S as SubjectStore>::Error: std::fmt::Display,
    <S as ClaimStore>::Error: std::fmt::Display,
    <S as GraphStore>::Error: std::fmt::Display,
{
    /// Create an engine over a store, with an optional embedding provider
    pub fn new(
        store: S,
        embedder: Option<Arc<dyn Embedder>>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Config)?;
        let resolver = SubjectResolver::new(config.resolver.clone())
            .map_err(|e| EngineError::Config(e.to_string()))?;
        let clusterer = ClaimClusterer::new(config.cluster.clone());
        let consolidator = Consolidator::new(config.consolidator.clone());
        let cache = Mutex::new(ContextCache::new(config.cache_capacity));

        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            embedder,
            resolver,
            clusterer,
            consolidator,
            config,
            subject_locks: KeyLocks::new(),
            axis_locks: KeyLocks::new(),
            cache,
            subject_indexes: Mutex::new(HashMap::new()),
        })
    }

    /// The engine's configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Embed a text, or fall back to nothing
    ///
    /// Timeout, transport failure, and an absent provider all land in the
    /// same place: no vector, lexical path, a warning in the log. Never an
    /// error.
    async fn embed_or_none(&self, text: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match timeout(self.config.embed_timeout(), embedder.embed(text)).await {
            Ok(Ok(vector)) => Some(vector),
            Ok(Err(e)) => {
                warn!(error = %e, "embedding unavailable, using lexical path");
                None
            }
            Err(_) => {
                warn!(
                    timeout_secs = self.config.embed_timeout_secs,
                    "embedding call timed out, using lexical path"
                );
                None
            }
        }
    }

    /// Ingest one document's extracted content
    ///
    /// Axis observations run first, then claims. Individual invalid claims
    /// are skipped and reported, not fatal; the only hard failure is a
    /// malformed batch (missing tenant or document id).
    pub async fn ingest_document(&self, batch: DocumentBatch) -> Result<IngestReport, EngineError> {
        if batch.tenant.trim().is_empty() || batch.document_id.trim().is_empty() {
            return Err(EngineError::InvalidInput {
                tenant: batch.tenant.clone(),
                document: batch.document_id.clone(),
                detail: "tenant and document_id are required".to_string(),
            });
        }

        info!(
            tenant = %batch.tenant,
            document = %batch.document_id,
            claims = batch.claims.len(),
            axis_values = batch.axis_values.len(),
            "ingesting document"
        );

        let mut report = IngestReport {
            tenant: batch.tenant.clone(),
            document_id: batch.document_id.clone(),
            claims_appended: 0,
            duplicates: 0,
            rejected: Vec::new(),
            subjects_created: 0,
            ambiguous_mentions: 0,
            axes_updated: 0,
        };

        for (axis_key, value) in &batch.axis_values {
            if self.observe_axis_value(&batch.tenant, axis_key, value).await?.is_some() {
                report.axes_updated += 1;
            }
        }

        for claim_input in &batch.claims {
            self.ingest_claim(&batch.tenant, &batch.document_id, claim_input, &mut report)
                .await?;
        }

        info!(
            tenant = %batch.tenant,
            document = %batch.document_id,
            appended = report.claims_appended,
            duplicates = report.duplicates,
            rejected = report.rejected.len(),
            ambiguous = report.ambiguous_mentions,
            "document ingested"
        );
        Ok(report)
    }

    async fn ingest_claim(
        &self,
        tenant: &str,
        document_id: &str,
        input: &ClaimInput,
        report: &mut IngestReport,
    ) -> Result<(), EngineError> {
        if input.kind.trim().is_empty() || input.evidence.trim().is_empty() {
            report.rejected.push(IngestFailure {
                reason: "claim kind and evidence are required".to_string(),
                raw_text: input.subject_name.clone(),
            });
            return Ok(());
        }
        if !(0.0..=1.0).contains(&input.confidence) {
            report.rejected.push(IngestFailure {
                reason: format!("confidence {} out of range [0.0, 1.0]", input.confidence),
                raw_text: input.subject_name.clone(),
            });
            return Ok(());
        }

        let subject_id = match self
            .resolve_mention(tenant, document_id, &input.subject_name, report)
            .await?
        {
            Some(id) => id,
            None => return Ok(()), // counted inside resolve_mention
        };

        let mut entities: Vec<SubjectId> = Vec::new();
        for entity_name in &input.entity_names {
            // Entity resolution is best-effort; an unresolvable entity just
            // weakens cluster validation for this claim.
            if let Some(id) = self
                .resolve_mention_quietly(tenant, document_id, entity_name)
                .await?
            {
                if !entities.contains(&id) {
                    entities.push(id);
                }
            }
        }

        let value = match input.value_kind {
            Some(kind) => Value::parse_as(&input.raw_value, kind),
            None => Value::parse(&input.raw_value),
        };

        let claim = RawClaim {
            id: ClaimId::new(),
            tenant: tenant.to_string(),
            subject_id,
            kind: input.kind.trim().to_string(),
            raw_value: input.raw_value.clone(),
            value,
            scope: ScopeKey::from_qualifiers(&input.qualifiers),
            evidence: input.evidence.clone(),
            document_id: document_id.to_string(),
            segment_id: input.segment_id.clone(),
            conditional: input.conditional,
            entities,
            confidence: input.confidence,
            created_at: current_timestamp(),
        };

        if let Err(detail) = claim.validate() {
            report.rejected.push(IngestFailure {
                reason: detail,
                raw_text: input.subject_name.clone(),
            });
            return Ok(());
        }

        let mut store = self.store.lock().await;
        match store
            .append_claim(&claim)
            .map_err(|e| EngineError::Store(e.to_string()))?
        {
            AppendOutcome::Inserted => report.claims_appended += 1,
            AppendOutcome::AlreadyPresent => report.duplicates += 1,
        }
        Ok(())
    }

    /// Resolve a mention for ingestion, updating report counters
    async fn resolve_mention(
        &self,
        tenant: &str,
        document_id: &str,
        raw_name: &str,
        report: &mut IngestReport,
    ) -> Result<Option<SubjectId>, EngineError> {
        let resolution = self
            .resolve_subject_inner(tenant, document_id, raw_name)
            .await?;
        match resolution.status {
            ResolutionStatus::Resolved => Ok(resolution.subject.map(|s| s.id)),
            ResolutionStatus::Created => {
                report.subjects_created += 1;
                Ok(resolution.subject.map(|s| s.id))
            }
            ResolutionStatus::Ambiguous => {
                report.ambiguous_mentions += 1;
                report.rejected.push(IngestFailure {
                    reason: format!(
                        "subject mention is ambiguous between {} candidates",
                        resolution.near_misses.len()
                    ),
                    raw_text: raw_name.to_string(),
                });
                Ok(None)
            }
            ResolutionStatus::Rejected => {
                report.rejected.push(IngestFailure {
                    reason: "subject mention failed validity checks".to_string(),
                    raw_text: raw_name.to_string(),
                });
                Ok(None)
            }
        }
    }

    /// Resolve an entity mention without touching report counters
    async fn resolve_mention_quietly(
        &self,
        tenant: &str,
        document_id: &str,
        raw_name: &str,
    ) -> Result<Option<SubjectId>, EngineError> {
        let resolution = self
            .resolve_subject_inner(tenant, document_id, raw_name)
            .await?;
        if resolution.subject.is_none() {
            debug!(mention = raw_name, "entity mention left unresolved");
        }
        Ok(resolution.subject.map(|s| s.id))
    }

    async fn resolve_subject_inner(
        &self,
        tenant: &str,
        document_id: &str,
        raw_name: &str,
    ) -> Result<Resolution, EngineError> {
        let normalized = normalize_name(raw_name);

        // Document-context cache first: repeated mentions in one document
        // resolve once.
        if !normalized.is_empty() {
            let cache = self.cache.lock().await;
            if let Some(subject_id) = cache.get(tenant, document_id, &normalized) {
                drop(cache);
                let store = self.store.lock().await;
                if let Some(subject) = store
                    .get_subject(subject_id)
                    .map_err(|e| EngineError::Store(e.to_string()))?
                {
                    return Ok(Resolution {
                        subject: Some(subject),
                        status: ResolutionStatus::Resolved,
                        confidence: 1.0,
                        match_type: None,
                        near_misses: Vec::new(),
                    });
                }
            }
        }

        let query_embedding = self.embed_or_none(raw_name).await;

        // All writes to one subject name serialize here; parallel documents
        // first-mentioning the same name cannot race a double-create.
        let lock_key = format!("{}/{}", tenant, normalized);
        let handle = self.subject_locks.handle(&lock_key);
        let _guard = handle.lock().await;

        let mut store = self.store.lock().await;
        let resolution = self
            .resolver
            .resolve(
                tenant,
                raw_name,
                &mut *store,
                query_embedding.as_deref(),
                current_timestamp(),
            )
            .map_err(|e| EngineError::Resolver(e.to_string()))?;
        drop(store);

        if let Some(subject) = &resolution.subject {
            let mut cache = self.cache.lock().await;
            cache.insert(tenant, document_id, &normalized, subject.id);
        }

        Ok(resolution)
    }

    /// Resolve a raw subject mention (public query-path entry point)
    pub async fn resolve_subject(
        &self,
        tenant: &str,
        raw_name: &str,
    ) -> Result<Resolution, EngineError> {
        let query_embedding = self.embed_or_none(raw_name).await;
        let normalized = normalize_name(raw_name);
        let handle = self.subject_locks.handle(&format!("{}/{}", tenant, normalized));
        let _guard = handle.lock().await;

        let mut store = self.store.lock().await;
        self.resolver
            .resolve(
                tenant,
                raw_name,
                &mut *store,
                query_embedding.as_deref(),
                current_timestamp(),
            )
            .map_err(|e| EngineError::Resolver(e.to_string()))
    }

    /// Observe one axis value, running inference and the merge rule
    ///
    /// Returns the merged axis when the observation changed anything, None
    /// when the value was already known. All updates to one axis serialize
    /// on its key.
    pub async fn observe_axis_value(
        &self,
        tenant: &str,
        axis_key: &str,
        value: &str,
    ) -> Result<Option<ApplicabilityAxis>, EngineError> {
        let handle = self.axis_locks.handle(&format!("{}/{}", tenant, axis_key));
        let _guard = handle.lock().await;

        let mut store = self.store.lock().await;
        let mut axis = store
            .get_axis(tenant, axis_key)
            .map_err(|e| EngineError::Store(e.to_string()))?
            .unwrap_or_else(|| ApplicabilityAxis::new(tenant, axis_key, current_timestamp()));

        if !axis.observe(value) {
            return Ok(None);
        }

        if axis.known_values.len() >= 2 {
            let inference = infer_order(&axis.known_values);
            axis = merge_axis(&axis, &inference, current_timestamp());
            debug!(
                tenant,
                axis = axis_key,
                value,
                orderable = axis.is_orderable,
                confidence = axis.ordering_confidence.as_str(),
                "axis updated"
            );
        } else {
            axis.updated_at = current_timestamp();
        }

        store
            .upsert_axis(&axis)
            .map_err(|e| EngineError::Store(e.to_string()))?;
        Ok(Some(axis))
    }

    /// Pure order inference over a value family
    pub fn infer_axis_order(&self, values: &[String]) -> OrderInference {
        infer_order(values)
    }

    /// Find subjects most similar to a raw name, for equivalence review
    ///
    /// Supports the human side of the no-silent-merge contract: an operator
    /// reviewing possible-equivalent suggestions can pull the nearest
    /// neighbors of any mention. Served from a per-tenant HNSW index over
    /// subject embeddings, rebuilt from the store when subjects were added
    /// since the last build. Returns an empty list when the embedding
    /// capability is unavailable.
    pub async fn similar_subjects(
        &self,
        tenant: &str,
        raw_name: &str,
        limit: usize,
    ) -> Result<Vec<(SubjectId, f32)>, EngineError> {
        let Some(query) = self.embed_or_none(raw_name).await else {
            return Ok(Vec::new());
        };

        let subjects = {
            let store = self.store.lock().await;
            store
                .list_subjects(tenant)
                .map_err(|e| EngineError::Store(e.to_string()))?
        };
        let embedded: Vec<(SubjectId, Vec<f32>)> = subjects
            .into_iter()
            .filter_map(|s| s.embedding.map(|e| (s.id, e)))
            .filter(|(_, e)| e.len() == query.len())
            .collect();
        if embedded.is_empty() {
            return Ok(Vec::new());
        }

        let index = {
            let mut indexes = self.subject_indexes.lock().await;
            match indexes.get(tenant) {
                Some((index, count)) if *count == embedded.len() => index.clone(),
                _ => {
                    let index = Arc::new(VectorIndex::new(query.len()));
                    for (id, embedding) in &embedded {
                        index
                            .add(*id, embedding)
                            .map_err(|e| EngineError::Store(e.to_string()))?;
                    }
                    indexes.insert(tenant.to_string(), (index.clone(), embedded.len()));
                    index
                }
            }
        };

        index
            .search(&query, limit, 64)
            .map_err(|e| EngineError::Store(e.to_string()))
    }

    /// Read one axis's current state
    pub async fn get_axis(
        &self,
        tenant: &str,
        axis_key: &str,
    ) -> Result<Option<ApplicabilityAxis>, EngineError> {
        let store = self.store.lock().await;
        store
            .get_axis(tenant, axis_key)
            .map_err(|e| EngineError::Store(e.to_string()))
    }

    /// Read a tenant's stored canonical claims, in group-key order
    pub async fn canonical_claims(&self, tenant: &str) -> Result<Vec<CanonicalClaim>, EngineError> {
        let store = self.store.lock().await;
        store
            .list_canonical(tenant)
            .map_err(|e| EngineError::Store(e.to_string()))
    }

    /// Cluster a tenant's raw claims on a snapshot
    ///
    /// Claim-text embeddings are fetched with a timeout; any that fail leave
    /// their pairs on the lexical path. Resulting clusters are upserted.
    pub async fn cluster_claims(&self, tenant: &str) -> Result<ClusterOutcome, EngineError> {
        let snapshot = {
            let store = self.store.lock().await;
            store
                .claims_for_tenant(tenant)
                .map_err(|e| EngineError::Store(e.to_string()))?
        };

        let mut embeddings: HashMap<ClaimId, Vec<f32>> = HashMap::new();
        if self.embedder.is_some() {
            for claim in &snapshot {
                if let Some(vector) = self.embed_or_none(&claim.evidence).await {
                    embeddings.insert(claim.id, vector);
                }
            }
        }

        let outcome = self
            .clusterer
            .cluster(&snapshot, &embeddings, current_timestamp());

        let mut store = self.store.lock().await;
        for cluster in &outcome.clusters {
            store
                .upsert_cluster(cluster)
                .map_err(|e| EngineError::Store(e.to_string()))?;
        }
        Ok(outcome)
    }

    /// Consolidate a tenant's raw claims on a snapshot
    ///
    /// A pure projection: running it again over unchanged claims produces
    /// identical canonical rows, upserted by group key.
    pub async fn consolidate_claims(
        &self,
        tenant: &str,
    ) -> Result<Vec<CanonicalClaim>, EngineError> {
        let snapshot = {
            let store = self.store.lock().await;
            store
                .claims_for_tenant(tenant)
                .map_err(|e| EngineError::Store(e.to_string()))?
        };

        let canonical = self.consolidator.consolidate(&snapshot);

        let mut store = self.store.lock().await;
        for row in &canonical {
            store
                .upsert_canonical(row)
                .map_err(|e| EngineError::Store(e.to_string()))?;
        }
        Ok(canonical)
    }

    /// Select the "current" candidate under a policy, against stored axes
    pub async fn select_latest(
        &self,
        tenant: &str,
        candidates: &[SelectionCandidate],
        policy: &SelectionPolicy,
    ) -> Result<Selection, EngineError> {
        let axes = {
            let store = self.store.lock().await;
            store
                .list_axes(tenant)
                .map_err(|e| EngineError::Store(e.to_string()))?
        };
        Ok(select_latest(candidates, &axes, policy))
    }
}
