//! Concord Storage Layer
//!
//! Implements the `SubjectStore`, `ClaimStore`, and `GraphStore` traits over
//! SQLite, plus an in-memory HNSW index for subject embedding search.
//!
//! # Architecture
//!
//! - SQLite for structured state (subjects, raw claims, derived artifacts)
//! - Raw claims are append-only, deduplicated by content fingerprint
//! - Derived artifacts (clusters, canonical claims, axes) use upsert-merge
//!   writes keyed by stable identifiers
//! - HNSW for subject candidate search, rebuildable from SQLite
//!
//! # Examples
//!
//! ```no_run
//! use concord_store::SqliteStore;
//!
//! let store = SqliteStore::new(":memory:").unwrap();
//! // Store is now ready for subject/claim operations
//! ```

#![warn(missing_docs)]

pub mod vector_index;

use concord_domain::traits::{AppendOutcome, ClaimStore, GraphStore, SubjectStore};
use concord_domain::{
    ApplicabilityAxis, CanonicalClaim, ClaimCluster, ClaimId, Maturity, OrderingConfidence,
    RawClaim, ScopeKey, SourceRef, Subject, SubjectId, Value, ValueKind,
};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

pub use vector_index::VectorIndex;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// JSON (de)serialization error for a stored column
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// SQLite-based implementation of the Concord store traits
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each worker should have its own
/// `SqliteStore` instance, or the instance should live behind a mutex.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }

    fn id_to_bytes(value: u128) -> Vec<u8> {
        value.to_be_bytes().to_vec()
    }

    fn bytes_to_id(bytes: &[u8]) -> Result<u128, StoreError> {
        if bytes.len() != 16 {
            return Err(StoreError::InvalidData(format!(
                "Expected 16 bytes for id, got {}",
                bytes.len()
            )));
        }
        let mut arr = [0u8; 16];
        arr.copy_from_slice(bytes);
        Ok(u128::from_be_bytes(arr))
    }

    fn ids_to_json<I: Iterator<Item = u128>>(ids: I) -> Result<String, StoreError> {
        let strings: Vec<String> = ids.map(uuid_format).collect();
        Ok(serde_json::to_string(&strings)?)
    }

    fn json_to_ids(json: &str) -> Result<Vec<u128>, StoreError> {
        let strings: Vec<String> = serde_json::from_str(json)?;
        strings
            .iter()
            .map(|s| {
                uuid_parse(s).ok_or_else(|| StoreError::InvalidData(format!("Invalid id: {}", s)))
            })
            .collect()
    }

    fn row_to_subject(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subject> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_id(&id_bytes).map_err(invalid_blob(0))?;
        let aliases: String = row.get(3)?;
        let learned: String = row.get(4)?;
        let embedding: Option<String> = row.get(5)?;
        let equivalents: String = row.get(6)?;

        let aliases: Vec<String> = serde_json::from_str(&aliases).map_err(invalid_json(3))?;
        let learned: Vec<String> = serde_json::from_str(&learned).map_err(invalid_json(4))?;
        let embedding: Option<Vec<f32>> = match embedding {
            Some(json) => Some(serde_json::from_str(&json).map_err(invalid_json(5))?),
            None => None,
        };
        let equivalents = Self::json_to_ids(&equivalents)
            .map_err(invalid_blob(6))?
            .into_iter()
            .map(SubjectId::from_value)
            .collect();

        Ok(Subject {
            id: SubjectId::from_value(id),
            tenant: row.get(1)?,
            canonical_name: row.get(2)?,
            aliases,
            learned_aliases: learned,
            embedding,
            possible_equivalents: equivalents,
            created_at: row.get::<_, i64>(7)? as u64,
        })
    }

    fn row_to_claim(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawClaim> {
        let id_bytes: Vec<u8> = row.get(0)?;
        let id = Self::bytes_to_id(&id_bytes).map_err(invalid_blob(0))?;
        let subject_bytes: Vec<u8> = row.get(2)?;
        let subject_id = Self::bytes_to_id(&subject_bytes).map_err(invalid_blob(2))?;

        let raw_value: String = row.get(4)?;
        let value_kind: String = row.get(5)?;
        let kind = ValueKind::parse(&value_kind).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                Box::new(StoreError::InvalidData(format!(
                    "Unknown value kind: {}",
                    value_kind
                ))),
            )
        })?;

        let entities: String = row.get(11)?;
        let entities = Self::json_to_ids(&entities)
            .map_err(invalid_blob(11))?
            .into_iter()
            .map(SubjectId::from_value)
            .collect();

        Ok(RawClaim {
            id: ClaimId::from_value(id),
            tenant: row.get(1)?,
            subject_id: SubjectId::from_value(subject_id),
            kind: row.get(3)?,
            value: Value::parse_as(&raw_value, kind),
            raw_value,
            scope: ScopeKey::from_raw(row.get::<_, String>(6)?),
            evidence: row.get(7)?,
            document_id: row.get(8)?,
            segment_id: row.get(9)?,
            conditional: row.get::<_, i64>(10)? != 0,
            entities,
            confidence: row.get(12)?,
            created_at: row.get::<_, i64>(13)? as u64,
        })
    }

    fn row_to_axis(row: &rusqlite::Row<'_>) -> rusqlite::Result<ApplicabilityAxis> {
        let known: String = row.get(2)?;
        let known: Vec<String> = serde_json::from_str(&known).map_err(invalid_json(2))?;
        let confidence: String = row.get(4)?;
        let confidence = OrderingConfidence::parse(&confidence).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                Box::new(StoreError::InvalidData(format!(
                    "Unknown ordering confidence: {}",
                    confidence
                ))),
            )
        })?;
        let value_order: Option<String> = row.get(5)?;
        let value_order: Option<Vec<String>> = match value_order {
            Some(json) => Some(serde_json::from_str(&json).map_err(invalid_json(5))?),
            None => None,
        };

        Ok(ApplicabilityAxis {
            tenant: row.get(0)?,
            key: row.get(1)?,
            known_values: known,
            is_orderable: row.get::<_, i64>(3)? != 0,
            ordering_confidence: confidence,
            value_order,
            updated_at: row.get::<_, i64>(6)? as u64,
        })
    }
}

fn invalid_blob(
    column: usize,
) -> impl Fn(StoreError) -> rusqlite::Error {
    move |e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Blob,
            Box::new(e),
        )
    }
}

fn invalid_json(
    column: usize,
) -> impl Fn(serde_json::Error) -> rusqlite::Error {
    move |e| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    }
}

fn uuid_parse(s: &str) -> Option<u128> {
    let hex: String = s.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 {
        return None;
    }
    u128::from_str_radix(&hex, 16).ok()
}

fn uuid_format(value: u128) -> String {
    let hex = format!("{:032x}", value);
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

impl SubjectStore for SqliteStore {
    type Error = StoreError;

    fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, Self::Error> {
        let subject = self
            .conn
            .query_row(
                "SELECT id, tenant, canonical_name, aliases, learned_aliases, embedding,
                        possible_equivalents, created_at
                 FROM subjects WHERE id = ?1",
                params![Self::id_to_bytes(id.value())],
                Self::row_to_subject,
            )
            .optional()?;
        Ok(subject)
    }

    fn find_by_name(&self, tenant: &str, normalized: &str) -> Result<Option<Subject>, Self::Error> {
        // Exact matching happens on normalized forms, which are not stored;
        // scan the tenant and compare in memory. The vector index, not this
        // path, carries the scale concern.
        Ok(self
            .list_subjects(tenant)?
            .into_iter()
            .find(|s| s.matches_exact(normalized) || s.matches_learned(normalized)))
    }

    fn list_subjects(&self, tenant: &str) -> Result<Vec<Subject>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tenant, canonical_name, aliases, learned_aliases, embedding,
                    possible_equivalents, created_at
             FROM subjects WHERE tenant = ?1 ORDER BY id",
        )?;
        let subjects = stmt
            .query_map(params![tenant], Self::row_to_subject)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(subjects)
    }

    fn upsert_subject(&mut self, subject: &Subject) -> Result<(), Self::Error> {
        let aliases = serde_json::to_string(&subject.aliases)?;
        let learned = serde_json::to_string(&subject.learned_aliases)?;
        let embedding = subject
            .embedding
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let equivalents =
            Self::ids_to_json(subject.possible_equivalents.iter().map(|id| id.value()))?;

        self.conn.execute(
            "INSERT INTO subjects (id, tenant, canonical_name, aliases, learned_aliases,
                                   embedding, possible_equivalents, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
                 canonical_name = excluded.canonical_name,
                 aliases = excluded.aliases,
                 learned_aliases = excluded.learned_aliases,
                 embedding = excluded.embedding,
                 possible_equivalents = excluded.possible_equivalents",
            params![
                Self::id_to_bytes(subject.id.value()),
                subject.tenant,
                subject.canonical_name,
                aliases,
                learned,
                embedding,
                equivalents,
                subject.created_at as i64,
            ],
        )?;
        Ok(())
    }
}

impl ClaimStore for SqliteStore {
    type Error = StoreError;

    fn append_claim(&mut self, claim: &RawClaim) -> Result<AppendOutcome, Self::Error> {
        let fingerprint = claim.fingerprint();

        let exists: bool = self
            .conn
            .query_row(
                "SELECT 1 FROM claims WHERE fingerprint = ?1",
                params![fingerprint],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if exists {
            return Ok(AppendOutcome::AlreadyPresent);
        }

        let entities = Self::ids_to_json(claim.entities.iter().map(|id| id.value()))?;

        self.conn.execute(
            "INSERT INTO claims (id, fingerprint, tenant, subject_id, kind, raw_value,
                                 value_kind, scope, evidence, document_id, segment_id,
                                 conditional, entities, confidence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                Self::id_to_bytes(claim.id.value()),
                fingerprint,
                claim.tenant,
                Self::id_to_bytes(claim.subject_id.value()),
                claim.kind,
                claim.raw_value,
                claim.value.kind().as_str(),
                claim.scope.as_str(),
                claim.evidence,
                claim.document_id,
                claim.segment_id,
                claim.conditional as i64,
                entities,
                claim.confidence,
                claim.created_at as i64,
            ],
        )?;
        Ok(AppendOutcome::Inserted)
    }

    fn claims_for_tenant(&self, tenant: &str) -> Result<Vec<RawClaim>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tenant, subject_id, kind, raw_value, value_kind, scope, evidence,
                    document_id, segment_id, conditional, entities, confidence, created_at
             FROM claims WHERE tenant = ?1 ORDER BY id",
        )?;
        let claims = stmt
            .query_map(params![tenant], Self::row_to_claim)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(claims)
    }

    fn claims_for_group(
        &self,
        tenant: &str,
        subject_id: SubjectId,
        kind: &str,
        scope: &ScopeKey,
    ) -> Result<Vec<RawClaim>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tenant, subject_id, kind, raw_value, value_kind, scope, evidence,
                    document_id, segment_id, conditional, entities, confidence, created_at
             FROM claims
             WHERE tenant = ?1 AND subject_id = ?2 AND kind = ?3 AND scope = ?4
             ORDER BY id",
        )?;
        let claims = stmt
            .query_map(
                params![
                    tenant,
                    Self::id_to_bytes(subject_id.value()),
                    kind,
                    scope.as_str()
                ],
                Self::row_to_claim,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(claims)
    }
}

impl GraphStore for SqliteStore {
    type Error = StoreError;

    fn upsert_cluster(&mut self, cluster: &ClaimCluster) -> Result<(), Self::Error> {
        let member_ids = Self::ids_to_json(cluster.member_ids.iter().map(|id| id.value()))?;
        let document_ids = serde_json::to_string(&cluster.document_ids)?;

        self.conn.execute(
            "INSERT INTO clusters (id, tenant, member_ids, label, document_ids,
                                   aggregate_confidence, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 member_ids = excluded.member_ids,
                 label = excluded.label,
                 document_ids = excluded.document_ids,
                 aggregate_confidence = excluded.aggregate_confidence,
                 created_at = excluded.created_at",
            params![
                Self::id_to_bytes(cluster.id.value()),
                cluster.tenant,
                member_ids,
                cluster.label,
                document_ids,
                cluster.aggregate_confidence,
                cluster.created_at as i64,
            ],
        )?;
        Ok(())
    }

    fn upsert_canonical(&mut self, canonical: &CanonicalClaim) -> Result<(), Self::Error> {
        let conflicting =
            Self::ids_to_json(canonical.conflicting_ids.iter().map(|id| id.value()))?;
        let sources: Vec<serde_json::Value> = canonical
            .sources
            .iter()
            .map(|s| {
                serde_json::json!({
                    "claim_id": s.claim_id.to_string(),
                    "document_id": s.document_id,
                    "segment_id": s.segment_id,
                })
            })
            .collect();
        let sources = serde_json::to_string(&sources)?;

        self.conn.execute(
            "INSERT INTO canonical_claims (group_key, tenant, subject_id, kind, scope,
                                           value_kind, raw_value, document_count,
                                           assertion_count, maturity, conflicting_ids, sources)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(group_key) DO UPDATE SET
                 value_kind = excluded.value_kind,
                 raw_value = excluded.raw_value,
                 document_count = excluded.document_count,
                 assertion_count = excluded.assertion_count,
                 maturity = excluded.maturity,
                 conflicting_ids = excluded.conflicting_ids,
                 sources = excluded.sources",
            params![
                canonical.group_key(),
                canonical.tenant,
                Self::id_to_bytes(canonical.subject_id.value()),
                canonical.kind,
                canonical.scope.as_str(),
                canonical.value.kind().as_str(),
                canonical.raw_value,
                canonical.document_count as i64,
                canonical.assertion_count as i64,
                canonical.maturity.as_str(),
                conflicting,
                sources,
            ],
        )?;
        Ok(())
    }

    fn upsert_axis(&mut self, axis: &ApplicabilityAxis) -> Result<(), Self::Error> {
        let known = serde_json::to_string(&axis.known_values)?;
        let order = axis
            .value_order
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO axes (tenant, key, known_values, is_orderable,
                               ordering_confidence, value_order, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(tenant, key) DO UPDATE SET
                 known_values = excluded.known_values,
                 is_orderable = excluded.is_orderable,
                 ordering_confidence = excluded.ordering_confidence,
                 value_order = excluded.value_order,
                 updated_at = excluded.updated_at",
            params![
                axis.tenant,
                axis.key,
                known,
                axis.is_orderable as i64,
                axis.ordering_confidence.as_str(),
                order,
                axis.updated_at as i64,
            ],
        )?;
        Ok(())
    }

    fn get_axis(&self, tenant: &str, key: &str) -> Result<Option<ApplicabilityAxis>, Self::Error> {
        let axis = self
            .conn
            .query_row(
                "SELECT tenant, key, known_values, is_orderable, ordering_confidence,
                        value_order, updated_at
                 FROM axes WHERE tenant = ?1 AND key = ?2",
                params![tenant, key],
                Self::row_to_axis,
            )
            .optional()?;
        Ok(axis)
    }

    fn list_axes(&self, tenant: &str) -> Result<Vec<ApplicabilityAxis>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT tenant, key, known_values, is_orderable, ordering_confidence,
                    value_order, updated_at
             FROM axes WHERE tenant = ?1 ORDER BY key",
        )?;
        let axes = stmt
            .query_map(params![tenant], Self::row_to_axis)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(axes)
    }

    fn list_canonical(&self, tenant: &str) -> Result<Vec<CanonicalClaim>, Self::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT group_key, tenant, subject_id, kind, scope, value_kind, raw_value,
                    document_count, assertion_count, maturity, conflicting_ids, sources
             FROM canonical_claims WHERE tenant = ?1 ORDER BY group_key",
        )?;
        let rows = stmt
            .query_map(params![tenant], |row| {
                let subject_bytes: Vec<u8> = row.get(2)?;
                let subject_id = Self::bytes_to_id(&subject_bytes).map_err(invalid_blob(2))?;
                let value_kind: String = row.get(5)?;
                let kind = ValueKind::parse(&value_kind).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        5,
                        rusqlite::types::Type::Text,
                        Box::new(StoreError::InvalidData(format!(
                            "Unknown value kind: {}",
                            value_kind
                        ))),
                    )
                })?;
                let raw_value: String = row.get(6)?;
                let maturity_str: String = row.get(9)?;
                let maturity = Maturity::parse(&maturity_str).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        9,
                        rusqlite::types::Type::Text,
                        Box::new(StoreError::InvalidData(format!(
                            "Unknown maturity: {}",
                            maturity_str
                        ))),
                    )
                })?;
                let conflicting: String = row.get(10)?;
                let conflicting = Self::json_to_ids(&conflicting)
                    .map_err(invalid_blob(10))?
                    .into_iter()
                    .map(ClaimId::from_value)
                    .collect();
                let sources_json: String = row.get(11)?;
                let sources_raw: Vec<serde_json::Value> =
                    serde_json::from_str(&sources_json).map_err(invalid_json(11))?;
                let mut sources = Vec::with_capacity(sources_raw.len());
                for entry in &sources_raw {
                    let claim_id = entry
                        .get("claim_id")
                        .and_then(|v| v.as_str())
                        .and_then(uuid_parse)
                        .ok_or_else(|| {
                            rusqlite::Error::FromSqlConversionFailure(
                                11,
                                rusqlite::types::Type::Text,
                                Box::new(StoreError::InvalidData(
                                    "source missing claim_id".to_string(),
                                )),
                            )
                        })?;
                    sources.push(SourceRef {
                        claim_id: ClaimId::from_value(claim_id),
                        document_id: entry
                            .get("document_id")
                            .and_then(|v| v.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        segment_id: entry
                            .get("segment_id")
                            .and_then(|v| v.as_str())
                            .map(|s| s.to_string()),
                    });
                }

                Ok(CanonicalClaim {
                    tenant: row.get(1)?,
                    subject_id: SubjectId::from_value(subject_id),
                    kind: row.get(3)?,
                    scope: ScopeKey::from_raw(row.get::<_, String>(4)?),
                    value: Value::parse_as(&raw_value, kind),
                    raw_value,
                    document_count: row.get::<_, i64>(7)? as usize,
                    assertion_count: row.get::<_, i64>(8)? as usize,
                    maturity,
                    conflicting_ids: conflicting,
                    sources,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
