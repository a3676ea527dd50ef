//! End-to-end tests over the engine with a real SQLite store

use concord_domain::{Maturity, OrderingConfidence};
use concord_embed::HashEmbedder;
use concord_engine::{ClaimInput, DocumentBatch, Engine, EngineConfig, ReconsolidationWorker};
use concord_resolver::ResolutionStatus;
use concord_store::SqliteStore;
use concord_temporal::{DocumentAuthority, SelectionCandidate, SelectionPolicy};
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .try_init();
}

fn engine() -> Engine<SqliteStore> {
    init_tracing();
    let store = SqliteStore::new(":memory:").unwrap();
    Engine::new(store, None, EngineConfig::default()).unwrap()
}

fn engine_with_embedder() -> Engine<SqliteStore> {
    init_tracing();
    let store = SqliteStore::new(":memory:").unwrap();
    Engine::new(
        store,
        Some(Arc::new(HashEmbedder::new(64))),
        EngineConfig::default(),
    )
    .unwrap()
}

fn claim_input(subject: &str, kind: &str, raw_value: &str, evidence: &str) -> ClaimInput {
    ClaimInput {
        subject_name: subject.to_string(),
        kind: kind.to_string(),
        raw_value: raw_value.to_string(),
        value_kind: None,
        qualifiers: vec![],
        evidence: evidence.to_string(),
        segment_id: None,
        conditional: false,
        entity_names: vec![],
        confidence: 0.9,
    }
}

fn batch(tenant: &str, doc: &str, axis_values: &[(&str, &str)], claims: Vec<ClaimInput>) -> DocumentBatch {
    DocumentBatch {
        tenant: tenant.to_string(),
        document_id: doc.to_string(),
        axis_values: axis_values
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        claims,
    }
}

#[tokio::test]
async fn test_axis_lifecycle_across_documents() {
    let engine = engine();

    // Two documents assert release_id 2.0 and 3.0 with no prior axis state
    engine
        .ingest_document(batch("t1", "doc-a", &[("release_id", "2.0")], vec![]))
        .await
        .unwrap();
    engine
        .ingest_document(batch("t1", "doc-b", &[("release_id", "3.0")], vec![]))
        .await
        .unwrap();

    let axis = engine.get_axis("t1", "release_id").await.unwrap().unwrap();
    assert!(axis.is_orderable);
    assert_eq!(axis.ordering_confidence, OrderingConfidence::Certain);
    assert_eq!(
        axis.value_order,
        Some(vec!["2.0".to_string(), "3.0".to_string()])
    );

    // A third document asserts "beta": inference over the mixed family
    // fails, and the prior result is preserved unchanged
    engine
        .ingest_document(batch("t1", "doc-c", &[("release_id", "beta")], vec![]))
        .await
        .unwrap();

    let axis = engine.get_axis("t1", "release_id").await.unwrap().unwrap();
    assert!(axis.is_orderable);
    assert_eq!(axis.ordering_confidence, OrderingConfidence::Certain);
    assert_eq!(
        axis.value_order,
        Some(vec!["2.0".to_string(), "3.0".to_string()]),
        "beta must not erase the established order"
    );
    assert_eq!(axis.known_values, vec!["2.0", "3.0", "beta"]);

    // Re-observing a known value changes nothing
    let unchanged = engine
        .observe_axis_value("t1", "release_id", "2.0")
        .await
        .unwrap();
    assert!(unchanged.is_none());
}

#[tokio::test]
async fn test_ingestion_reports_and_idempotence() {
    let engine = engine();

    let report = engine
        .ingest_document(batch(
            "t1",
            "doc-a",
            &[],
            vec![
                claim_input(
                    "Acme Corporation",
                    "sla_uptime",
                    "99.5%",
                    "Uptime must be at least 99.5 percent",
                ),
                claim_input(
                    "Acme Corporation",
                    "retention_days",
                    "30",
                    "Logs are retained for 30 days",
                ),
                // Invalid: empty evidence
                ClaimInput {
                    evidence: String::new(),
                    ..claim_input("Acme Corporation", "bad", "1", "x")
                },
            ],
        ))
        .await
        .unwrap();

    assert_eq!(report.claims_appended, 2);
    assert_eq!(report.subjects_created, 1, "one subject, mentioned twice");
    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.duplicates, 0);

    // Re-ingesting the same document appends nothing new
    let again = engine
        .ingest_document(batch(
            "t1",
            "doc-a",
            &[],
            vec![
                claim_input(
                    "Acme Corporation",
                    "sla_uptime",
                    "99.5%",
                    "Uptime must be at least 99.5 percent",
                ),
                claim_input(
                    "Acme Corporation",
                    "retention_days",
                    "30",
                    "Logs are retained for 30 days",
                ),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(again.claims_appended, 0);
    assert_eq!(again.duplicates, 2);
    assert_eq!(again.subjects_created, 0);
}

#[tokio::test]
async fn test_malformed_batch_is_a_hard_failure() {
    let engine = engine();

    let result = engine
        .ingest_document(batch("", "doc-a", &[], vec![]))
        .await;

    let err = result.unwrap_err();
    assert!(err.to_string().contains("doc-a"), "context in the error: {}", err);
}

#[tokio::test]
async fn test_conflicting_sla_across_three_documents() {
    let engine = engine();

    for (doc, value) in [("doc-a", "99.5%"), ("doc-b", "99.5%"), ("doc-c", "97.0%")] {
        engine
            .ingest_document(batch(
                "t1",
                doc,
                &[],
                vec![claim_input(
                    "Acme Corporation",
                    "sla_uptime",
                    value,
                    &format!("Uptime commitment is {}", value),
                )],
            ))
            .await
            .unwrap();
    }

    let canonical = engine.consolidate_claims("t1").await.unwrap();
    assert_eq!(canonical.len(), 1);
    let row = &canonical[0];
    assert_eq!(row.maturity, Maturity::Conflicting);
    assert_eq!(row.document_count, 3);
    assert_eq!(row.conflicting_ids.len(), 3, "every contributor is cited");

    // Stored rows match the returned projection
    let stored = engine.canonical_claims("t1").await.unwrap();
    assert_eq!(stored, canonical);

    // Idempotence: consolidating again yields identical rows
    let again = engine.consolidate_claims("t1").await.unwrap();
    assert_eq!(again, canonical);
}

#[tokio::test]
async fn test_agreeing_documents_cluster_and_validate() {
    let engine = engine();

    for doc in ["doc-a", "doc-b"] {
        engine
            .ingest_document(batch(
                "t1",
                doc,
                &[],
                vec![claim_input(
                    "Acme Corporation",
                    "encryption_at_rest",
                    "true",
                    "customer data must be encrypted at rest",
                )],
            ))
            .await
            .unwrap();
    }

    let outcome = engine.cluster_claims("t1").await.unwrap();
    assert_eq!(outcome.clusters.len(), 1);
    assert_eq!(outcome.clusters[0].document_ids, vec!["doc-a", "doc-b"]);
    assert!(!outcome.embeddings_used, "no embedder configured");

    let canonical = engine.consolidate_claims("t1").await.unwrap();
    assert_eq!(canonical[0].maturity, Maturity::Validated);
}

#[tokio::test]
async fn test_clustering_with_hash_embedder_runs_embedding_path() {
    let engine = engine_with_embedder();

    // Identical evidence embeds identically, so the embedding path accepts
    // the pair; the point here is that the pipeline survives a live embedder.
    for doc in ["doc-a", "doc-b"] {
        engine
            .ingest_document(batch(
                "t1",
                doc,
                &[],
                vec![claim_input(
                    "Acme Corporation",
                    "encryption_at_rest",
                    "true",
                    "customer data must be encrypted at rest",
                )],
            ))
            .await
            .unwrap();
    }

    let outcome = engine.cluster_claims("t1").await.unwrap();
    assert!(outcome.embeddings_used);
    assert_eq!(outcome.clusters.len(), 1);
}

#[tokio::test]
async fn test_resolution_is_tenant_scoped() {
    let engine = engine();

    engine
        .ingest_document(batch(
            "t1",
            "doc-a",
            &[],
            vec![claim_input("Acme Corporation", "k", "1", "evidence text")],
        ))
        .await
        .unwrap();

    // The same name in another tenant is a fresh subject
    let report = engine
        .ingest_document(batch(
            "t2",
            "doc-b",
            &[],
            vec![claim_input("Acme Corporation", "k", "1", "evidence text")],
        ))
        .await
        .unwrap();

    assert_eq!(report.subjects_created, 1);
}

#[tokio::test]
async fn test_resolve_subject_query_path() {
    let engine = engine();

    engine
        .ingest_document(batch(
            "t1",
            "doc-a",
            &[],
            vec![claim_input("Acme Corporation", "k", "1", "evidence text")],
        ))
        .await
        .unwrap();

    let resolution = engine.resolve_subject("t1", "acme corporation").await.unwrap();
    assert_eq!(resolution.status, ResolutionStatus::Resolved);
    assert_eq!(resolution.confidence, 1.0);

    let rejected = engine.resolve_subject("t1", "system").await.unwrap();
    assert_eq!(rejected.status, ResolutionStatus::Rejected);
}

#[tokio::test]
async fn test_select_latest_against_stored_axis() {
    let engine = engine();

    engine
        .ingest_document(batch("t1", "doc-2020", &[("release", "2.0")], vec![]))
        .await
        .unwrap();
    engine
        .ingest_document(batch("t1", "doc-2024", &[("release", "3.0")], vec![]))
        .await
        .unwrap();

    let candidates = vec![
        SelectionCandidate {
            id: "doc-2020".to_string(),
            authority: DocumentAuthority::Unknown,
            status: None,
            doc_type: None,
            axis_value: Some("2.0".to_string()),
        },
        SelectionCandidate {
            id: "doc-2024".to_string(),
            authority: DocumentAuthority::Unknown,
            status: None,
            doc_type: None,
            axis_value: Some("3.0".to_string()),
        },
    ];

    let selection = engine
        .select_latest("t1", &candidates, &SelectionPolicy::default())
        .await
        .unwrap();

    assert_eq!(selection.selected_id.as_deref(), Some("doc-2024"));
    assert!(selection.fallback_used, "declared axis fallback");
    assert!(selection.why_selected.contains("release"));
}

#[tokio::test]
async fn test_similar_subjects_for_equivalence_review() {
    let engine_embed = engine_with_embedder();

    for (doc, subject) in [("doc-a", "Acme Corporation"), ("doc-b", "Globex Industries")] {
        engine_embed
            .ingest_document(batch(
                "t1",
                doc,
                &[],
                vec![claim_input(subject, "k", "1", "some evidence text")],
            ))
            .await
            .unwrap();
    }

    // The exact mention embeds identically to the stored subject embedding
    let neighbors = engine_embed
        .similar_subjects("t1", "Acme Corporation", 2)
        .await
        .unwrap();
    assert_eq!(neighbors.len(), 2);
    assert!((neighbors[0].1 - 1.0).abs() < 1e-4, "exact mention is nearest");
    assert!(neighbors[0].1 > neighbors[1].1);

    // Without an embedder the review tool degrades to an empty answer
    let engine_plain = engine();
    let none = engine_plain.similar_subjects("t1", "Acme", 2).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_worker_cycles_keep_derived_state_fresh() {
    let engine = engine();

    engine
        .ingest_document(batch(
            "t1",
            "doc-a",
            &[],
            vec![claim_input(
                "Acme Corporation",
                "sla_uptime",
                "99.5%",
                "Uptime commitment is 99.5%",
            )],
        ))
        .await
        .unwrap();

    let mut worker =
        ReconsolidationWorker::new(vec!["t1".to_string()], Duration::from_millis(5));
    worker.run_cycles(&engine, 2).await.unwrap();

    let canonical = engine.canonical_claims("t1").await.unwrap();
    assert_eq!(canonical.len(), 1);
    assert_eq!(canonical[0].maturity, Maturity::Candidate);
}
