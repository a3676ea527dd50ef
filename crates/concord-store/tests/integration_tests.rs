//! Integration tests for the SQLite store

use concord_domain::traits::{AppendOutcome, ClaimStore, GraphStore, SubjectStore};
use concord_domain::{
    ApplicabilityAxis, CanonicalClaim, ClaimCluster, ClaimId, ClusterId, Maturity,
    OrderingConfidence, RawClaim, ScopeKey, SourceRef, Subject, SubjectId, Value,
};
use concord_store::SqliteStore;

fn subject(id: u128, tenant: &str, name: &str) -> Subject {
    Subject::new(SubjectId::from_value(id), tenant, name, 1000)
}

fn claim(id: u128, tenant: &str, doc: &str, raw_value: &str) -> RawClaim {
    RawClaim {
        id: ClaimId::from_value(id),
        tenant: tenant.to_string(),
        subject_id: SubjectId::from_value(1),
        kind: "sla_uptime".to_string(),
        raw_value: raw_value.to_string(),
        value: Value::parse(raw_value),
        scope: ScopeKey::default_scope(),
        evidence: format!("uptime is {}", raw_value),
        document_id: doc.to_string(),
        segment_id: Some("p1".to_string()),
        conditional: false,
        entities: vec![SubjectId::from_value(7)],
        confidence: 0.9,
        created_at: 1000,
    }
}

#[test]
fn test_subject_roundtrip() {
    let mut store = SqliteStore::new(":memory:").unwrap();

    let mut s = subject(1, "t1", "Acme Corporation");
    s.aliases.push("Acme".to_string());
    s.learned_aliases.push("acme corp".to_string());
    s.embedding = Some(vec![0.1, 0.2, 0.3]);
    s.possible_equivalents.push(SubjectId::from_value(9));

    store.upsert_subject(&s).unwrap();

    let loaded = store.get_subject(s.id).unwrap().unwrap();
    assert_eq!(loaded, s);

    assert!(store.get_subject(SubjectId::from_value(999)).unwrap().is_none());
}

#[test]
fn test_subject_upsert_is_additive_update() {
    let mut store = SqliteStore::new(":memory:").unwrap();

    let mut s = subject(1, "t1", "Acme Corporation");
    store.upsert_subject(&s).unwrap();

    s.learned_aliases.push("acme intl".to_string());
    store.upsert_subject(&s).unwrap();

    let loaded = store.get_subject(s.id).unwrap().unwrap();
    assert_eq!(loaded.learned_aliases, vec!["acme intl".to_string()]);
    assert_eq!(store.list_subjects("t1").unwrap().len(), 1);
}

#[test]
fn test_list_subjects_is_tenant_scoped() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    store.upsert_subject(&subject(1, "t1", "Acme")).unwrap();
    store.upsert_subject(&subject(2, "t1", "Globex")).unwrap();
    store.upsert_subject(&subject(3, "t2", "Initech")).unwrap();

    let t1 = store.list_subjects("t1").unwrap();
    assert_eq!(t1.len(), 2);
    assert!(t1.iter().all(|s| s.tenant == "t1"));
    assert_eq!(store.list_subjects("t2").unwrap().len(), 1);
}

#[test]
fn test_find_by_name_matches_aliases() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    let mut s = subject(1, "t1", "Acme Corporation");
    s.aliases.push("Acme Corp.".to_string());
    store.upsert_subject(&s).unwrap();

    let found = store.find_by_name("t1", "acme corp").unwrap();
    assert_eq!(found.unwrap().id, s.id);
    assert!(store.find_by_name("t1", "globex").unwrap().is_none());
    assert!(store.find_by_name("t2", "acme corp").unwrap().is_none());
}

#[test]
fn test_claim_append_roundtrip() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    let c = claim(1, "t1", "doc-a", "99.5%");

    assert_eq!(store.append_claim(&c).unwrap(), AppendOutcome::Inserted);

    let claims = store.claims_for_tenant("t1").unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0], c);
}

#[test]
fn test_reingestion_is_idempotent() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    let c = claim(1, "t1", "doc-a", "99.5%");
    store.append_claim(&c).unwrap();

    // Same content re-extracted with a fresh claim id: recognized, not duplicated
    let mut again = claim(2, "t1", "doc-a", "99.5%");
    again.confidence = 0.7;
    assert_eq!(
        store.append_claim(&again).unwrap(),
        AppendOutcome::AlreadyPresent
    );
    assert_eq!(store.claims_for_tenant("t1").unwrap().len(), 1);

    // A different value from the same document is new content
    let other = claim(3, "t1", "doc-a", "97.0%");
    assert_eq!(store.append_claim(&other).unwrap(), AppendOutcome::Inserted);
    assert_eq!(store.claims_for_tenant("t1").unwrap().len(), 2);
}

#[test]
fn test_claims_for_group() {
    let mut store = SqliteStore::new(":memory:").unwrap();
    store.append_claim(&claim(1, "t1", "doc-a", "99.5%")).unwrap();
    store.append_claim(&claim(2, "t1", "doc-b", "97.0%")).unwrap();

    let mut other_kind = claim(3, "t1", "doc-c", "30");
    other_kind.kind = "retention_days".to_string();
    store.append_claim(&other_kind).unwrap();

    let group = store
        .claims_for_group(
            "t1",
            SubjectId::from_value(1),
            "sla_uptime",
            &ScopeKey::default_scope(),
        )
        .unwrap();
    assert_eq!(group.len(), 2);
    assert!(group.iter().all(|c| c.kind == "sla_uptime"));
}

#[test]
fn test_axis_roundtrip_and_upsert() {
    let mut store = SqliteStore::new(":memory:").unwrap();

    let mut axis = ApplicabilityAxis::new("t1", "release", 10);
    axis.observe("2.0");
    axis.observe("3.0");
    axis.is_orderable = true;
    axis.ordering_confidence = OrderingConfidence::Certain;
    axis.value_order = Some(vec!["2.0".to_string(), "3.0".to_string()]);
    store.upsert_axis(&axis).unwrap();

    let loaded = store.get_axis("t1", "release").unwrap().unwrap();
    assert_eq!(loaded, axis);

    // Merge-style update replaces the row, keyed by (tenant, key)
    axis.observe("beta");
    axis.updated_at = 20;
    store.upsert_axis(&axis).unwrap();

    let loaded = store.get_axis("t1", "release").unwrap().unwrap();
    assert_eq!(loaded.known_values, vec!["2.0", "3.0", "beta"]);
    assert_eq!(loaded.ordering_confidence, OrderingConfidence::Certain);
    assert_eq!(store.list_axes("t1").unwrap().len(), 1);

    assert!(store.get_axis("t1", "edition").unwrap().is_none());
}

#[test]
fn test_cluster_upsert() {
    let mut store = SqliteStore::new(":memory:").unwrap();

    let cluster = ClaimCluster {
        id: ClusterId::from_value(1),
        tenant: "t1".to_string(),
        member_ids: vec![ClaimId::from_value(1), ClaimId::from_value(2)],
        label: "uptime must be 99.5%".to_string(),
        document_ids: vec!["doc-a".to_string(), "doc-b".to_string()],
        aggregate_confidence: 0.85,
        created_at: 10,
    };
    store.upsert_cluster(&cluster).unwrap();

    // Re-deriving the same cluster id overwrites, not duplicates
    let mut updated = cluster.clone();
    updated.member_ids.push(ClaimId::from_value(3));
    store.upsert_cluster(&updated).unwrap();
}

#[test]
fn test_canonical_roundtrip() {
    let mut store = SqliteStore::new(":memory:").unwrap();

    let row = CanonicalClaim {
        tenant: "t1".to_string(),
        subject_id: SubjectId::from_value(1),
        kind: "sla_uptime".to_string(),
        scope: ScopeKey::default_scope(),
        value: Value::parse("99.5%"),
        raw_value: "99.5%".to_string(),
        document_count: 2,
        assertion_count: 3,
        maturity: Maturity::Conflicting,
        conflicting_ids: vec![ClaimId::from_value(1), ClaimId::from_value(2)],
        sources: vec![SourceRef {
            claim_id: ClaimId::from_value(1),
            document_id: "doc-a".to_string(),
            segment_id: Some("p2".to_string()),
        }],
    };
    store.upsert_canonical(&row).unwrap();

    let loaded = store.list_canonical("t1").unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0], row);

    // Regeneration upserts in place of the old row
    let mut regenerated = row.clone();
    regenerated.maturity = Maturity::Validated;
    regenerated.conflicting_ids.clear();
    store.upsert_canonical(&regenerated).unwrap();

    let loaded = store.list_canonical("t1").unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].maturity, Maturity::Validated);
}

#[test]
fn test_on_disk_persistence() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concord.db");

    {
        let mut store = SqliteStore::new(&path).unwrap();
        store.upsert_subject(&subject(1, "t1", "Acme")).unwrap();
        store.append_claim(&claim(1, "t1", "doc-a", "99.5%")).unwrap();
    }

    let store = SqliteStore::new(&path).unwrap();
    assert_eq!(store.list_subjects("t1").unwrap().len(), 1);
    assert_eq!(store.claims_for_tenant("t1").unwrap().len(), 1);
}
