use milla_core::ports::{ArticleCatalog, DespatchStore, RecipientDirectory, ReceptionStore, VehicleRegistry};
use milla_core::{
    CoreError, DespatchDraft, DespatchLine, DespatchStatus, LoadStatus, ReceptionSession, SessionStatus, VehicleId,
};
use milla_store::{Dataset, MemoryStore, SqliteStore};

const DATASET: &str = r#"
[[articles]]
code = "CJ-12"
description = "Caja x12"
factor_intermediate = 12.0

[[vehicles]]
id = 1
plate = "TRK100"
capacity = 100.0

[[vehicles]]
id = 2
plate = "TRK050"
capacity = 50.0

[[recipients]]
address = "bodega@milla7.com"

[[recipients]]
address = "antiguo@milla7.com"
active = false

[[loads]]
load_number = "C-1"
plate = "TRK100"
order_ref = "PED-1"
address = "Calle 1"

[[loads.lines]]
article_code = "CJ-12"
expected_qty = 24.0
volume = 3.0

[[loads]]
load_number = "C-2"
plate = "TRK050"
plan = "r"
"#;

fn seeded(dir: &tempfile::TempDir) -> SqliteStore {
    let store = SqliteStore::open(&dir.path().join("milla.db")).unwrap();
    let dataset = Dataset::from_toml(DATASET).unwrap();
    let summary = store.seed(&dataset).unwrap();
    assert_eq!(summary.loads, 2);
    store
}

fn draft(vehicle: i64, refs: &[&str]) -> DespatchDraft {
    DespatchDraft {
        vehicle_id: VehicleId(vehicle),
        status: DespatchStatus::Planned,
        occupied_volume: refs.len() as f64,
        created_by: Some("planner".into()),
        lines: refs
            .iter()
            .map(|r| DespatchLine { invoice_ref: r.to_string(), address: "CALLE 1".into(), volume: 1.0 })
            .collect(),
    }
}

#[test]
fn seed_populates_every_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(&dir);

    assert_eq!(store.pending_loads().unwrap().len(), 2);
    assert_eq!(store.list_available().unwrap().len(), 2);
    assert_eq!(store.list_active_recipients().unwrap(), vec!["bodega@milla7.com".to_string()]);
    assert!(store.lookup_by_code("cj-12").unwrap().is_some());
}

#[test]
fn seeding_same_loads_twice_fails_without_partial_writes() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(&dir);

    let again = Dataset::from_toml(DATASET).unwrap();
    let err = store.seed(&again).unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    // recipients from the failed seed were rolled back
    assert_eq!(store.list_active_recipients().unwrap().len(), 1);
}

#[test]
fn session_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("milla.db");
    let load_id = {
        let store = seeded(&dir);
        let load_id = store.pending_loads().unwrap()[0].id;
        let article = store.lookup_by_code("CJ-12").unwrap().unwrap();
        store
            .with_ledger(load_id, |ledger| {
                let session = ledger.session_or_start(Some("ana".into()), chrono::Utc::now());
                session.accumulate(&article, 12.0);
                session.failed_attempts = 1;
                Ok(())
            })
            .unwrap();
        load_id
    };

    let store = SqliteStore::open(&path).unwrap();
    let session: ReceptionSession = store.ledger(load_id).unwrap().session.unwrap();
    assert_eq!(session.operator.as_deref(), Some("ana"));
    assert_eq!(session.failed_attempts, 1);
    assert_eq!(session.status, SessionStatus::Counting);
    assert_eq!(session.counts.values().map(|l| l.total).sum::<f64>(), 12.0);
}

#[test]
fn terminal_status_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(&dir);
    let load_id = store.pending_loads().unwrap()[0].id;

    store
        .with_ledger(load_id, |ledger| {
            let now = chrono::Utc::now();
            ledger.session_or_start(None, now).close(SessionStatus::ValidatedOk, now)?;
            ledger.load.status = ledger.load.status.transition(LoadStatus::ValidatedOk)?;
            Ok(())
        })
        .unwrap();

    let ok = store.loads_with_status(LoadStatus::ValidatedOk).unwrap();
    assert_eq!(ok.len(), 1);
    assert_eq!(ok[0].order_ref.as_deref(), Some("PED-1"));
    assert!(store.ledger(load_id).unwrap().session.unwrap().ended_at.is_some());
}

#[test]
fn despatch_commit_is_atomic() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(&dir);

    let ids = store.create_despatches(&[draft(1, &["PED-1"]), draft(2, &["PED-2"])]).unwrap();
    assert_eq!(ids.len(), 2);

    // second batch repeats PED-1: the unique constraint aborts the whole batch
    let err = store.create_despatches(&[draft(2, &["PED-3"]), draft(1, &["PED-1"])]).unwrap_err();
    assert!(matches!(err, CoreError::Persistence(_)));

    let refs = store.dispatched_refs().unwrap();
    assert_eq!(refs.len(), 2);
    assert!(!refs.contains("PED-3"));
    assert_eq!(store.despatch_lines().unwrap().len(), 2);
}

#[test]
fn despatch_for_unknown_vehicle_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = seeded(&dir);
    let err = store.create_despatches(&[draft(99, &["PED-1"])]).unwrap_err();
    assert!(matches!(err, CoreError::Persistence(_)));
    assert!(store.dispatched_refs().unwrap().is_empty());
}

#[test]
fn both_catalogs_resolve_non_ascii_codes_alike() {
    let mut article = milla_core::Article::placeholder("cañ-12");
    article.factor_intermediate = 12.0;

    let sqlite = SqliteStore::open_in_memory().unwrap();
    sqlite.upsert_article(&article).unwrap();
    let memory = MemoryStore::new();
    memory.add_article(article);

    for code in ["CAÑ-12", " cañ-12", "Cañ-12"] {
        let a = sqlite.lookup_by_code(code).unwrap().map(|a| a.factor_intermediate);
        let b = memory.lookup_by_code(code).unwrap().map(|a| a.factor_intermediate);
        assert_eq!(a, Some(12.0), "sqlite lookup of {code:?}");
        assert_eq!(a, b, "adapters disagree on {code:?}");
    }
}
