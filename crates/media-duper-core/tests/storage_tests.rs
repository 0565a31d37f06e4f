use media_duper_core::hasher::{FullId, PartialId};
use media_duper_core::storage::{Database, MediaRecord};
use media_duper_core::{Fingerprint, FingerprintStore, MediaKind, PerceptualHash, StoreError};
use tempfile::tempdir;

fn make_record(path: &str, full: &str, partial: Option<&str>) -> MediaRecord {
    MediaRecord {
        id: 0,
        path: path.to_string(),
        full_identity: full.to_string(),
        partial_identity: partial.map(str::to_string),
        media_kind: MediaKind::Video,
        fingerprint: Fingerprint::new(vec![
            PerceptualHash::new(vec![0x0F; 8]),
            PerceptualHash::new(vec![0xF0; 8]),
        ]),
        processed_at: "2024-03-01T12:00:00+00:00".to_string(),
    }
}

#[test]
fn test_schema_version_and_table() {
    let db = Database::open_in_memory().unwrap();
    let version: i64 = db
        .connection()
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, 1);

    let tables: i64 = db
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'media_record'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(tables, 1);
}

#[test]
fn test_put_and_lookup() {
    let store = FingerprintStore::open_in_memory().unwrap();
    let record = make_record("/media/a.mp4", "aa11", Some("100:00000000000000ff"));
    store.put(&record).unwrap();

    let by_path = store.lookup_by_path("/media/a.mp4").unwrap().unwrap();
    assert!(by_path.id > 0);
    assert_eq!(by_path.full_identity, "aa11");
    assert_eq!(by_path.media_kind, MediaKind::Video);
    assert_eq!(by_path.fingerprint, record.fingerprint);

    let by_full = store
        .lookup_by_full(&FullId::from("aa11".to_string()))
        .unwrap()
        .unwrap();
    assert_eq!(by_full.path, "/media/a.mp4");

    let partial: PartialId = "100:00000000000000ff".parse().unwrap();
    let by_partial = store.lookup_by_partial(&partial).unwrap().unwrap();
    assert_eq!(by_partial.path, "/media/a.mp4");

    assert!(store.lookup_by_path("/media/other.mp4").unwrap().is_none());
}

#[test]
fn test_put_upserts_on_path() {
    let store = FingerprintStore::open_in_memory().unwrap();
    store.put(&make_record("/m/a.jpg", "old", None)).unwrap();

    let mut updated = make_record("/m/a.jpg", "new", Some("5:0000000000000001"));
    updated.media_kind = MediaKind::Photo;
    updated.fingerprint = Fingerprint::new(vec![PerceptualHash::new(vec![1; 8])]);
    store.put(&updated).unwrap();

    assert_eq!(store.count().unwrap(), 1);
    let record = store.lookup_by_path("/m/a.jpg").unwrap().unwrap();
    assert_eq!(record.full_identity, "new");
    assert_eq!(record.media_kind, MediaKind::Photo);
    assert_eq!(record.fingerprint.len(), 1);
    assert!(store
        .lookup_by_full(&FullId::from("old".to_string()))
        .unwrap()
        .is_none());
}

#[test]
fn test_delete_is_idempotent() {
    let store = FingerprintStore::open_in_memory().unwrap();
    store.put(&make_record("/m/a.jpg", "x", None)).unwrap();

    store.delete("/m/a.jpg").unwrap();
    assert!(store.lookup_by_path("/m/a.jpg").unwrap().is_none());
    store.delete("/m/a.jpg").unwrap();
    store.delete("/m/never-seen.jpg").unwrap();
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_rename_moves_record() {
    let store = FingerprintStore::open_in_memory().unwrap();
    store.put(&make_record("/m/a.mp4", "x", None)).unwrap();

    store.rename("/m/a.mp4", "/dupes/a.mp4").unwrap();
    assert!(store.lookup_by_path("/m/a.mp4").unwrap().is_none());
    let moved = store.lookup_by_path("/dupes/a.mp4").unwrap().unwrap();
    assert_eq!(moved.full_identity, "x");
}

#[test]
fn test_rename_conflict_leaves_both() {
    let store = FingerprintStore::open_in_memory().unwrap();
    store.put(&make_record("/m/a.mp4", "x", None)).unwrap();
    store.put(&make_record("/m/b.mp4", "y", None)).unwrap();

    let err = store.rename("/m/a.mp4", "/m/b.mp4").unwrap_err();
    assert!(matches!(err, StoreError::Conflict { ref path } if path == "/m/b.mp4"));
    assert_eq!(
        store.lookup_by_path("/m/a.mp4").unwrap().unwrap().full_identity,
        "x"
    );
    assert_eq!(
        store.lookup_by_path("/m/b.mp4").unwrap().unwrap().full_identity,
        "y"
    );
}

#[test]
fn test_rename_missing_is_noop() {
    let store = FingerprintStore::open_in_memory().unwrap();
    store.rename("/m/ghost.mp4", "/m/elsewhere.mp4").unwrap();
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_backfill_partial() {
    let store = FingerprintStore::open_in_memory().unwrap();
    store.put(&make_record("/m/a.mp4", "x", None)).unwrap();

    let partial: PartialId = "42:000000000000abcd".parse().unwrap();
    assert!(store.lookup_by_partial(&partial).unwrap().is_none());
    store.backfill_partial("/m/a.mp4", &partial).unwrap();

    let found = store.lookup_by_partial(&partial).unwrap().unwrap();
    assert_eq!(found.path, "/m/a.mp4");
    assert_eq!(found.partial_identity.as_deref(), Some("42:000000000000abcd"));
}

#[test]
fn test_records_survive_reopen() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("cache.db");

    {
        let store = FingerprintStore::open(&db_path).unwrap();
        store.put(&make_record("/m/a.mp4", "x", None)).unwrap();
        store.put(&make_record("/m/b.mp4", "y", None)).unwrap();
    }

    let store = FingerprintStore::open(&db_path).unwrap();
    assert_eq!(store.count().unwrap(), 2);
    let record = store.lookup_by_path("/m/b.mp4").unwrap().unwrap();
    assert_eq!(record.fingerprint.len(), 2);
}
