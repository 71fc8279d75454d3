use registrar_core::{
    open_db, open_db_in_memory, Device, Identifiable, RecordStore, RowRef, SqliteRecord,
    SqliteStore, StoreError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn device_store(conn: &Connection) -> SqliteStore<'_, Device> {
    SqliteStore::<Device>::initialize(conn).unwrap();
    SqliteStore::try_new(conn).unwrap()
}

fn device(id: Uuid, label: &str) -> Device {
    let mut device = Device::with_id(id);
    device.label = Some(label.to_string());
    device
}

#[test]
fn try_new_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteStore::<Device>::try_new(&conn);
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredTable("devices"))
    ));
}

#[test]
fn try_new_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE devices (
            identifier TEXT PRIMARY KEY NOT NULL,
            label TEXT
        );",
    )
    .unwrap();

    let result = SqliteStore::<Device>::try_new(&conn);
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredColumn {
            table: "devices",
            column: "registered_at_ms"
        })
    ));
}

#[test]
fn fetch_rejects_unknown_attribute() {
    let conn = open_db_in_memory().unwrap();
    let store = device_store(&conn);

    let result = store.fetch_by_identifier("serial_number", &Uuid::new_v4(), Some(1));
    assert!(matches!(
        result,
        Err(StoreError::MissingRequiredColumn {
            table: "devices",
            column: "serial_number"
        })
    ));
}

#[test]
fn stage_and_commit_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let store = device_store(&conn);
    let id = Uuid::new_v4();

    store.stage(device(id, "lab bench")).unwrap();
    assert!(store.has_pending_changes());

    store.commit_pending_changes().unwrap();
    assert!(!store.has_pending_changes());

    let matched = store
        .fetch_by_identifier(Device::IDENTIFIER_ATTRIBUTE, &id, None)
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert!(matches!(matched[0].reference, RowRef::Row(_)));
    assert_eq!(matched[0].record.label.as_deref(), Some("lab bench"));
}

#[test]
fn staged_records_are_visible_before_commit() {
    let conn = open_db_in_memory().unwrap();
    let store = device_store(&conn);
    let id = Uuid::new_v4();

    store.stage(device(id, "staging")).unwrap();

    let matched = store
        .fetch_by_identifier(Device::IDENTIFIER_ATTRIBUTE, &id, None)
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].reference, RowRef::Pending(0));
}

#[test]
fn fetch_limit_caps_combined_committed_and_pending_matches() {
    let conn = open_db_in_memory().unwrap();
    let store = device_store(&conn);
    let id = Uuid::new_v4();

    store.stage(device(id, "committed")).unwrap();
    store.commit_pending_changes().unwrap();
    store.stage(device(id, "staged twin")).unwrap();

    let all = store
        .fetch_by_identifier(Device::IDENTIFIER_ATTRIBUTE, &id, None)
        .unwrap();
    assert_eq!(all.len(), 2);

    let limited = store
        .fetch_by_identifier(Device::IDENTIFIER_ATTRIBUTE, &id, Some(1))
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert!(matches!(limited[0].reference, RowRef::Row(_)));
}

#[test]
fn duplicate_commit_violates_uniqueness_constraint() {
    let conn = open_db_in_memory().unwrap();
    let store = device_store(&conn);
    let id = Uuid::new_v4();

    store.stage(device(id, "first")).unwrap();
    store.commit_pending_changes().unwrap();

    // Simulates the cross-handle create race: both sides observed a miss,
    // the second commit hits the identifier PRIMARY KEY.
    store.stage(device(id, "second")).unwrap();
    let err = store.commit_pending_changes().unwrap_err();
    assert!(matches!(err, StoreError::Sqlite(_)));

    // The failed commit leaves the pending scope intact for the caller.
    assert!(store.has_pending_changes());
    store.discard_pending_changes();
    assert!(!store.has_pending_changes());

    let matched = store
        .fetch_by_identifier(Device::IDENTIFIER_ATTRIBUTE, &id, None)
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].record.label.as_deref(), Some("first"));
}

#[test]
fn commit_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let store = device_store(&conn);
    let existing = Uuid::new_v4();
    let fresh = Uuid::new_v4();

    store.stage(device(existing, "existing")).unwrap();
    store.commit_pending_changes().unwrap();

    // A batch containing one conflicting row must not persist the other.
    store.stage(device(fresh, "fresh")).unwrap();
    store.stage(device(existing, "conflict")).unwrap();
    store.commit_pending_changes().unwrap_err();

    let matched = store
        .fetch_by_identifier(Device::IDENTIFIER_ATTRIBUTE, &fresh, None)
        .unwrap();
    assert!(
        matched
            .iter()
            .all(|found| !matches!(found.reference, RowRef::Row(_))),
        "rolled-back row must not be committed"
    );
}

#[test]
fn invalid_persisted_identifier_is_rejected_on_read() {
    let conn = open_db_in_memory().unwrap();
    device_store(&conn);

    conn.execute(
        "INSERT INTO devices (identifier, registered_at_ms, label) VALUES ('not-a-uuid', 1, 'bad');",
        [],
    )
    .unwrap();

    let err = conn
        .query_row(
            "SELECT rowid, identifier, registered_at_ms, label FROM devices;",
            [],
            |row| Ok(<Device as SqliteRecord>::from_row(row)),
        )
        .unwrap()
        .unwrap_err();

    match err {
        StoreError::InvalidData(message) => assert!(message.contains("not-a-uuid")),
        other => panic!("expected invalid data error, got: {other}"),
    }
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");
    let id = Uuid::new_v4();

    {
        let conn = open_db(&path).unwrap();
        let store = device_store(&conn);
        store.stage(device(id, "durable")).unwrap();
        store.commit_pending_changes().unwrap();
    }

    let conn = open_db(&path).unwrap();
    let store = SqliteStore::<Device>::try_new(&conn).unwrap();
    let matched = store
        .fetch_by_identifier(Device::IDENTIFIER_ATTRIBUTE, &id, Some(1))
        .unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].record.label.as_deref(), Some("durable"));
}
