use registrar_core::{
    Device, DeviceId, KeyedRegistrar, Persisted, RecordStore, Registrar, RegistrarError, RowRef,
    SaveMode, StoreError, StoreResult,
};
use std::error::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailPoint {
    Fetch,
    Stage,
    Commit,
}

/// Store double whose configured operation always fails.
struct FailingStore {
    fail_at: FailPoint,
}

impl RecordStore for FailingStore {
    type Record = Device;
    type Ref = RowRef;

    fn fetch_by_identifier(
        &self,
        _attribute: &'static str,
        _id: &DeviceId,
        _limit: Option<usize>,
    ) -> StoreResult<Vec<Persisted<RowRef, Device>>> {
        if self.fail_at == FailPoint::Fetch {
            return Err(StoreError::Backend("fetch refused".to_string()));
        }
        Ok(Vec::new())
    }

    fn synthesize(&self) -> Device {
        Device::default()
    }

    fn stage(&self, _record: Device) -> StoreResult<()> {
        if self.fail_at == FailPoint::Stage {
            return Err(StoreError::Backend("stage refused".to_string()));
        }
        Ok(())
    }

    fn has_pending_changes(&self) -> bool {
        true
    }

    fn commit_pending_changes(&self) -> StoreResult<()> {
        if self.fail_at == FailPoint::Commit {
            return Err(StoreError::Backend("commit refused".to_string()));
        }
        Ok(())
    }
}

fn backend_message(err: &RegistrarError<DeviceId, RowRef>) -> &str {
    match err {
        RegistrarError::Unexpected(StoreError::Backend(message)) => message,
        other => panic!("expected wrapped backend failure, got: {other}"),
    }
}

#[test]
fn fetch_failure_surfaces_through_every_operation() {
    let store = FailingStore {
        fail_at: FailPoint::Fetch,
    };
    let registrar = KeyedRegistrar::new(Uuid::new_v4(), &store, |_: &mut Device| {});

    let query_err = registrar.query().unwrap_err();
    assert_eq!(backend_message(&query_err), "fetch refused");

    let insert_err = registrar.insert(SaveMode::Immediate).unwrap_err();
    assert_eq!(backend_message(&insert_err), "fetch refused");

    let upsert_err = registrar.query_or_insert(SaveMode::Immediate).unwrap_err();
    assert_eq!(backend_message(&upsert_err), "fetch refused");
}

#[test]
fn wrapped_failure_preserves_cause_through_source_chain() {
    let store = FailingStore {
        fail_at: FailPoint::Fetch,
    };
    let registrar = KeyedRegistrar::new(Uuid::new_v4(), &store, |_: &mut Device| {});

    let err = registrar.query().unwrap_err();
    let cause = err.source().expect("unexpected failures carry a cause");
    assert!(cause.to_string().contains("fetch refused"));
}

#[test]
fn stage_failure_aborts_creation() {
    let store = FailingStore {
        fail_at: FailPoint::Stage,
    };
    let registrar = KeyedRegistrar::new(Uuid::new_v4(), &store, |_: &mut Device| {});

    let insert_err = registrar.insert(SaveMode::Deferred).unwrap_err();
    assert_eq!(backend_message(&insert_err), "stage refused");

    let upsert_err = registrar.query_or_insert(SaveMode::Deferred).unwrap_err();
    assert_eq!(backend_message(&upsert_err), "stage refused");
}

#[test]
fn commit_failure_only_surfaces_with_immediate_save() {
    let store = FailingStore {
        fail_at: FailPoint::Commit,
    };
    let id = Uuid::new_v4();
    let registrar = KeyedRegistrar::new(id, &store, |device: &mut Device| {
        device.registered_at_ms = Some(42);
    });

    let err = registrar.insert(SaveMode::Immediate).unwrap_err();
    assert_eq!(backend_message(&err), "commit refused");

    // Deferred creation never reaches the failing commit.
    let created = registrar.insert(SaveMode::Deferred).unwrap();
    assert_eq!(created.identifier, id);
    assert_eq!(created.registered_at_ms, Some(42));
}

#[test]
fn not_found_and_conflict_render_distinct_messages() {
    let id = Uuid::new_v4();
    let not_found: RegistrarError<DeviceId, RowRef> = RegistrarError::NotFound(id);
    assert!(not_found.to_string().contains(&id.to_string()));

    let conflict: RegistrarError<DeviceId, RowRef> =
        RegistrarError::AlreadyExists(RowRef::Row(7));
    assert!(conflict.to_string().contains("already exists"));
    assert!(not_found.source().is_none());
    assert!(conflict.source().is_none());
}
