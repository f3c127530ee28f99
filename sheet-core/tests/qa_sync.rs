//! QA tests for cloud save and load.
//!
//! These tests run against an in-memory remote collection, so no service or
//! credentials are needed.
//! Run with: `cargo test -p sheet-core --test qa_sync`

use sheet_core::character::{Ability, RemoteId};
use sheet_core::persist::decode_document;
use sheet_core::testing::{sample_wizard, FixedClock, MemoryRemote, MemoryStore};
use sheet_core::{AuthSession, CharacterStore, CloudSync, SyncError};
use std::sync::Arc;

fn setup() -> (Arc<MemoryStore>, Arc<MemoryRemote>, CharacterStore) {
    let backend = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemote::new());
    let store = CharacterStore::new(backend.clone(), Arc::new(FixedClock::default()));
    (backend, remote, store)
}

fn login_response() -> sheet_api::AuthResponse {
    sheet_api::AuthResponse {
        user_id: "user-1".to_string(),
        username: "vex".to_string(),
        email: "vex@example.com".to_string(),
        token: "token".to_string(),
        expires_at: "2030-01-01T00:00:00Z".to_string(),
    }
}

// =============================================================================
// Saving
// =============================================================================

#[tokio::test]
async fn test_first_save_creates_then_updates() {
    let (_, remote, mut store) = setup();
    let sync = CloudSync::new(remote.clone());
    store.create_new().expect("create should succeed");
    store.set_name("Vex");

    let first = sync.push(&mut store).await.expect("first save");
    assert!(first.created);
    assert_eq!(store.remote_id(), Some(&first.remote_id));
    assert!(!store.is_dirty());

    store.set_level(2);
    let second = sync.push(&mut store).await.expect("second save");
    assert!(!second.created);
    assert_eq!(second.remote_id, first.remote_id);

    assert_eq!(remote.create_count(), 1);
    assert_eq!(remote.update_count(), 1);
    let records = remote.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Vex");
    let doc = decode_document(&records[0].data).expect("payload decodes");
    assert_eq!(doc.basic_info.level, 2);
}

#[tokio::test]
async fn test_save_without_open_character() {
    let (_, remote, mut store) = setup();
    let sync = CloudSync::new(remote.clone());

    let err = sync.push(&mut store).await.unwrap_err();
    assert!(matches!(err, SyncError::NotOpen));
    assert_eq!(remote.create_count(), 0);
}

#[tokio::test]
async fn test_failed_save_leaves_state() {
    let (_, remote, mut store) = setup();
    let sync = CloudSync::new(remote.clone());
    store.create_new().expect("create should succeed");
    store.set_ability(Ability::Strength, 15);
    let before = store.document();

    remote.fail_next(sheet_api::Error::Network("connection refused".to_string()));
    let err = sync.push(&mut store).await.unwrap_err();

    assert!(matches!(err, SyncError::Remote(_)));
    assert!(store.is_dirty());
    assert_eq!(store.remote_id(), None);
    assert_eq!(*store.document(), *before);
}

#[tokio::test]
async fn test_unauthorized_logs_out() {
    let (_, remote, mut store) = setup();
    let auth = Arc::new(AuthSession::in_memory());
    auth.store(login_response()).expect("store session");
    let sync = CloudSync::new(remote.clone()).with_auth(auth.clone());
    store.create_new().expect("create should succeed");
    store.set_name("Vex");

    remote.fail_next(sheet_api::Error::Unauthorized);
    let err = sync.push(&mut store).await.unwrap_err();

    assert!(matches!(err, SyncError::Unauthorized));
    assert!(!auth.is_authenticated());
    assert!(auth.token().is_none());
    assert!(store.is_dirty());
}

#[tokio::test]
async fn test_edit_during_save_stays_dirty() {
    let (_, remote, mut store) = setup();
    let sync = CloudSync::new(remote.clone());
    store.create_new().expect("create should succeed");
    store.set_name("Vex");

    let snapshot = store.cloud_snapshot().expect("snapshot");
    store.set_level(3);
    let saved = sync.save(snapshot).await.expect("save");

    assert!(store.complete_cloud_save(&saved));
    assert_eq!(store.remote_id(), Some(&saved.remote_id));
    assert!(store.is_dirty());
}

#[tokio::test]
async fn test_completion_after_switching_links_stored_copy() {
    let (backend, remote, mut store) = setup();
    let sync = CloudSync::new(remote.clone());
    let first = store.create_new().expect("create should succeed");

    let snapshot = store.cloud_snapshot().expect("snapshot");
    let saved = sync.save(snapshot).await.expect("save");

    store.create_new().expect("create should succeed");
    assert!(!store.complete_cloud_save(&saved));
    assert_eq!(store.remote_id(), None);

    // The character that was saved remembers its cloud record.
    let stored = backend.get(first).expect("first character stored");
    assert_eq!(stored.remote_id, Some(saved.remote_id.clone()));

    assert!(store.load_from_local(first).expect("load"));
    store.set_name("Later");
    let again = sync.push(&mut store).await.expect("second save");
    assert_eq!(again.remote_id, saved.remote_id);
    assert_eq!(remote.create_count(), 1);
    assert_eq!(remote.update_count(), 1);
}

#[tokio::test]
async fn test_second_save_while_in_flight_is_refused() {
    let (_, _, mut store) = setup();
    let remote = Arc::new(MemoryRemote::gated());
    let sync = CloudSync::new(remote.clone());
    store.create_new().expect("create should succeed");
    let snapshot = store.cloud_snapshot().expect("snapshot");

    let (first, second) = tokio::join!(sync.save(snapshot.clone()), async {
        let result = sync.save(snapshot.clone()).await;
        remote.release();
        result
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(SyncError::InFlight)));
    assert_eq!(remote.create_count(), 1);
    assert!(!sync.is_saving());
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn test_pull_assigns_local_id_and_keeps_remote_link() {
    let (backend, remote, mut store) = setup();
    let sync = CloudSync::new(remote.clone());
    let remote_id = remote.insert("Elara", &sample_wizard("Elara"));

    let local_id = sync.pull(&mut store, &remote_id).await.expect("pull");

    assert_ne!(local_id.to_string(), remote_id);
    assert_eq!(store.remote_id(), Some(&RemoteId(remote_id.clone())));
    assert_eq!(store.doc().spellcasting.spell_save_dc, 15);
    assert!(!store.is_dirty());

    // The local copy remembers its cloud record.
    let saved = backend.get(local_id).expect("local copy");
    assert_eq!(saved.remote_id, Some(RemoteId(remote_id.clone())));

    // Saving again updates the same cloud record.
    store.set_level(6);
    let result = sync.push(&mut store).await.expect("save");
    assert_eq!(result.remote_id, RemoteId(remote_id));
    assert_eq!(remote.create_count(), 0);
    assert_eq!(remote.update_count(), 1);
}

#[tokio::test]
async fn test_reopened_local_copy_updates_cloud_record() {
    let (backend, remote, mut store) = setup();
    let sync = CloudSync::new(remote.clone());
    let id = store.create_new().expect("create should succeed");
    sync.push(&mut store).await.expect("first save");
    store.flush().expect("flush");

    let mut reopened = CharacterStore::new(backend.clone(), Arc::new(FixedClock::default()));
    assert!(reopened.load_from_local(id).expect("load"));
    reopened.set_name("Renamed");
    sync.push(&mut reopened).await.expect("second save");

    assert_eq!(remote.create_count(), 1);
    assert_eq!(remote.update_count(), 1);
    assert_eq!(remote.records()[0].name, "Renamed");
}

#[tokio::test]
async fn test_pull_missing_record() {
    let (_, remote, mut store) = setup();
    let sync = CloudSync::new(remote.clone());

    let err = sync.pull(&mut store, "remote-404").await.unwrap_err();
    assert!(matches!(err, SyncError::NotFound(_)));
    assert_eq!(store.local_id(), None);
}

#[tokio::test]
async fn test_list_and_delete() {
    let (_, remote, _) = setup();
    let sync = CloudSync::new(remote.clone());
    let a = remote.insert("A", &sample_wizard("A"));
    remote.insert("B", &sample_wizard("B"));

    assert_eq!(sync.list().await.expect("list").len(), 2);
    sync.delete(&a).await.expect("delete");
    assert_eq!(sync.list().await.expect("list").len(), 1);
    assert!(matches!(sync.delete(&a).await, Err(SyncError::NotFound(_))));
}
