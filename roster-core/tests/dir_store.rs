//! DirStore behaviour through the async `RegistryStore` seam.

use assert_fs::prelude::*;
use chrono::{Duration, TimeZone, Utc};
use predicates::prelude::*;
use roster_core::{
    health, CommitMessage, DirStore, NodeName, PeerRecord, RegistrationFile, RegistryStore,
    StoreError,
};

fn registration(name: &str, message: CommitMessage, age_secs: i64) -> RegistrationFile {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    RegistrationFile::for_node(&NodeName::from(name), message, now - Duration::seconds(age_secs))
}

// ---------------------------------------------------------------------------
// 1. Publish and read back
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_returns_records_in_file_name_order() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let store = DirStore::new(root.path());

    for name in ["node-c", "node-a", "node-b"] {
        store
            .create_file(&registration(name, CommitMessage::InitialRegistration, 0))
            .await
            .expect("create");
    }

    let files = store.list_files().await.expect("list");
    assert_eq!(files, vec!["node-a.json", "node-b.json", "node-c.json"]);

    let urls: Vec<String> = store
        .fetch_files()
        .await
        .expect("fetch")
        .into_iter()
        .map(|record| record.url)
        .collect();
    assert_eq!(urls, vec!["https://node-a", "https://node-b", "https://node-c"]);
}

#[tokio::test]
async fn written_record_is_plain_peer_record_json() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let store = DirStore::new(root.path());
    store
        .create_file(&registration("node-a", CommitMessage::InitialRegistration, 0))
        .await
        .expect("create");

    root.child("node-a.json")
        .assert(predicate::str::contains("\"lastSeen\""))
        .assert(predicate::str::contains("https://node-a"))
        .assert(predicate::str::contains("Initial registration").not());
}

#[tokio::test]
async fn records_written_by_hand_are_readable() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    root.child("peer.json")
        .write_str(r#"{"url":"https://peer","lastSeen":"2024-03-01T08:59:00Z"}"#)
        .expect("write");

    let records = DirStore::new(root.path()).fetch_files().await.expect("fetch");
    assert_eq!(
        records,
        vec![PeerRecord {
            url: "https://peer".to_string(),
            last_seen: Utc.with_ymd_and_hms(2024, 3, 1, 8, 59, 0).unwrap(),
        }]
    );
}

// ---------------------------------------------------------------------------
// 2. Failure modes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_corrupt_record_fails_the_whole_fetch() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let store = DirStore::new(root.path());
    store
        .create_file(&registration("node-a", CommitMessage::InitialRegistration, 0))
        .await
        .expect("create");
    root.child("node-b.json").write_str("{ not json").expect("write");

    let err = store.fetch_files().await.unwrap_err();
    assert!(matches!(err, StoreError::Decode { .. }), "got: {err}");
    assert!(err.to_string().contains("node-b.json"));
}

#[tokio::test]
async fn second_create_conflicts_and_update_succeeds() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let store = DirStore::new(root.path());
    store
        .create_file(&registration("node-a", CommitMessage::InitialRegistration, 60))
        .await
        .expect("create");

    let err = store
        .create_file(&registration("node-a", CommitMessage::InitialRegistration, 0))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }), "got: {err}");

    let fresh = registration("node-a", CommitMessage::UpdatedRegistration, 0);
    store.update_file(&fresh).await.expect("update");
    assert_eq!(store.fetch_files().await.expect("fetch"), vec![fresh.content]);
}

// ---------------------------------------------------------------------------
// 3. Staleness over stored records
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_filter_over_fetched_records() {
    let root = assert_fs::TempDir::new().expect("tempdir");
    let store = DirStore::new(root.path());
    store
        .create_file(&registration("a", CommitMessage::InitialRegistration, 10))
        .await
        .expect("create a");
    store
        .create_file(&registration("b", CommitMessage::InitialRegistration, 120))
        .await
        .expect("create b");

    let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    let healthy = health::filter_healthy(
        store.fetch_files().await.expect("fetch"),
        now,
        std::time::Duration::from_secs(60),
    );
    assert_eq!(healthy.len(), 1);
    assert_eq!(healthy[0].url, "https://a");
}
