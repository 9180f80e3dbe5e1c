use std::sync::Arc;
use std::time::Duration;

use slidelink_common::store::{FileStore, KeyValueStore, LAST_ENDPOINT_KEY, StoreError};
use slidelink_core::control::{ConnectionEvent, RemoteControl};
use slidelink_core::probe::TcpProber;
use slidelink_core::session::SessionConfig;

use crate::server::MockServer;

#[test]
fn values_survive_reopening() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");

    let store = FileStore::open(&path).unwrap();
    store.set(LAST_ENDPOINT_KEY, "192.168.1.20:10696").unwrap();
    store.set("other", "value").unwrap();
    store.remove("other").unwrap();
    drop(store);

    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.get(LAST_ENDPOINT_KEY).as_deref(), Some("192.168.1.20:10696"));
    assert_eq!(reopened.get("other"), None);
}

#[test]
fn corrupt_state_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(FileStore::open(&path), Err(StoreError::Corrupt(_))));
}

#[tokio::test]
async fn successful_session_is_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let server = MockServer::start().await.unwrap();

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&path).unwrap());
    let mut control = RemoteControl::new(Arc::new(TcpProber), store, SessionConfig::default());
    let mut events = control.subscribe_connection();
    control.connect(server.endpoint());
    let opened = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(opened, ConnectionEvent::Opened(server.endpoint()));

    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(
        reopened.get(LAST_ENDPOINT_KEY),
        Some(server.endpoint().to_string())
    );
}
