use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use slidelink_common::network::endpoint::Endpoint;
use slidelink_common::store::{KeyValueStore, LAST_ENDPOINT_KEY, LAST_PREFIX_KEY, MemoryStore};
use slidelink_core::control::{ConnectionEvent, RemoteControl};
use slidelink_core::probe::TcpProber;
use slidelink_core::session::{SessionConfig, SessionState};
use slidelink_core::timer::TimerMode;
use slidelink_protocols::Command;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;

use crate::server::MockServer;

fn remote_control(store: Arc<dyn KeyValueStore>) -> RemoteControl {
    let config = SessionConfig {
        connect_timeout: Duration::from_secs(2),
        keepalive_interval: Duration::from_secs(30),
    };
    RemoteControl::new(Arc::new(TcpProber), store, config)
}

/// Waits for the first event `pick` accepts, skipping the rest.
async fn wait_event<T>(
    events: &mut broadcast::Receiver<ConnectionEvent>,
    mut pick: impl FnMut(ConnectionEvent) -> Option<T>,
) -> T {
    timeout(Duration::from_secs(5), async {
        loop {
            if let Some(found) = pick(events.recv().await.expect("event channel closed")) {
                return found;
            }
        }
    })
    .await
    .expect("event never arrived")
}

async fn connected(
    server: &MockServer,
    control: &mut RemoteControl,
) -> broadcast::Receiver<ConnectionEvent> {
    let mut events = control.subscribe_connection();
    control.connect(server.endpoint());
    let opened = wait_event(&mut events, |event| match event {
        ConnectionEvent::Opened(endpoint) => Some(endpoint),
        _ => None,
    })
    .await;
    assert_eq!(opened, server.endpoint());
    events
}

#[tokio::test]
async fn commands_reach_the_server_and_endpoint_is_remembered() {
    let mut server = MockServer::start().await.unwrap();
    let store = Arc::new(MemoryStore::new());
    let mut control = remote_control(store.clone());
    let _events = connected(&server, &mut control).await;

    assert!(control.send_command(&Command::NextSlide));
    assert!(control.send_command(&Command::GotoSlide(4)));
    assert!(control.send_command(&Command::SkipSlides(-2)));

    assert_eq!(server.next_frame().await, Some(json!({ "command": "NEXT_SLIDE" })));
    assert_eq!(
        server.next_frame().await,
        Some(json!({ "command": "GOTO_SLIDE", "number": 4 }))
    );
    assert_eq!(
        server.next_frame().await,
        Some(json!({ "command": "SKIP_SLIDES", "count": -2 }))
    );

    assert_eq!(store.get(LAST_ENDPOINT_KEY), Some(server.endpoint().to_string()));
    assert_eq!(store.get(LAST_PREFIX_KEY).as_deref(), Some("127.0.0"));
}

#[tokio::test]
async fn remote_mode_follows_server_timer() {
    let server = MockServer::start().await.unwrap();
    let mut control = remote_control(Arc::new(MemoryStore::new()));
    control.timer().set_mode(TimerMode::Remote);
    let mut events = connected(&server, &mut control).await;

    server.push(r#"{"status":"Tempo decorrido: 00:01:05"}"#);
    let status = wait_event(&mut events, |event| match event {
        ConnectionEvent::Status(text) => Some(text),
        _ => None,
    })
    .await;
    assert_eq!(status, "Tempo decorrido: 00:01:05");
    assert_eq!(control.timer().snapshot().seconds, 65);
    assert!(control.timer().snapshot().running);

    server.push(r#"{"timer":{"value":"00:02:00","active":true}}"#);
    wait_event(&mut events, |event| match event {
        ConnectionEvent::Message(frame) if frame.timer.is_some() => Some(()),
        _ => None,
    })
    .await;

    let snapshot = control.timer().snapshot();
    assert_eq!(snapshot.elapsed, "00:02:00");
    assert!(snapshot.running);
    assert_eq!(snapshot.source, TimerMode::Remote);
}

#[tokio::test]
async fn oversized_elapsed_status_leaves_session_usable() {
    let mut server = MockServer::start().await.unwrap();
    let mut control = remote_control(Arc::new(MemoryStore::new()));
    control.timer().set_mode(TimerMode::Remote);
    let mut events = connected(&server, &mut control).await;

    server.push(r#"{"status":"Tempo decorrido: 00:00:30"}"#);
    server.push(r#"{"status":"elapsed: 9999999999999999:00:00"}"#);
    server.push(r#"{"status":"after"}"#);
    let status = wait_event(&mut events, |event| match event {
        ConnectionEvent::Status(text) if text == "after" => Some(text),
        _ => None,
    })
    .await;
    assert_eq!(status, "after");
    assert_eq!(control.session_state(), SessionState::Open);
    assert_eq!(control.timer().snapshot().seconds, 30);

    assert!(control.send_command(&Command::NextSlide));
    assert_eq!(server.next_frame().await, Some(json!({ "command": "NEXT_SLIDE" })));
}

#[tokio::test]
async fn local_mode_runs_on_sent_commands_only() {
    let mut server = MockServer::start().await.unwrap();
    let mut control = remote_control(Arc::new(MemoryStore::new()));
    let mut events = connected(&server, &mut control).await;

    assert!(control.send_command(&Command::TimerStart));
    assert_eq!(server.next_frame().await, Some(json!({ "command": "TIMER_START" })));
    assert!(control.timer().snapshot().running);

    server.push(r#"{"status":"Timer stopped"}"#);
    wait_event(&mut events, |event| match event {
        ConnectionEvent::Status(_) => Some(()),
        _ => None,
    })
    .await;
    assert!(control.timer().snapshot().running);

    assert!(control.send_command(&Command::TimerStop));
    assert!(!control.timer().snapshot().running);
}

#[tokio::test]
async fn refused_connection_reports_one_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = Endpoint::from(listener.local_addr().unwrap());
    drop(listener);

    let mut control = remote_control(Arc::new(MemoryStore::new()));
    let mut events = control.subscribe_connection();
    control.connect(endpoint);

    let cause = wait_event(&mut events, |event| match event {
        ConnectionEvent::Error(cause) => Some(cause),
        _ => None,
    })
    .await;
    assert!(cause.starts_with("handshake failed"), "{cause}");
    assert_eq!(control.session_state(), SessionState::Failed);
    assert!(!control.send_command(&Command::NextSlide));
    assert!(!control.timer().snapshot().running);
}

#[tokio::test]
async fn disconnect_closes_and_refuses_further_commands() {
    let server = MockServer::start().await.unwrap();
    let mut control = remote_control(Arc::new(MemoryStore::new()));
    let mut events = connected(&server, &mut control).await;

    control.disconnect();
    wait_event(&mut events, |event| (event == ConnectionEvent::Closed).then_some(())).await;

    let mut states = control.subscribe_session_state();
    timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == SessionState::Closed),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!control.send_command(&Command::NextSlide));
}
