use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use slidelink_common::network::endpoint::Endpoint;
use slidelink_common::store::MemoryStore;
use slidelink_core::session::{Session, SessionConfig, SessionObserver, SessionState};
use slidelink_protocols::{Command, InboundFrame};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::server::MockServer;

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Open(Endpoint),
    Close,
    Error(String),
    Message(InboundFrame),
}

struct Events(mpsc::UnboundedSender<Event>);

impl SessionObserver for Events {
    fn on_open(&self, endpoint: Endpoint) {
        let _ = self.0.send(Event::Open(endpoint));
    }
    fn on_close(&self) {
        let _ = self.0.send(Event::Close);
    }
    fn on_error(&self, cause: String) {
        let _ = self.0.send(Event::Error(cause));
    }
    fn on_message(&self, frame: InboundFrame) {
        let _ = self.0.send(Event::Message(frame));
    }
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no session event in time")
        .expect("observer dropped")
}

/// A session already open against a fresh mock server.
async fn open_session() -> (MockServer, Session, mpsc::UnboundedReceiver<Event>) {
    open_session_with_keepalive(Duration::from_secs(30)).await
}

async fn open_session_with_keepalive(
    keepalive_interval: Duration,
) -> (MockServer, Session, mpsc::UnboundedReceiver<Event>) {
    let server = MockServer::start().await.unwrap();
    let (tx, mut events) = mpsc::unbounded_channel();
    let config = SessionConfig {
        connect_timeout: Duration::from_secs(2),
        keepalive_interval,
    };
    let mut session = Session::new(config, Arc::new(MemoryStore::new()), Arc::new(Events(tx)));

    session.open(server.endpoint());
    assert_eq!(next_event(&mut events).await, Event::Open(server.endpoint()));
    assert_eq!(session.state(), SessionState::Open);
    (server, session, events)
}

#[tokio::test]
async fn ping_is_echoed_with_identical_token() {
    let (mut server, _session, _events) = open_session().await;

    server.push(r#"{"ping":"k-42"}"#);
    assert_eq!(server.next_frame().await, Some(json!({ "pong": "k-42" })));

    server.push(r#"{"ping":{"seq":7,"sent":"12:00:01"}}"#);
    assert_eq!(
        server.next_frame().await,
        Some(json!({ "pong": { "seq": 7, "sent": "12:00:01" } }))
    );
}

#[tokio::test]
async fn ping_is_answered_despite_mistyped_fields() {
    let (mut server, session, _events) = open_session().await;

    server.push(r#"{"ping":1,"server_shutdown":null,"status":3}"#);
    assert_eq!(server.next_frame().await, Some(json!({ "pong": 1 })));
    assert_eq!(session.state(), SessionState::Open);
}

#[tokio::test]
async fn pong_goes_out_before_later_commands() {
    let (mut server, session, mut events) = open_session().await;

    server.push(r#"{"ping":99}"#);
    match next_event(&mut events).await {
        Event::Message(frame) => assert_eq!(frame.ping, Some(json!(99))),
        other => panic!("expected the ping frame, got {other:?}"),
    }
    assert!(session.send(&Command::NextSlide));

    assert_eq!(server.next_frame().await, Some(json!({ "pong": 99 })));
    assert_eq!(server.next_frame().await, Some(json!({ "command": "NEXT_SLIDE" })));
}

#[tokio::test]
async fn malformed_frames_are_skipped() {
    let (server, session, mut events) = open_session().await;

    server.push("this is not json");
    server.push("[1, 2, 3]");
    server.push(r#"{"status":"Slide 3 of 10"}"#);

    match next_event(&mut events).await {
        Event::Message(frame) => assert_eq!(frame.status.as_deref(), Some("Slide 3 of 10")),
        other => panic!("expected the status frame, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Open);
}

#[tokio::test]
async fn server_shutdown_closes_without_local_close() {
    let (server, session, mut events) = open_session().await;

    server.push(r#"{"server_shutdown":true}"#);
    loop {
        match next_event(&mut events).await {
            Event::Close => break,
            Event::Message(frame) => assert!(frame.server_shutdown),
            other => panic!("unexpected {other:?}"),
        }
    }

    let mut states = session.subscribe_state();
    timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == SessionState::Closed),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!session.send(&Command::NextSlide));
}

#[tokio::test]
async fn server_close_handshake_ends_session() {
    let (server, session, mut events) = open_session().await;

    server.close();
    assert_eq!(next_event(&mut events).await, Event::Close);

    let mut states = session.subscribe_state();
    timeout(
        Duration::from_secs(5),
        states.wait_for(|state| *state == SessionState::Closed),
    )
    .await
    .unwrap()
    .unwrap();
}

#[tokio::test]
async fn local_close_reports_close_once() {
    let (_server, mut session, mut events) = open_session().await;

    session.close();
    session.close();
    assert_eq!(next_event(&mut events).await, Event::Close);

    session.join().await;
    assert_eq!(session.state(), SessionState::Closed);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn keepalive_pings_while_open_and_stops_after_close() {
    let interval = Duration::from_millis(100);
    let (mut server, mut session, mut events) = open_session_with_keepalive(interval).await;

    let first = server.next_ping().await.expect("no keep-alive ping while open");
    let second = server.next_ping().await.expect("keep-alive did not repeat");
    assert_eq!(first.len(), 8);
    assert_eq!(second.len(), 8);
    assert_eq!(session.state(), SessionState::Open);

    session.close();
    assert_eq!(next_event(&mut events).await, Event::Close);
    session.join().await;

    // Let pings sent before the close reach the server, then expect silence.
    tokio::time::sleep(interval * 4).await;
    server.drain_pings();
    tokio::time::sleep(interval * 4).await;
    assert_eq!(server.drain_pings(), 0);
}
