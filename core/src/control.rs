//! The façade collaborators drive: one scanner, one session and one timer,
//! with their events fanned out over broadcast channels.

use std::sync::Arc;

use slidelink_common::config::Config;
use slidelink_common::network::endpoint::Endpoint;
use slidelink_common::network::prefix::Ipv4Prefix;
use slidelink_common::store::KeyValueStore;
use slidelink_protocols::{Command, InboundFrame};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::probe::{HandshakeProber, Liveness, Prober, TcpProber};
use crate::scanner::{Phase, PrefixSource, ScanConfig, ScanHandle, ScanObserver, ScanOutcome, Scanner};
use crate::session::{Session, SessionConfig, SessionObserver, SessionState};
use crate::timer::{TimerMode, TimerReconciler, TimerSnapshot};

const SCAN_CHANNEL_CAPACITY: usize = 512;
const CONNECTION_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Phase(Phase),
    LastKnown(Endpoint, Liveness),
    Progress(u8),
    Found(Endpoint),
    Finished(ScanOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    Opened(Endpoint),
    Closed,
    Error(String),
    Status(String),
    Message(InboundFrame),
}

struct ScanForwarder {
    events: broadcast::Sender<ScanEvent>,
}

impl ScanForwarder {
    // No subscribers is fine.
    fn forward(&self, event: ScanEvent) {
        let _ = self.events.send(event);
    }
}

impl ScanObserver for ScanForwarder {
    fn on_phase(&self, phase: Phase) {
        self.forward(ScanEvent::Phase(phase));
    }

    fn on_last_known(&self, endpoint: Endpoint, liveness: Liveness) {
        self.forward(ScanEvent::LastKnown(endpoint, liveness));
    }

    fn on_progress(&self, percent: u8) {
        self.forward(ScanEvent::Progress(percent));
    }

    fn on_found(&self, endpoint: Endpoint) {
        self.forward(ScanEvent::Found(endpoint));
    }

    fn on_complete(&self, outcome: &ScanOutcome) {
        self.forward(ScanEvent::Finished(outcome.clone()));
    }
}

/// Routes inbound traffic to the timer and republishes it.
struct SessionRouter {
    events: broadcast::Sender<ConnectionEvent>,
    timer: Arc<TimerReconciler>,
}

impl SessionRouter {
    fn forward(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }
}

impl SessionObserver for SessionRouter {
    fn on_open(&self, endpoint: Endpoint) {
        self.forward(ConnectionEvent::Opened(endpoint));
    }

    fn on_close(&self) {
        self.forward(ConnectionEvent::Closed);
    }

    fn on_error(&self, cause: String) {
        self.forward(ConnectionEvent::Error(cause));
    }

    fn on_message(&self, frame: InboundFrame) {
        if let Some(status) = &frame.status {
            if self.timer.apply_status(status) {
                debug!("timer status applied: {status}");
            }
            self.forward(ConnectionEvent::Status(status.clone()));
        }
        if let Some(payload) = &frame.timer {
            self.timer.apply_timer(payload);
        }
        self.forward(ConnectionEvent::Message(frame));
    }
}

pub struct RemoteControl {
    scanner: Scanner,
    session: Session,
    timer: Arc<TimerReconciler>,
    scan_events: broadcast::Sender<ScanEvent>,
    connection_events: broadcast::Sender<ConnectionEvent>,
}

impl RemoteControl {
    pub fn new(
        prober: Arc<dyn Prober>,
        store: Arc<dyn KeyValueStore>,
        session_config: SessionConfig,
    ) -> Self {
        let (scan_events, _) = broadcast::channel(SCAN_CHANNEL_CAPACITY);
        let (connection_events, _) = broadcast::channel(CONNECTION_CHANNEL_CAPACITY);
        let timer = Arc::new(TimerReconciler::new(TimerMode::Local));

        let router = Arc::new(SessionRouter {
            events: connection_events.clone(),
            timer: Arc::clone(&timer),
        });

        Self {
            scanner: Scanner::new(prober, Arc::clone(&store)),
            session: Session::new(session_config, store, router),
            timer,
            scan_events,
            connection_events,
        }
    }

    /// Wires the probe strategy and session limits the way `config` asks.
    pub fn from_config(config: &Config, store: Arc<dyn KeyValueStore>) -> Self {
        let prober: Arc<dyn Prober> = match config.handshake_probe {
            true => Arc::new(HandshakeProber),
            false => Arc::new(TcpProber),
        };
        Self::new(prober, store, SessionConfig::from(config))
    }

    pub fn with_prefix_source(mut self, source: PrefixSource) -> Self {
        self.scanner = self.scanner.with_prefix_source(source);
        self
    }

    /// Cancels any running scan and starts a new one.
    pub fn start_scan(&mut self, config: ScanConfig) -> ScanHandle {
        let forwarder = Arc::new(ScanForwarder {
            events: self.scan_events.clone(),
        });
        self.scanner.scan(config, forwarder)
    }

    pub fn cancel_scan(&mut self) {
        self.scanner.cancel();
    }

    pub fn planned_prefixes(&self, config: &ScanConfig) -> Vec<Ipv4Prefix> {
        self.scanner.planned_prefixes(config)
    }

    pub fn connect(&mut self, endpoint: Endpoint) {
        self.session.open(endpoint);
    }

    pub fn disconnect(&mut self) {
        self.session.close();
    }

    /// Sends `command` over the open session. In local timer mode a timer
    /// command that went out also drives the local timer.
    pub fn send_command(&self, command: &Command) -> bool {
        let sent = self.session.send(command);
        if sent && self.timer.mode() == TimerMode::Local {
            match command {
                Command::TimerStart => self.timer.start(),
                Command::TimerStop => self.timer.stop(),
                Command::TimerReset => self.timer.reset(),
                _ => {}
            }
        }
        sent
    }

    pub fn timer(&self) -> &TimerReconciler {
        &self.timer
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn subscribe_session_state(&self) -> watch::Receiver<SessionState> {
        self.session.subscribe_state()
    }

    pub fn subscribe_scan(&self) -> broadcast::Receiver<ScanEvent> {
        self.scan_events.subscribe()
    }

    pub fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.connection_events.subscribe()
    }

    pub fn subscribe_timer(&self) -> watch::Receiver<TimerSnapshot> {
        self.timer.subscribe()
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use slidelink_common::store::MemoryStore;
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    struct NothingLive;

    #[async_trait]
    impl Prober for NothingLive {
        async fn probe(&self, _endpoint: Endpoint, _timeout: Duration) -> Liveness {
            Liveness::Dead
        }
    }

    fn control() -> RemoteControl {
        RemoteControl::new(
            Arc::new(NothingLive),
            Arc::new(MemoryStore::new()),
            SessionConfig::default(),
        )
        .with_prefix_source(Arc::new(Vec::<Ipv4Prefix>::new))
    }

    #[tokio::test]
    async fn scan_events_are_broadcast() {
        let mut control = control();
        let mut events = control.subscribe_scan();
        let config = ScanConfig {
            hosts: vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))],
            derive_prefixes: false,
            ..ScanConfig::default()
        };

        let outcome = control.start_scan(config).wait().await.unwrap();
        assert_eq!(outcome, ScanOutcome::Completed(Vec::new()));

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert_eq!(
            received,
            vec![
                ScanEvent::Phase(Phase::Common),
                ScanEvent::Progress(99),
                ScanEvent::Progress(100),
                ScanEvent::Finished(ScanOutcome::Completed(Vec::new())),
            ]
        );
    }

    #[tokio::test]
    async fn timer_commands_need_an_open_session() {
        let control = control();
        assert!(!control.send_command(&Command::TimerStart));
        assert!(!control.timer().snapshot().running);
    }

    #[tokio::test]
    async fn router_feeds_remote_timer_and_republishes() {
        let (events, mut rx) = broadcast::channel(8);
        let timer = Arc::new(TimerReconciler::new(TimerMode::Remote));
        let router = SessionRouter {
            events,
            timer: Arc::clone(&timer),
        };

        let frame = InboundFrame::decode(r#"{"status": "Tempo decorrido: 00:00:09"}"#).unwrap();
        router.on_message(frame.clone());

        assert_eq!(timer.snapshot().seconds, 9);
        assert_eq!(
            rx.try_recv().unwrap(),
            ConnectionEvent::Status("Tempo decorrido: 00:00:09".into())
        );
        assert_eq!(rx.try_recv().unwrap(), ConnectionEvent::Message(frame));
    }

    #[tokio::test]
    async fn router_applies_timer_objects() {
        let (events, _rx) = broadcast::channel(8);
        let timer = Arc::new(TimerReconciler::new(TimerMode::Remote));
        let router = SessionRouter {
            events,
            timer: Arc::clone(&timer),
        };

        router.on_message(InboundFrame::decode(r#"{"timer": {"value": 75, "active": true}}"#).unwrap());

        let snapshot = timer.snapshot();
        assert_eq!(snapshot.elapsed, "00:01:15");
        assert!(snapshot.running);
    }
}
