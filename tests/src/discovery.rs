use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use slidelink_common::network::endpoint::Endpoint;
use slidelink_common::network::prefix::Ipv4Prefix;
use slidelink_common::store::{KeyValueStore, LAST_ENDPOINT_KEY, MemoryStore};
use slidelink_core::control::{RemoteControl, ScanEvent};
use slidelink_core::probe::{self, HandshakeProber, Liveness, Prober, TcpProber};
use slidelink_core::scanner::{ScanConfig, ScanObserver, ScanOutcome, Scanner};
use slidelink_core::session::SessionConfig;
use tokio::net::TcpListener;
use tokio::time::timeout;

use crate::server::MockServer;

#[derive(Default)]
struct Collector {
    progress: Mutex<Vec<u8>>,
    found: Mutex<Vec<Endpoint>>,
}

impl ScanObserver for Collector {
    fn on_progress(&self, percent: u8) {
        self.progress.lock().unwrap().push(percent);
    }
    fn on_found(&self, endpoint: Endpoint) {
        self.found.lock().unwrap().push(endpoint);
    }
    fn on_complete(&self, _outcome: &ScanOutcome) {}
}

/// Only 127.0.0.1 on `port`, nothing derived from the machine.
fn loopback_only(port: u16) -> ScanConfig {
    ScanConfig {
        prefixes: vec![Ipv4Prefix::new(127, 0, 0)],
        hosts: Vec::new(),
        derive_prefixes: false,
        port,
        probe_timeout: Duration::from_millis(300),
        max_in_flight: 4,
        deadline: Duration::from_secs(10),
        common_octets: vec![1],
        sweep: false,
        first_match: false,
        use_last_known: false,
    }
}

fn scanner(prober: Arc<dyn Prober>, store: Arc<dyn KeyValueStore>) -> Scanner {
    Scanner::new(prober, store).with_prefix_source(Arc::new(Vec::<Ipv4Prefix>::new))
}

fn loopback(port: u16) -> Endpoint {
    Endpoint::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
}

#[tokio::test]
async fn probe_tells_listening_from_closed() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let live = Endpoint::from(listener.local_addr().unwrap());
    assert_eq!(probe::probe(live, Duration::from_millis(500)).await, Liveness::Live);

    drop(listener);
    assert_eq!(probe::probe(live, Duration::from_millis(500)).await, Liveness::Dead);
}

#[tokio::test]
async fn loopback_listener_is_discovered() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let collector = Arc::new(Collector::default());
    let mut scanner = scanner(Arc::new(TcpProber), Arc::new(MemoryStore::new()));
    let outcome = scanner
        .scan(loopback_only(port), collector.clone())
        .wait()
        .await
        .expect("scan was not cancelled");

    assert_eq!(outcome, ScanOutcome::Completed(vec![loopback(port)]));
    assert_eq!(*collector.found.lock().unwrap(), vec![loopback(port)]);
    assert_eq!(collector.progress.lock().unwrap().last(), Some(&100));
}

#[tokio::test]
async fn handshake_prober_only_counts_the_service() {
    let server = MockServer::start().await.unwrap();
    let plain = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let plain = Endpoint::from(plain.local_addr().unwrap());

    let limit = Duration::from_secs(2);
    assert_eq!(HandshakeProber.probe(server.endpoint(), limit).await, Liveness::Live);
    assert_eq!(HandshakeProber.probe(plain, limit).await, Liveness::Dead);
}

#[tokio::test]
async fn remembered_host_is_tried_first() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let store = Arc::new(MemoryStore::new());
    store.set(LAST_ENDPOINT_KEY, "127.0.0.1:1").unwrap();

    let mut config = loopback_only(port);
    config.use_last_known = true;
    config.prefixes = vec![Ipv4Prefix::new(10, 255, 255)];

    let mut scanner = scanner(Arc::new(TcpProber), store);
    let outcome = scanner
        .scan(config, Arc::new(Collector::default()))
        .wait()
        .await
        .unwrap();

    // The stored port is replaced by the configured one.
    assert_eq!(outcome.found(), &[loopback(port)]);
}

/// Answers `Live` only for the listed addresses, instantly.
struct LiveSet(Vec<IpAddr>);

#[async_trait::async_trait]
impl Prober for LiveSet {
    async fn probe(&self, endpoint: Endpoint, _timeout: Duration) -> Liveness {
        match self.0.contains(&endpoint.addr) {
            true => Liveness::Live,
            false => Liveness::Dead,
        }
    }
}

#[tokio::test]
async fn facade_reports_dead_last_known_then_sweep_result() {
    let dead = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));
    let live = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 42));

    let store = Arc::new(MemoryStore::new());
    store.set(LAST_ENDPOINT_KEY, "10.0.0.5:10696").unwrap();

    let mut control = RemoteControl::new(
        Arc::new(LiveSet(vec![live])),
        store,
        SessionConfig::default(),
    )
    .with_prefix_source(Arc::new(Vec::<Ipv4Prefix>::new));
    let mut events = control.subscribe_scan();

    let config = ScanConfig {
        prefixes: vec![Ipv4Prefix::new(10, 0, 0)],
        derive_prefixes: false,
        max_in_flight: 32,
        ..ScanConfig::default()
    };
    let _scan = control.start_scan(config);

    let mut received = Vec::new();
    let outcome = timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await.unwrap() {
                ScanEvent::Finished(outcome) => return outcome,
                event => received.push(event),
            }
        }
    })
    .await
    .unwrap();

    let port = ScanConfig::default().port;
    assert!(received.contains(&ScanEvent::LastKnown(Endpoint::new(dead, port), Liveness::Dead)));
    assert_eq!(
        received
            .iter()
            .filter(|event| **event == ScanEvent::Found(Endpoint::new(live, port)))
            .count(),
        1
    );
    assert_eq!(outcome, ScanOutcome::Completed(vec![Endpoint::new(live, port)]));
}
