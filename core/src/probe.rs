//! Liveness probes.
//!
//! A probe answers one question: does `endpoint` accept a connection within
//! `timeout`? Every failure mode (refused, unreachable, timeout) collapses to
//! [`Liveness::Dead`]. There are no retries; the scanner relies on fan-out
//! instead of per-address robustness.

use std::time::Duration;

use async_trait::async_trait;
use slidelink_common::network::endpoint::Endpoint;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Live,
    Dead,
}

impl Liveness {
    pub fn is_live(self) -> bool {
        self == Liveness::Live
    }
}

/// Defines the strategy for checking a single endpoint.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, endpoint: Endpoint, timeout: Duration) -> Liveness;
}

/// Live if the TCP handshake completes; the stream is dropped right away.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProber;

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, endpoint: Endpoint, probe_timeout: Duration) -> Liveness {
        match timeout(probe_timeout, TcpStream::connect(endpoint.socket_addr())).await {
            Ok(Ok(stream)) => {
                drop(stream);
                Liveness::Live
            }
            Ok(Err(e)) => {
                trace!("{endpoint} refused: {e}");
                Liveness::Dead
            }
            Err(_elapsed) => Liveness::Dead,
        }
    }
}

/// Live only if a full WebSocket upgrade succeeds. Slower than
/// [`TcpProber`], but rejects unrelated services listening on the port.
#[derive(Debug, Clone, Copy, Default)]
pub struct HandshakeProber;

#[async_trait]
impl Prober for HandshakeProber {
    async fn probe(&self, endpoint: Endpoint, probe_timeout: Duration) -> Liveness {
        let handshake = async {
            let (mut stream, _response) = tokio_tungstenite::connect_async(endpoint.ws_url()).await?;
            let _ = stream.close(None).await;
            Ok::<(), tokio_tungstenite::tungstenite::Error>(())
        };

        match timeout(probe_timeout, handshake).await {
            Ok(Ok(())) => Liveness::Live,
            Ok(Err(e)) => {
                trace!("{endpoint} handshake failed: {e}");
                Liveness::Dead
            }
            Err(_elapsed) => Liveness::Dead,
        }
    }
}

/// Probes with the default [`TcpProber`].
pub async fn probe(endpoint: Endpoint, probe_timeout: Duration) -> Liveness {
    TcpProber.probe(endpoint, probe_timeout).await
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
