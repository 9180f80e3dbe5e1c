//! The WebSocket channel to the presentation service.
//!
//! A [`Session`] owns at most one channel. The channel itself lives on a
//! driver task; the session only hands it outbound frames and a close
//! request. Every state write and observer call of a driver is fenced by the
//! generation it was spawned with, so a channel replaced by [`Session::open`]
//! goes silent the moment `open` returns.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use slidelink_common::config::{Config, DEFAULT_CONNECT_TIMEOUT, DEFAULT_KEEPALIVE_INTERVAL};
use slidelink_common::network::endpoint::Endpoint;
use slidelink_common::store::KeyValueStore;
use slidelink_protocols::{Command, InboundFrame, encode_command};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

mod driver;

use driver::{Driver, Outbound};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
    Failed,
}

impl SessionState {
    /// A channel exists or is being established.
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Connecting | SessionState::Open)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::Open => "open",
            SessionState::Closing => "closing",
            SessionState::Closed => "closed",
            SessionState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("connection timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("connection lost: {0}")]
    Transport(String),
    #[error("session is not open")]
    Closed,
}

/// Receives the lifecycle and inbound traffic of the current channel.
///
/// Calls are made with the generation fence held: implementations must not
/// call back into the [`Session`].
pub trait SessionObserver: Send + Sync {
    fn on_open(&self, endpoint: Endpoint);
    fn on_close(&self);
    fn on_error(&self, cause: String);
    fn on_message(&self, frame: InboundFrame);
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub connect_timeout: Duration,
    pub keepalive_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
        }
    }
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            keepalive_interval: config.keepalive_interval,
        }
    }
}

/// State shared between the session and its drivers.
pub(crate) struct Shared {
    generation: Mutex<u64>,
    state: watch::Sender<SessionState>,
}

impl Shared {
    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` only while `generation` is still the live one.
    pub(crate) fn fenced<R>(
        &self,
        generation: u64,
        f: impl FnOnce(&watch::Sender<SessionState>) -> R,
    ) -> Option<R> {
        let current = self.lock_generation();
        (*current == generation).then(|| f(&self.state))
    }
}

struct Link {
    endpoint: Endpoint,
    outbound: mpsc::UnboundedSender<Outbound>,
    task: JoinHandle<()>,
}

pub struct Session {
    config: SessionConfig,
    store: Arc<dyn KeyValueStore>,
    observer: Arc<dyn SessionObserver>,
    shared: Arc<Shared>,
    link: Option<Link>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        store: Arc<dyn KeyValueStore>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            config,
            store,
            observer,
            shared: Arc::new(Shared {
                generation: Mutex::new(0),
                state,
            }),
            link: None,
        }
    }

    /// Starts connecting to `endpoint` and returns at once. Any current
    /// channel is torn down first and reports `on_close`.
    pub fn open(&mut self, endpoint: Endpoint) {
        let generation = {
            let mut current = self.shared.lock_generation();
            *current += 1;

            let previous = *self.shared.state.borrow();
            if let Some(link) = self.link.take() {
                debug!("replacing channel to {}", link.endpoint);
                let _ = link.outbound.send(Outbound::Close);
            }
            if matches!(
                previous,
                SessionState::Connecting | SessionState::Open | SessionState::Closing
            ) {
                self.observer.on_close();
            }

            self.shared.state.send_replace(SessionState::Connecting);
            *current
        };

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let driver = Driver {
            generation,
            endpoint,
            config: self.config,
            shared: Arc::clone(&self.shared),
            store: Arc::clone(&self.store),
            observer: Arc::clone(&self.observer),
        };
        let task = tokio::spawn(driver.run(outbound_rx));

        self.link = Some(Link {
            endpoint,
            outbound: outbound_tx,
            task,
        });
    }

    /// Queues `command` for the open channel.
    pub fn try_send(&self, command: &Command) -> Result<(), SessionError> {
        let link = match (&self.link, self.state()) {
            (Some(link), SessionState::Open) => link,
            _ => return Err(SessionError::Closed),
        };

        let frame = encode_command(command);
        debug!("-> {frame}");
        link.outbound
            .send(Outbound::Frame(frame))
            .map_err(|_| SessionError::Closed)
    }

    /// Fire-and-forget; `false` when the channel is not open.
    pub fn send(&self, command: &Command) -> bool {
        self.try_send(command).is_ok()
    }

    /// Starts an orderly close. A no-op unless connecting or open.
    pub fn close(&mut self) {
        let _current = self.shared.lock_generation();
        if !self.state().is_active() {
            return;
        }

        self.shared.state.send_replace(SessionState::Closing);
        if let Some(link) = &self.link {
            let _ = link.outbound.send(Outbound::Close);
        }
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// Endpoint of the current (or last) channel.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.link.as_ref().map(|link| link.endpoint)
    }

    /// Waits until the current driver has exited.
    pub async fn join(&mut self) {
        if let Some(link) = self.link.as_mut() {
            let _ = (&mut link.task).await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(link) = &self.link {
            let _ = link.outbound.send(Outbound::Close);
        }
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
