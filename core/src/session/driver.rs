use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use slidelink_common::network::endpoint::Endpoint;
use slidelink_common::network::prefix::Ipv4Prefix;
use slidelink_common::store::{KeyValueStore, LAST_ENDPOINT_KEY, LAST_PREFIX_KEY};
use slidelink_common::warn;
use slidelink_protocols::{InboundFrame, encode_pong};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::{SessionConfig, SessionError, SessionObserver, SessionState, Shared};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Sink = SplitSink<Socket, Message>;
type Source = SplitStream<Socket>;

/// Time granted to the close handshake before the socket is dropped.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub(crate) enum Outbound {
    Frame(String),
    Close,
}

/// How a channel ended.
#[derive(Debug)]
enum End {
    /// Close requested locally, or the session went away.
    Local,
    Remote,
    ServerShutdown,
    Transport(SessionError),
}

pub(crate) struct Driver {
    pub(crate) generation: u64,
    pub(crate) endpoint: Endpoint,
    pub(crate) config: SessionConfig,
    pub(crate) shared: Arc<Shared>,
    pub(crate) store: Arc<dyn KeyValueStore>,
    pub(crate) observer: Arc<dyn SessionObserver>,
}

impl Driver {
    pub(crate) async fn run(self, mut outbound: mpsc::UnboundedReceiver<Outbound>) {
        let Some(socket) = self.connect(&mut outbound).await else {
            return;
        };

        // The endpoint is stored before anyone can observe `Open`.
        let opened = self.fenced(|state| {
            if *state.borrow() != SessionState::Connecting {
                return false;
            }
            self.remember_endpoint();
            state.send_replace(SessionState::Open);
            self.observer.on_open(self.endpoint);
            true
        });

        let (mut sink, source) = socket.split();
        let end = match opened {
            Some(true) => {
                debug!("session open to {}", self.endpoint);
                self.pump(&mut sink, source, &mut outbound).await
            }
            // Closed while the handshake was in flight.
            Some(false) => End::Local,
            // Replaced by a newer channel.
            None => {
                let _ = timeout(CLOSE_GRACE, sink.close()).await;
                return;
            }
        };

        self.finish(sink, end).await;
    }

    /// Handshake under the connect timeout, abandoned early on a close request.
    async fn connect(&self, outbound: &mut mpsc::UnboundedReceiver<Outbound>) -> Option<Socket> {
        let url = self.endpoint.ws_url();
        let limit = self.config.connect_timeout;
        debug!("connecting to {url}");

        let result = tokio::select! {
            result = timeout(limit, tokio_tungstenite::connect_async(url.as_str())) => result,
            _ = wait_for_close(outbound) => {
                self.fenced(|state| {
                    state.send_replace(SessionState::Closed);
                    self.observer.on_close();
                });
                return None;
            }
        };

        let error = match result {
            Ok(Ok((socket, _response))) => return Some(socket),
            Ok(Err(e)) => SessionError::Handshake(e.to_string()),
            Err(_elapsed) => SessionError::Timeout(limit),
        };

        warn!("could not connect to {}: {error}", self.endpoint);
        self.fenced(|state| {
            state.send_replace(SessionState::Failed);
            self.observer.on_error(error.to_string());
        });
        None
    }

    /// Shuttles frames until the channel ends. Inbound traffic is polled
    /// first so a ping is answered before any queued command goes out.
    async fn pump(
        &self,
        sink: &mut Sink,
        mut source: Source,
        outbound: &mut mpsc::UnboundedReceiver<Outbound>,
    ) -> End {
        let period = self.config.keepalive_interval;
        let mut keepalive = interval_at(Instant::now() + period, period);
        keepalive.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                inbound = source.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(end) = self.on_text(sink, &text).await {
                            return end;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!("server closed the channel: {frame:?}");
                        return End::Remote;
                    }
                    Some(Ok(other)) => trace!("ignoring {other:?}"),
                    Some(Err(e)) => return End::Transport(SessionError::Transport(e.to_string())),
                    None => return End::Remote,
                },

                request = outbound.recv() => match request {
                    Some(Outbound::Frame(text)) => {
                        if let Err(e) = sink.send(Message::Text(text)).await {
                            return End::Transport(SessionError::Transport(e.to_string()));
                        }
                    }
                    Some(Outbound::Close) | None => return End::Local,
                },

                _ = keepalive.tick() => {
                    let token: u64 = rand::random();
                    trace!("keep-alive ping {token:016x}");
                    if let Err(e) = sink.send(Message::Ping(token.to_be_bytes().to_vec())).await {
                        warn!("keep-alive ping failed: {e}");
                    }
                }
            }
        }
    }

    async fn on_text(&self, sink: &mut Sink, text: &str) -> Option<End> {
        let frame = match InboundFrame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("dropping malformed frame {text:?}: {e}");
                return None;
            }
        };

        if let Some(token) = frame.ping_token() {
            if let Err(e) = sink.send(Message::Text(encode_pong(token))).await {
                return Some(End::Transport(SessionError::Transport(e.to_string())));
            }
        }

        let shutdown = frame.server_shutdown;
        self.fenced(|_| self.observer.on_message(frame));

        shutdown.then_some(End::ServerShutdown)
    }

    async fn finish(&self, mut sink: Sink, end: End) {
        debug!("channel to {} ended: {end:?}", self.endpoint);

        if let End::Transport(error) = end {
            self.fenced(|state| {
                self.observer.on_error(error.to_string());
                state.send_replace(SessionState::Failed);
                self.observer.on_close();
            });
            return;
        }

        let _ = timeout(CLOSE_GRACE, sink.close()).await;
        self.fenced(|state| {
            state.send_replace(SessionState::Closed);
            self.observer.on_close();
        });
    }

    fn remember_endpoint(&self) {
        if let Err(e) = self.store.set(LAST_ENDPOINT_KEY, &self.endpoint.to_string()) {
            warn!("could not remember {}: {e}", self.endpoint);
        }
        let Some(prefix) = Ipv4Prefix::of_ip(&self.endpoint.addr) else {
            return;
        };
        if let Err(e) = self.store.set(LAST_PREFIX_KEY, &prefix.to_string()) {
            warn!("could not remember segment {prefix}: {e}");
        }
    }

    fn fenced<R>(
        &self,
        f: impl FnOnce(&tokio::sync::watch::Sender<SessionState>) -> R,
    ) -> Option<R> {
        self.shared.fenced(self.generation, f)
    }
}

async fn wait_for_close(outbound: &mut mpsc::UnboundedReceiver<Outbound>) {
    while let Some(request) = outbound.recv().await {
        if matches!(request, Outbound::Close) {
            return;
        }
    }
}
