//! A stand-in for the presentation service: accepts WebSocket clients one
//! after another, records every text frame and ping, and pushes frames on
//! demand.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use slidelink_common::network::endpoint::Endpoint;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const RECV_LIMIT: Duration = Duration::from_secs(5);

enum Push {
    Text(String),
    Close,
}

pub struct MockServer {
    endpoint: Endpoint,
    received: mpsc::UnboundedReceiver<String>,
    pings: mpsc::UnboundedReceiver<Vec<u8>>,
    push: mpsc::UnboundedSender<Push>,
    task: JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let endpoint = Endpoint::from(listener.local_addr()?);
        let (received_tx, received) = mpsc::unbounded_channel();
        let (pings_tx, pings) = mpsc::unbounded_channel();
        let (push, push_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(serve(listener, received_tx, pings_tx, push_rx));
        Ok(Self {
            endpoint,
            received,
            pings,
            push,
            task,
        })
    }

    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    /// Queues a text frame for the connected client.
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.push.send(Push::Text(text.into()));
    }

    /// Starts a close handshake with the connected client.
    pub fn close(&self) {
        let _ = self.push.send(Push::Close);
    }

    /// Next text frame from the client, decoded as JSON.
    pub async fn next_frame(&mut self) -> Option<serde_json::Value> {
        let text = timeout(RECV_LIMIT, self.received.recv()).await.ok()??;
        serde_json::from_str(&text).ok()
    }

    /// Payload of the next WebSocket ping from the client.
    pub async fn next_ping(&mut self) -> Option<Vec<u8>> {
        timeout(RECV_LIMIT, self.pings.recv()).await.ok()?
    }

    /// Discards pings already received and returns how many there were.
    pub fn drain_pings(&mut self) -> usize {
        let mut count = 0;
        while self.pings.try_recv().is_ok() {
            count += 1;
        }
        count
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    listener: TcpListener,
    received: mpsc::UnboundedSender<String>,
    pings: mpsc::UnboundedSender<Vec<u8>>,
    mut push: mpsc::UnboundedReceiver<Push>,
) {
    while let Ok((tcp, _)) = listener.accept().await {
        let Ok(mut ws) = accept_async(tcp).await else {
            continue;
        };

        loop {
            tokio::select! {
                message = ws.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        let _ = received.send(text);
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = pings.send(payload);
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
                request = push.recv() => match request {
                    Some(Push::Text(text)) => {
                        if ws.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                    Some(Push::Close) => {
                        let _ = ws.close(None).await;
                        break;
                    }
                    None => return,
                }
            }
        }
    }
}
