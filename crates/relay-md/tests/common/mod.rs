//! Shared fixtures for the relay-md integration tests: an in-memory
//! publisher and a scriptable mock exchange WebSocket server.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use relay_core::config::{AppConfig, ExchangeConfig};
use relay_core::Platform;
use relay_mq::{MqError, Publisher};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

pub const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// RecordingPublisher
// ---------------------------------------------------------------------------

/// Publisher that keeps every message in memory.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, Vec<u8>)>>,
    connected: AtomicBool,
    fail_connect: AtomicBool,
    pub connect_calls: AtomicU64,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `ensure_connected` fail (and drop the link) until reset.
    pub fn set_broker_down(&self, down: bool) {
        self.fail_connect.store(down, Ordering::SeqCst);
        if down {
            self.connected.store(false, Ordering::SeqCst);
        }
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().clone()
    }

    /// Wait until at least `n` messages were published, then return them all.
    pub async fn wait_for(&self, n: usize) -> Vec<(String, Vec<u8>)> {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let published = self.published();
            if published.len() >= n {
                return published;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {n} published messages, have {}",
                published.len()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn ensure_connected(&self) -> relay_mq::Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(MqError::NotConnected);
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> relay_mq::Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(MqError::NotConnected);
        }
        self.published.lock().push((topic.to_string(), payload.to_vec()));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// MockExchange
// ---------------------------------------------------------------------------

/// One accepted client connection on the mock exchange.
///
/// Dropping it closes the socket from the server side.
pub struct MockConn {
    /// `Authorization` header sent with the handshake, if any.
    pub auth: Option<String>,
    frames: mpsc::UnboundedSender<Message>,
    incoming: mpsc::UnboundedReceiver<String>,
    /// Ping and Pong frames the client sent.
    control: mpsc::UnboundedReceiver<Message>,
}

impl MockConn {
    pub fn send_text(&self, text: &str) {
        let _ = self.frames.send(Message::Text(text.to_string().into()));
    }

    pub fn send_binary(&self, data: &[u8]) {
        let _ = self.frames.send(Message::Binary(data.to_vec().into()));
    }

    pub fn send_ping(&self, data: &[u8]) {
        let _ = self.frames.send(Message::Ping(data.to_vec().into()));
    }

    /// Next Ping or Pong the client sent.
    pub async fn recv_control(&mut self) -> Message {
        timeout(WAIT, self.control.recv())
            .await
            .expect("timed out waiting for client ping/pong")
            .expect("client connection closed")
    }

    /// Next text message the client sent.
    pub async fn recv_text(&mut self) -> String {
        timeout(WAIT, self.incoming.recv())
            .await
            .expect("timed out waiting for client message")
            .expect("client connection closed")
    }

    /// Client message already received, if any.
    pub fn try_recv_text(&mut self) -> Option<String> {
        self.incoming.try_recv().ok()
    }

    /// Wait until the client side of the socket is gone.
    pub async fn closed(&mut self) {
        timeout(WAIT, async {
            while self.incoming.recv().await.is_some() {}
        })
        .await
        .expect("client did not close the connection");
    }
}

/// Local WebSocket server standing in for an exchange.
pub struct MockExchange {
    pub url: String,
    conns: mpsc::UnboundedReceiver<MockConn>,
}

impl MockExchange {
    /// Bind on a random port. The first `reject_first` TCP connections are
    /// dropped before the handshake.
    pub async fn start(reject_first: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (conn_tx, conns) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut rejected = 0;
            while let Ok((stream, _)) = listener.accept().await {
                if rejected < reject_first {
                    rejected += 1;
                    drop(stream);
                    continue;
                }
                tokio::spawn(serve(stream, conn_tx.clone()));
            }
        });

        Self { url: format!("ws://{addr}"), conns }
    }

    pub async fn next_conn(&mut self) -> MockConn {
        timeout(WAIT, self.conns.recv())
            .await
            .expect("timed out waiting for client connection")
            .expect("mock exchange stopped")
    }

    pub fn try_next_conn(&mut self) -> Option<MockConn> {
        self.conns.try_recv().ok()
    }
}

async fn serve(stream: TcpStream, conn_tx: mpsc::UnboundedSender<MockConn>) {
    let mut auth = None;
    let capture = |req: &Request, resp: Response| {
        auth = req.headers().get("authorization").and_then(|v| v.to_str().ok()).map(str::to_string);
        Ok::<_, ErrorResponse>(resp)
    };
    let Ok(ws) = accept_hdr_async(stream, capture).await else {
        return;
    };

    let (mut write, mut read) = ws.split();
    let (frames, mut frame_rx) = mpsc::unbounded_channel();
    let (in_tx, incoming) = mpsc::unbounded_channel();
    let (control_tx, control) = mpsc::unbounded_channel();
    if conn_tx.send(MockConn { auth, frames, incoming, control }).is_err() {
        return;
    }

    loop {
        tokio::select! {
            out = frame_rx.recv() => match out {
                Some(msg) => {
                    if write.send(msg).await.is_err() {
                        break;
                    }
                }
                None => {
                    let _ = write.close().await;
                    break;
                }
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = in_tx.send(text.to_string());
                }
                Some(Ok(msg @ (Message::Ping(_) | Message::Pong(_)))) => {
                    let _ = control_tx.send(msg);
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Config with one exchange pointing at `url` and millisecond backoffs.
pub fn config_for(platform: Platform, url: &str, credentials: Option<(&str, &str)>) -> AppConfig {
    let mut config = AppConfig::default();
    config.session.initial_backoff_ms = 20;
    config.session.max_backoff_ms = 80;
    config.session.handshake_timeout_ms = 2_000;
    config.exchanges.insert(
        platform.as_str().to_string(),
        ExchangeConfig {
            ws_url: Some(url.to_string()),
            access_key: credentials.map(|(a, _)| a.to_string()),
            secret_key: credentials.map(|(_, s)| s.to_string()),
            ..Default::default()
        },
    );
    config
}

/// Poll `check` until it holds or [`WAIT`] elapses.
pub async fn eventually(what: &str, mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        assert!(tokio::time::Instant::now() < deadline, "timed out waiting for {what}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
