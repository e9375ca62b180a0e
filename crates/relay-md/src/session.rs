//! Stream session: one exchange WebSocket relayed onto one queue topic.
//!
//! Each `StreamSession` runs as a tokio task that:
//! 1. Makes sure the shared publisher has a broker link.
//! 2. Connects to the exchange endpoint with a freshly signed bearer token.
//! 3. Sends the platform subscription message (if the platform needs one).
//! 4. Publishes every received frame verbatim to the data kind's queue.
//! 5. On any failure or close, waits out an exponential backoff and reconnects.
//!
//! ```text
//! Connecting ──► Subscribing ──► Streaming ──► Backoff ──► Connecting ...
//!      │              │              │            │
//!      └──────────────┴──────┬───────┴────────────┘
//!                            ▼
//!                        Cancelled   (cancellation token fired)
//! ```
//!
//! Cancellation is observed at every await point, so a stopped session
//! closes its socket and stops publishing without waiting for the next frame.

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering::Relaxed};
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use relay_core::auth::{Credentials, sign_token};
use relay_core::config::AppConfig;
use relay_core::error::{RelayError, Result};
use relay_core::ws::{Backoff, DialConfig, WsStream, client::extract_host, connect_ws};
use relay_core::StreamKey;
use relay_mq::Publisher;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Interval;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::subscription;

/// Upper bound on the close handshake when a session is cancelled.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

type WsWrite = SplitSink<WsStream, Message>;
type WsRead = SplitStream<WsStream>;

// ---------------------------------------------------------------------------
// Observable state
// ---------------------------------------------------------------------------

/// Where the session currently is in its connect cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Connecting,
    Subscribing,
    Streaming,
    Backoff { delay_ms: u64 },
    Cancelled,
}

/// Running counters for one session.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub connect_attempts: AtomicU64,
    pub frames_received: AtomicU64,
    pub frames_published: AtomicU64,
    pub publish_failures: AtomicU64,
}

/// Point-in-time copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub connect_attempts: u64,
    pub frames_received: u64,
    pub frames_published: u64,
    pub publish_failures: u64,
}

impl SessionStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connect_attempts: self.connect_attempts.load(Relaxed),
            frames_received: self.frames_received.load(Relaxed),
            frames_published: self.frames_published.load(Relaxed),
            publish_failures: self.publish_failures.load(Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Everything a session needs from configuration, resolved up front so that
/// configuration errors surface to the caller of `start` instead of inside
/// the retry loop.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub url: String,
    pub symbols: Vec<String>,
    pub credentials: Option<Credentials>,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub handshake_timeout: Duration,
    pub ping_interval: Option<Duration>,
}

impl SessionSettings {
    /// Resolve settings for `key`.
    ///
    /// Fails when the platform has no endpoint for the data kind or when the
    /// configured credentials cannot sign a token.
    pub fn from_config(config: &AppConfig, key: StreamKey) -> Result<Self> {
        let exchange = config
            .exchange(key.platform)
            .ok_or_else(|| RelayError::Config(format!("no exchange configured for platform '{}'", key.platform)))?;
        let url = exchange
            .url_for(key.kind)
            .ok_or_else(|| RelayError::Config(format!("no endpoint configured for {key}")))?
            .to_string();

        let credentials = exchange.credentials()?;
        if let Some(creds) = &credentials {
            sign_token(creds)?;
        }

        Ok(Self {
            url,
            symbols: exchange.symbols.clone().unwrap_or_else(|| subscription::default_symbols(key.platform)),
            credentials,
            initial_backoff: config.session.initial_backoff(),
            max_backoff: config.session.max_backoff(),
            handshake_timeout: config.session.handshake_timeout(),
            ping_interval: exchange.ping_interval(),
        })
    }
}

// ---------------------------------------------------------------------------
// StreamSession
// ---------------------------------------------------------------------------

/// How one connect cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleEnd {
    /// Transient failure or peer close: back off and reconnect.
    Retry,
    /// Cancellation observed.
    Cancelled,
    /// Cannot continue (credential signing failed).
    Fatal,
}

/// One managed exchange stream.
pub struct StreamSession {
    key: StreamKey,
    label: String,
    settings: SessionSettings,
    publisher: Arc<dyn Publisher>,
    cancel: CancellationToken,
    backoff: Backoff,
    state_tx: watch::Sender<SessionState>,
    stats: Arc<SessionStats>,
}

impl StreamSession {
    /// Create a session. Nothing happens until [`run`](Self::run) is polled.
    pub fn new(
        key: StreamKey,
        settings: SessionSettings,
        publisher: Arc<dyn Publisher>,
        cancel: CancellationToken,
    ) -> Self {
        let backoff = Backoff::new(settings.initial_backoff, settings.max_backoff);
        let (state_tx, _) = watch::channel(SessionState::Connecting);
        Self {
            key,
            label: key.to_string(),
            settings,
            publisher,
            cancel,
            backoff,
            state_tx,
            stats: Arc::new(SessionStats::default()),
        }
    }

    /// Receiver that tracks state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }

    /// Drive the session until cancelled.
    pub async fn run(mut self) {
        let label = self.label.clone();
        info!("[{label}] session started ({} -> '{}')", extract_host(&self.settings.url), self.key.kind.queue());

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            match self.connect_cycle().await {
                CycleEnd::Retry => {}
                CycleEnd::Cancelled => break,
                CycleEnd::Fatal => {
                    error!("[{label}] session cannot continue, stopping");
                    break;
                }
            }

            let delay = self.backoff.next_delay();
            self.set_state(SessionState::Backoff { delay_ms: delay.as_millis() as u64 });
            warn!("[{label}] reconnecting in {delay:?}");
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.set_state(SessionState::Cancelled);
        info!("[{label}] session stopped");
    }

    /// Connect → subscribe → stream, once.
    async fn connect_cycle(&mut self) -> CycleEnd {
        let label = self.label.clone();
        self.set_state(SessionState::Connecting);
        self.stats.connect_attempts.fetch_add(1, Relaxed);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return CycleEnd::Cancelled,
            res = self.publisher.ensure_connected() => {
                if let Err(e) = res {
                    error!("[{label}] broker unavailable: {e}");
                    return CycleEnd::Retry;
                }
            }
        }

        let dial = match self.dial_config() {
            Ok(d) => d,
            Err(e) => {
                error!("[{label}] failed to sign handshake token: {e}");
                return CycleEnd::Fatal;
            }
        };

        info!("[{label}] connecting to {}", dial.url);
        let ws = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return CycleEnd::Cancelled,
            res = connect_ws(&dial) => match res {
                Ok(ws) => ws,
                Err(e) => {
                    error!("[{label}] connection failed: {e}");
                    return CycleEnd::Retry;
                }
            }
        };
        info!("[{label}] connected");

        let (mut write, mut read) = ws.split();

        if let Some(payload) =
            subscription::build_subscribe(self.key.platform, self.key.kind, &self.settings.symbols)
        {
            self.set_state(SessionState::Subscribing);
            debug!("[{label}] subscribing: {payload}");
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    close_socket(&label, &mut write).await;
                    return CycleEnd::Cancelled;
                }
                res = write.send(Message::Text(payload.into())) => {
                    if let Err(e) = res {
                        error!("[{label}] subscribe send failed: {e}");
                        return CycleEnd::Retry;
                    }
                }
            }
        }

        self.set_state(SessionState::Streaming);
        self.backoff.reset();
        info!("[{label}] streaming");

        self.stream(&mut write, &mut read).await
    }

    /// Handshake headers for the next dial, with a freshly signed token.
    fn dial_config(&self) -> Result<DialConfig> {
        let mut extra_headers = HashMap::new();
        if let Some(creds) = &self.settings.credentials {
            extra_headers.insert("Authorization".to_string(), format!("Bearer {}", sign_token(creds)?));
        }
        Ok(DialConfig {
            url: self.settings.url.clone(),
            extra_headers,
            handshake_timeout: self.settings.handshake_timeout,
        })
    }

    /// Receive loop. Returns when the connection ends or the session is cancelled.
    async fn stream(&self, write: &mut WsWrite, read: &mut WsRead) -> CycleEnd {
        let label = &self.label;
        let mut ping = self.settings.ping_interval.map(|period| {
            tokio::time::interval_at(tokio::time::Instant::now() + period, period)
        });

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => {
                    info!("[{label}] cancellation received");
                    close_socket(label, write).await;
                    return CycleEnd::Cancelled;
                }

                msg = read.next() => {
                    let flow = match msg {
                        Some(Ok(Message::Text(text))) => self.forward(text.as_bytes()).await,
                        Some(Ok(Message::Binary(data))) => self.forward(&data).await,
                        Some(Ok(Message::Ping(data))) => match write.send(Message::Pong(data)).await {
                            Ok(()) => ControlFlow::Continue(()),
                            Err(e) => {
                                error!("[{label}] pong send failed: {e}");
                                ControlFlow::Break(CycleEnd::Retry)
                            }
                        },
                        Some(Ok(Message::Close(frame))) => {
                            warn!("[{label}] received close frame: {frame:?}");
                            ControlFlow::Break(CycleEnd::Retry)
                        }
                        Some(Err(e)) => {
                            error!("[{label}] read error: {e}");
                            ControlFlow::Break(CycleEnd::Retry)
                        }
                        None => {
                            warn!("[{label}] stream ended");
                            ControlFlow::Break(CycleEnd::Retry)
                        }
                        Some(Ok(_)) => ControlFlow::Continue(()), // Pong, raw Frame
                    };
                    if let ControlFlow::Break(end) = flow {
                        return end;
                    }
                }

                _ = tick(&mut ping) => {
                    if let Err(e) = write.send(Message::Ping(Vec::new().into())).await {
                        error!("[{label}] ping send failed: {e}");
                        return CycleEnd::Retry;
                    }
                }
            }
        }
    }

    /// Publish one frame to the data kind's queue.
    ///
    /// A failed publish drops the frame. Losing the broker link ends the
    /// cycle so the next connect re-establishes it.
    async fn forward(&self, payload: &[u8]) -> ControlFlow<CycleEnd> {
        self.stats.frames_received.fetch_add(1, Relaxed);
        if self.cancel.is_cancelled() {
            return ControlFlow::Break(CycleEnd::Cancelled);
        }

        let queue = self.key.kind.queue();
        match self.publisher.publish(queue, payload).await {
            Ok(()) => {
                self.stats.frames_published.fetch_add(1, Relaxed);
                ControlFlow::Continue(())
            }
            Err(e) => {
                self.stats.publish_failures.fetch_add(1, Relaxed);
                error!("[{}] failed to publish to '{queue}': {e}", self.label);
                if e.is_disconnect() || !self.publisher.is_connected() {
                    warn!("[{}] broker link lost, leaving stream", self.label);
                    ControlFlow::Break(CycleEnd::Retry)
                } else {
                    ControlFlow::Continue(())
                }
            }
        }
    }
}

/// Wait for the next keep-alive tick, or forever when pings are disabled.
async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn close_socket(label: &str, write: &mut WsWrite) {
    match tokio::time::timeout(CLOSE_TIMEOUT, write.close()).await {
        Ok(Ok(())) => debug!("[{label}] socket closed"),
        Ok(Err(e)) => debug!("[{label}] error closing socket: {e}"),
        Err(_) => warn!("[{label}] close handshake timed out"),
    }
}

#[cfg(test)]
mod tests {
    use relay_core::config::ExchangeConfig;
    use relay_core::{DataKind, Platform};

    use super::*;

    fn config_with(platform: Platform, exchange: ExchangeConfig) -> AppConfig {
        let mut config = AppConfig::default();
        config.exchanges.insert(platform.as_str().to_string(), exchange);
        config
    }

    #[test]
    fn settings_use_platform_defaults() {
        let config = config_with(
            Platform::Upbit,
            ExchangeConfig { ws_url: Some("wss://api.upbit.com/websocket/v1".into()), ..Default::default() },
        );
        let key = StreamKey::new(Platform::Upbit, DataKind::Trade);
        let settings = SessionSettings::from_config(&config, key).unwrap();

        assert_eq!(settings.url, "wss://api.upbit.com/websocket/v1");
        assert_eq!(settings.symbols, subscription::default_symbols(Platform::Upbit));
        assert!(settings.credentials.is_none());
        assert_eq!(settings.initial_backoff, Duration::from_secs(1));
        assert_eq!(settings.max_backoff, Duration::from_secs(120));
        assert_eq!(settings.handshake_timeout, Duration::from_secs(10));
        assert!(settings.ping_interval.is_none());
    }

    #[test]
    fn settings_fail_without_endpoint() {
        let key = StreamKey::new(Platform::Bithumb, DataKind::Ticker);
        let err = SessionSettings::from_config(&AppConfig::default(), key).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));

        let trade_only = config_with(
            Platform::Bithumb,
            ExchangeConfig { trade_url: Some("wss://pubwss.bithumb.com/pub/ws".into()), ..Default::default() },
        );
        assert!(matches!(SessionSettings::from_config(&trade_only, key), Err(RelayError::Config(_))));
    }

    #[test]
    fn settings_reject_unusable_credentials() {
        let config = config_with(
            Platform::Upbit,
            ExchangeConfig {
                ws_url: Some("wss://api.upbit.com/websocket/v1".into()),
                access_key: Some("access".into()),
                secret_key: Some(String::new()),
                ..Default::default()
            },
        );
        let key = StreamKey::new(Platform::Upbit, DataKind::Trade);
        assert!(matches!(SessionSettings::from_config(&config, key), Err(RelayError::Auth(_))));
    }

    #[test]
    fn state_serializes_with_tag() {
        let v = serde_json::to_value(SessionState::Backoff { delay_ms: 250 }).unwrap();
        assert_eq!(v, serde_json::json!({"state": "backoff", "delay_ms": 250}));
        let v = serde_json::to_value(SessionState::Streaming).unwrap();
        assert_eq!(v, serde_json::json!({"state": "streaming"}));
    }
}
