//! Stream registry: the single source of truth for which streams are running.
//!
//! Maps each [`StreamKey`] to the handle of its running [`StreamSession`].
//! `start` checks, builds, spawns and inserts under one lock, so concurrent
//! starts of the same key produce exactly one session and a failed build
//! leaves nothing behind. `stop` removes the entry and fires the session's
//! cancellation token without waiting for the task to wind down. A session
//! whose task has exited on its own is dropped from the map the next time
//! the registry is consulted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use parking_lot::Mutex;
use relay_core::config::AppConfig;
use relay_core::error::{RelayError, Result};
use relay_core::{DataKind, Platform, StreamKey};
use relay_mq::Publisher;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::session::{SessionSettings, SessionState, SessionStats, StatsSnapshot, StreamSession};

/// Result of [`StreamRegistry::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Result of [`StreamRegistry::stop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotFound,
}

/// Registry-owned handle to one running session.
struct StreamHandle {
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    stats: Arc<SessionStats>,
    started_at: Instant,
    task: JoinHandle<()>,
}

/// Status row reported for each running stream.
#[derive(Debug, Clone, Serialize)]
pub struct StreamStatus {
    pub platform: Platform,
    pub kind: DataKind,
    pub queue: &'static str,
    #[serde(flatten)]
    pub state: SessionState,
    pub uptime_secs: u64,
    pub stats: StatsSnapshot,
}

/// Concurrency-safe map of running stream sessions.
pub struct StreamRegistry {
    config: Arc<AppConfig>,
    publisher: Arc<dyn Publisher>,
    /// Parent of every session token; cancelled on shutdown.
    root: CancellationToken,
    streams: Mutex<AHashMap<StreamKey, StreamHandle>>,
}

impl StreamRegistry {
    pub fn new(config: Arc<AppConfig>, publisher: Arc<dyn Publisher>) -> Self {
        Self { config, publisher, root: CancellationToken::new(), streams: Mutex::new(AHashMap::new()) }
    }

    /// Start the stream for `key` unless it is already running.
    ///
    /// Must be called from within a tokio runtime. Returns a configuration
    /// error (and registers nothing) when the session cannot be built, and
    /// [`RelayError::ShutDown`] once [`shutdown`](Self::shutdown) has begun.
    pub fn start(&self, key: StreamKey) -> Result<StartOutcome> {
        let mut streams = self.streams.lock();
        if self.root.is_cancelled() {
            warn!("[{key}] start rejected, registry is shut down");
            return Err(RelayError::ShutDown);
        }

        prune_finished(&mut streams);
        if streams.contains_key(&key) {
            info!("[{key}] already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let settings = SessionSettings::from_config(&self.config, key)?;
        let cancel = self.root.child_token();
        let session = StreamSession::new(key, settings, Arc::clone(&self.publisher), cancel.clone());
        let state = session.subscribe_state();
        let stats = session.stats();
        let task = tokio::spawn(session.run());

        streams.insert(key, StreamHandle { cancel, state, stats, started_at: Instant::now(), task });
        info!("[{key}] started ({} running)", streams.len());
        Ok(StartOutcome::Started)
    }

    /// Cancel and forget the stream for `key`.
    pub fn stop(&self, key: StreamKey) -> StopOutcome {
        let removed = self.streams.lock().remove(&key);
        match removed {
            Some(handle) => {
                handle.cancel.cancel();
                info!("[{key}] stopped");
                StopOutcome::Stopped
            }
            None => {
                info!("[{key}] not running");
                StopOutcome::NotFound
            }
        }
    }

    pub fn is_running(&self, key: StreamKey) -> bool {
        let mut streams = self.streams.lock();
        prune_finished(&mut streams);
        streams.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        let mut streams = self.streams.lock();
        prune_finished(&mut streams);
        streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every running stream, ordered by key.
    pub fn list(&self) -> Vec<StreamStatus> {
        let mut streams = self.streams.lock();
        prune_finished(&mut streams);
        let mut rows: Vec<(StreamKey, StreamStatus)> = streams
            .iter()
            .map(|(key, handle)| {
                let status = StreamStatus {
                    platform: key.platform,
                    kind: key.kind,
                    queue: key.kind.queue(),
                    state: *handle.state.borrow(),
                    uptime_secs: handle.started_at.elapsed().as_secs(),
                    stats: handle.stats.snapshot(),
                };
                (*key, status)
            })
            .collect();
        rows.sort_by_key(|(key, _)| *key);
        rows.into_iter().map(|(_, status)| status).collect()
    }

    /// State of the session for `key`, if running.
    pub fn state(&self, key: StreamKey) -> Option<SessionState> {
        let mut streams = self.streams.lock();
        prune_finished(&mut streams);
        streams.get(&key).map(|h| *h.state.borrow())
    }

    /// Cancel every session and wait up to `grace` for each task to exit.
    pub async fn shutdown(&self, grace: Duration) {
        self.root.cancel();
        let handles: Vec<(StreamKey, StreamHandle)> = self.streams.lock().drain().collect();
        info!("shutting down {} stream(s)", handles.len());

        for (key, handle) in handles {
            if tokio::time::timeout(grace, handle.task).await.is_err() {
                warn!("[{key}] did not stop within {grace:?}");
            }
        }
    }
}

/// Drop handles whose session task exited without a stop.
fn prune_finished(streams: &mut AHashMap<StreamKey, StreamHandle>) {
    streams.retain(|key, handle| {
        let alive = !handle.task.is_finished();
        if !alive {
            warn!("[{key}] session exited on its own, removing it");
        }
        alive
    });
}
