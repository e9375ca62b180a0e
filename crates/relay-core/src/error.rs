//! Typed error definitions for the relay.
//!
//! Provides [`RelayError`] for failures that callers need to tell apart
//! (configuration vs. transient connectivity). All variants implement
//! `std::error::Error` via `thiserror`, so they integrate with `anyhow::Result`.

use std::time::Duration;

use thiserror::Error;

/// Domain-specific errors for the relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Credentials are unusable for signing (e.g. empty secret key).
    #[error("auth error: {0}")]
    Auth(String),

    /// WebSocket dial, handshake, or I/O error.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The WebSocket handshake did not complete in time.
    #[error("handshake timed out after {0:?}")]
    Timeout(Duration),

    /// Platform name not known to the relay.
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    /// Data kind other than `trade` / `ticker`.
    #[error("unknown data type: {0}")]
    UnknownDataKind(String),

    /// The stream registry has been shut down and accepts no new streams.
    #[error("registry is shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, RelayError>;
