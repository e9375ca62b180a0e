//! WebSocket dialing and reconnect backoff.

pub mod backoff;
pub mod client;

pub use backoff::Backoff;
pub use client::{DialConfig, WsStream, connect_ws};
