//! # relay-core
//!
//! Core crate for the market-data relay, providing:
//!
//! - **Types** (`types`): `Platform`, `DataKind`, `StreamKey`, queue names
//! - **Configuration** (`config`): JSON config deserialization + env overrides
//! - **Error types** (`error`): domain-specific `RelayError` via thiserror
//! - **Auth** (`auth`): HS256 bearer tokens for WebSocket handshakes
//! - **WebSocket** (`ws`): single-attempt dial with timeout, reconnect backoff
//! - **Logging** (`logging`): tracing-based structured logging

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;
pub mod ws;

// Re-export types at crate root for convenience.
pub use types::*;
