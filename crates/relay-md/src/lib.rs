//! # relay-md
//!
//! Market data relay sessions for the supported exchanges.
//!
//! ## Architecture
//!
//! The [`registry::StreamRegistry`] owns every running stream. Each stream is
//! a [`session::StreamSession`] task that holds one exchange WebSocket and
//! forwards every frame, unmodified, to the queue for its data kind through
//! a shared [`relay_mq::Publisher`].
//!
//! ## Modules
//!
//! - [`registry`]: start/stop/list of running streams keyed by `(platform, kind)`
//! - [`session`]: per-stream reconnect state machine
//! - [`subscription`]: exchange subscription payload builders

pub mod registry;
pub mod session;
pub mod subscription;

pub use registry::{StartOutcome, StopOutcome, StreamRegistry, StreamStatus};
pub use session::{SessionSettings, SessionState, SessionStats, StatsSnapshot, StreamSession};
