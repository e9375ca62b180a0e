//! # relay-mq
//!
//! Message-queue side of the relay.
//!
//! Stream sessions only see the [`Publisher`] trait. The production
//! implementation, [`amqp::AmqpPublisher`], keeps one broker connection and
//! channel for the whole process and re-dials lazily when a session asks for
//! it via [`Publisher::ensure_connected`].
//!
//! Delivery is at-most-once: publishes are fire-and-forget and a failed
//! publish drops the frame.

pub mod amqp;
pub mod error;

use async_trait::async_trait;

pub use amqp::AmqpPublisher;
pub use error::{MqError, Result};
pub use relay_core::types::{TICKER_QUEUE, TRADE_QUEUE};

/// Sink for raw market-data frames.
///
/// Implementations must be safe to share between every running stream
/// session; a publish from one session never depends on another session's
/// lifecycle.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Make sure a broker link is up, dialing with bounded retry if not.
    ///
    /// Cheap when already connected. Returns
    /// [`MqError::ExhaustedRetries`] when every attempt of this cycle fails.
    async fn ensure_connected(&self) -> Result<()>;

    /// Publish `payload` verbatim to `topic` without waiting for an ack.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;

    /// Whether the broker link currently reports itself open.
    fn is_connected(&self) -> bool;

    /// Release the channel and connection. Safe to call more than once.
    async fn close(&self);
}
