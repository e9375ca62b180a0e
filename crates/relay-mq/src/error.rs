//! Broker error types.

use thiserror::Error;

/// Errors raised by [`Publisher`](crate::Publisher) implementations.
#[derive(Debug, Error)]
pub enum MqError {
    /// Every dial attempt of one connect cycle failed.
    #[error("unable to establish broker connection after {attempts} attempt(s): {source}")]
    ExhaustedRetries {
        attempts: u32,
        #[source]
        source: lapin::Error,
    },

    /// Publish attempted while no broker link is up.
    #[error("broker connection is not established")]
    NotConnected,

    /// Channel, declare, or publish failure reported by the AMQP client.
    #[error("amqp error: {0}")]
    Amqp(#[from] lapin::Error),
}

impl MqError {
    /// Whether the error means the broker link is gone (as opposed to a
    /// single rejected publish).
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::NotConnected | Self::ExhaustedRetries { .. })
    }
}

pub type Result<T> = std::result::Result<T, MqError>;
