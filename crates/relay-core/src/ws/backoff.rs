//! Exponential reconnect backoff.

use std::time::Duration;

/// Doubling delay between reconnect attempts, capped at `max`.
///
/// [`next_delay`](Backoff::next_delay) hands out the delay to sleep now and
/// doubles the stored value for the following failure. [`reset`](Backoff::reset)
/// is called once a connection reaches the streaming state.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self { initial, max, current: initial }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}
