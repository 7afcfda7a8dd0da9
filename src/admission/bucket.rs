//! Per-client token bucket.

use std::time::Duration;
use tokio::time::Instant;

/// A single client's token bucket.
///
/// `last_refill` doubles as the last-activity timestamp: every touch of the
/// bucket refills it first, so staleness sweeps can key off the same field.
#[derive(Debug)]
pub(crate) struct ClientBucket {
    pub tokens: f64,
    pub last_refill: Instant,
}

impl ClientBucket {
    /// Create a bucket holding its full capacity.
    pub fn full(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    /// Refill by elapsed time, capped at capacity. Must run before any
    /// admission check or stats read.
    pub fn refill(&mut self, capacity: f64, refill_rate: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_refill = now;
    }

    /// Consume `required` tokens if available. On deny, the balance is
    /// left untouched.
    pub fn try_consume(&mut self, required: f64) -> bool {
        if self.tokens >= required {
            self.tokens -= required;
            true
        } else {
            false
        }
    }

    /// Time since the bucket was last touched.
    pub fn idle_for(&self) -> Duration {
        self.last_refill.elapsed()
    }
}
