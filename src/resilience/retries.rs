//! Retry as an explicit policy value.
//!
//! # Responsibilities
//! - Re-run a fallible async operation up to `max_attempts` times
//! - Sleep a jittered exponential backoff between attempts
//!
//! # Design Decisions
//! - A `RetryPolicy` is plain data with an `apply` method, not a wrapper
//!   that decorates functions: composing with a circuit breaker is written
//!   out at the call site, so the ordering is explicit
//! - The last error is returned as-is when the budget is exhausted

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::resilience::backoff::calculate_backoff;

/// Explicit retry policy.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first call.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts,
            base_delay,
            backoff_factor,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
            backoff_factor: config.backoff_factor,
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    pub async fn apply<F, Fut, T, E>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let mut attempt: u32 = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.max_attempts.max(1) => {
                    tracing::debug!(attempts = attempt, error = %err, "Retry budget exhausted");
                    return Err(err);
                }
                Err(err) => {
                    let delay = calculate_backoff(attempt, self.base_delay, self.backoff_factor);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
