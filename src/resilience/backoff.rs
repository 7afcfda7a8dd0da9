//! Exponential backoff with jitter.

use std::time::Duration;
use rand::Rng;

/// Ceiling on any single backoff delay.
const MAX_DELAY_MS: u64 = 30_000;

/// Calculate the delay before retry number `attempt` (1-based).
pub fn calculate_backoff(attempt: u32, base_delay: Duration, backoff_factor: f64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let scale = backoff_factor.powi(attempt as i32 - 1);
    let delay_ms = ((base_delay.as_millis() as f64) * scale).min(MAX_DELAY_MS as f64) as u64;

    // Apply jitter (0 to 10% of the delay) to avoid synchronized retries.
    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + jitter)
}
