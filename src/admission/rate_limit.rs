//! Token-bucket rate limiter keyed by client id.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use crate::admission::bucket::ClientBucket;
use crate::config::RateLimitConfig;
use crate::observability::metrics;

/// Outcome of an admission check.
#[derive(Debug, Clone, Serialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    /// Whole tokens left after the check (floor of the real balance).
    pub tokens_remaining: u32,
    pub tokens_required: u32,
    /// Seconds until the bucket is projected to be full again.
    /// `f64::INFINITY` when the refill rate is zero and the bucket is not full.
    pub reset_after: f64,
    /// Seconds until `tokens_required` tokens are available. `None` means
    /// never: the refill rate is zero and only a manual reset will help.
    pub retry_after: Option<u64>,
}

/// Read-only bucket report, produced without consuming tokens.
#[derive(Debug, Clone, Serialize)]
pub struct BucketStats {
    pub tokens_remaining: u32,
    pub reset_after: f64,
}

/// Per-client token-bucket admission control.
///
/// Buckets are created lazily on first sight of a client id and persist until
/// [`RateLimiter::cleanup_stale_buckets`] evicts them. The lock guards only
/// the bucket table; each check is a tiny read-refill-compare-write.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, ClientBucket>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Check whether `client_id` may proceed, consuming `tokens_required`
    /// tokens on success. The bucket is refilled by elapsed time before the
    /// check, so a denial reflects the current balance, not a stale one.
    ///
    /// Requests costing more than the bucket capacity can never succeed
    /// without a manual reset; that is accepted behavior, not an error.
    pub fn is_allowed(&self, client_id: &str, tokens_required: u32) -> AdmissionDecision {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let bucket = buckets
            .entry(client_id.to_string())
            .or_insert_with(|| ClientBucket::full(self.config.capacity));

        bucket.refill(self.config.capacity, self.config.refill_rate);
        let allowed = bucket.try_consume(f64::from(tokens_required));

        if !allowed {
            tracing::warn!(
                client = client_id,
                required = tokens_required,
                remaining = bucket.tokens,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited();
        }

        self.decision(bucket, allowed, tokens_required)
    }

    /// Read-through refill and report. Consumes nothing.
    pub fn get_stats(&self, client_id: &str) -> BucketStats {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let bucket = buckets
            .entry(client_id.to_string())
            .or_insert_with(|| ClientBucket::full(self.config.capacity));

        bucket.refill(self.config.capacity, self.config.refill_rate);
        BucketStats {
            tokens_remaining: bucket.tokens.floor() as u32,
            reset_after: self.reset_after(bucket.tokens),
        }
    }

    /// Force a client's bucket back to full capacity.
    pub fn reset_client(&self, client_id: &str) {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        buckets.insert(
            client_id.to_string(),
            ClientBucket::full(self.config.capacity),
        );
        tracing::debug!(client = client_id, "Bucket reset to capacity");
    }

    /// Evict buckets idle longer than `timeout` and return the eviction
    /// count. Bounds memory growth under high client-id churn.
    pub fn cleanup_stale_buckets(&self, timeout: Duration) -> usize {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let before = buckets.len();
        buckets.retain(|_, bucket| bucket.idle_for() <= timeout);
        let evicted = before - buckets.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = buckets.len(), "Evicted stale buckets");
        }
        evicted
    }

    /// Sweep using the configured idle window.
    pub fn cleanup(&self) -> usize {
        self.cleanup_stale_buckets(Duration::from_secs_f64(self.config.window_size))
    }

    /// Number of tracked client buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.lock().expect("rate limiter mutex poisoned").len()
    }

    fn decision(
        &self,
        bucket: &ClientBucket,
        allowed: bool,
        tokens_required: u32,
    ) -> AdmissionDecision {
        let deficit = (f64::from(tokens_required) - bucket.tokens).max(0.0);
        let retry_after = if deficit <= 0.0 {
            Some(0)
        } else if self.config.refill_rate > 0.0 {
            Some((deficit / self.config.refill_rate).ceil() as u64)
        } else {
            // Zero refill rate: the deficit never shrinks on its own.
            None
        };

        AdmissionDecision {
            allowed,
            tokens_remaining: bucket.tokens.floor() as u32,
            tokens_required,
            reset_after: self.reset_after(bucket.tokens),
            retry_after,
        }
    }

    fn reset_after(&self, tokens: f64) -> f64 {
        let deficit = self.config.capacity - tokens;
        if deficit <= 0.0 {
            0.0
        } else if self.config.refill_rate > 0.0 {
            deficit / self.config.refill_rate
        } else {
            f64::INFINITY
        }
    }
}
