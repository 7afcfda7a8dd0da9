//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Routed request (client id, route cost):
//!     → bucket.rs (refill by elapsed time, capped at capacity)
//!     → rate_limit.rs (consume on allow, untouched on deny)
//!     → AdmissionDecision { allowed, tokens_remaining, retry_after, ... }
//! ```
//!
//! # Design Decisions
//! - Denial is a structured result, never an error: callers must branch
//! - Buckets are created lazily on first request per client
//! - A staleness sweep bounds memory growth under client-id churn
//! - Critical section is read-refill-compare-write on a single bucket

mod bucket;
pub mod rate_limit;

pub use rate_limit::{AdmissionDecision, BucketStats, RateLimiter};
