//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to an upstream dependency:
//!     → circuit_breaker.rs (fail fast while the dependency is presumed down)
//!     → retries.rs (explicit RetryPolicy value, applied by the caller)
//!     → backoff.rs (jittered exponential delay between attempts)
//! ```
//!
//! # Design Decisions
//! - The breaker imposes no timeout of its own; the wrapped operation owns
//!   any deadline or cancellation behavior
//! - Open → half-open is evaluated lazily on the next call, never by a
//!   background timer; an idle breaker stays open until traffic resumes
//! - Retry is an explicit policy value, so composition with the breaker is
//!   visible and ordered at the call site instead of hidden in wrappers

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;

pub use circuit_breaker::{
    BreakerSnapshot, CallOutcome, CircuitBreaker, CircuitBreakerManager, CircuitState,
};
pub use retries::RetryPolicy;
