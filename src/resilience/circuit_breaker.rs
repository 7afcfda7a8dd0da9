//! Circuit breaker for upstream dependency protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: dependency assumed down, calls fail fast without invoking it
//! - Half-Open: trialing whether the dependency recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures reach failure_threshold
//! Open → Half-Open: next call after timeout_seconds elapse (lazy, no timer)
//! Half-Open → Closed: consecutive successes reach success_threshold
//! Half-Open → Open: any single failure while trialing
//! ```
//!
//! # Design Decisions
//! - Per-dependency breaker (not global), registered by name
//! - Fail fast in Open: the wrapped operation's future is never polled
//! - Any error from the wrapped operation is a failure; the "catch
//!   everything, record as failure" contract is the caller contract here,
//!   and true unhandled panics stay outside this boundary
//! - Failures are counted since the last success, not lifetime

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Breaker state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_time: Option<Instant>,
    open_time: Option<Instant>,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            last_failure_time: None,
            open_time: None,
        }
    }
}

/// Uniform envelope returned by [`CircuitBreaker::call`].
///
/// Expected negative outcomes (open circuit, upstream fault) are carried
/// here as data, never raised, so callers cannot forget to branch.
#[derive(Debug, Clone, Serialize)]
pub struct CallOutcome<T> {
    pub success: bool,
    pub result: Option<T>,
    pub error: Option<String>,
    pub state: CircuitState,
    /// True when the call was refused without invoking the operation.
    pub rejected: bool,
}

/// Read-only snapshot for observability. Times are seconds since the
/// breaker was created.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub last_failure_time: Option<f64>,
    pub open_time: Option<f64>,
}

/// Fault-isolation state machine guarding one named upstream dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    created_at: Instant,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            created_at: Instant::now(),
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke `op` through the breaker.
    ///
    /// While Open (cool-down not elapsed) the operation is never polled and
    /// the envelope reports the rejection. Otherwise the operation runs; an
    /// `Err` is recorded as a failure and its message surfaced verbatim, an
    /// `Ok` is recorded as a success. The lock is never held across the
    /// await.
    pub async fn call<F, Fut, T, E>(&self, op: F) -> CallOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        if !self.admit() {
            metrics::record_circuit_rejection(&self.name);
            return CallOutcome {
                success: false,
                result: None,
                error: Some("circuit breaker is OPEN".to_string()),
                state: CircuitState::Open,
                rejected: true,
            };
        }

        match op().await {
            Ok(value) => {
                let state = self.record_success();
                CallOutcome {
                    success: true,
                    result: Some(value),
                    error: None,
                    state,
                    rejected: false,
                }
            }
            Err(err) => {
                let state = self.record_failure();
                CallOutcome {
                    success: false,
                    result: None,
                    error: Some(err.to_string()),
                    state,
                    rejected: false,
                }
            }
        }
    }

    /// Administrative override back to Closed with zero counters,
    /// independent of the state machine.
    pub fn reset(&self) {
        let mut inner = self.lock();
        *inner = BreakerInner::new();
        tracing::info!(breaker = %self.name, "Breaker manually reset to closed");
    }

    /// Read-only state snapshot.
    pub fn get_state(&self) -> BreakerSnapshot {
        let inner = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            success_count: inner.success_count,
            last_failure_time: inner
                .last_failure_time
                .map(|t| t.duration_since(self.created_at).as_secs_f64()),
            open_time: inner
                .open_time
                .map(|t| t.duration_since(self.created_at).as_secs_f64()),
        }
    }

    /// Decide whether a call may proceed, performing the lazy
    /// Open → Half-Open transition when the cool-down has elapsed.
    fn admit(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != CircuitState::Open {
            return true;
        }

        let cooled_down = inner
            .open_time
            .map(|t| t.elapsed().as_secs_f64() >= self.config.timeout_seconds)
            .unwrap_or(true);
        if cooled_down {
            inner.state = CircuitState::HalfOpen;
            inner.success_count = 0;
            metrics::record_circuit_transition(&self.name, CircuitState::HalfOpen);
            tracing::info!(breaker = %self.name, "Cool-down elapsed, trialing half-open");
            true
        } else {
            false
        }
    }

    fn record_success(&self) -> CircuitState {
        let mut inner = self.lock();
        // Failures are counted since the last success.
        inner.failure_count = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.success_count += 1;
            if inner.success_count >= self.config.success_threshold {
                inner.state = CircuitState::Closed;
                inner.success_count = 0;
                inner.open_time = None;
                metrics::record_circuit_transition(&self.name, CircuitState::Closed);
                tracing::info!(breaker = %self.name, "Trial succeeded, breaker closed");
            }
        }
        inner.state
    }

    fn record_failure(&self) -> CircuitState {
        let mut inner = self.lock();
        inner.failure_count += 1;
        inner.last_failure_time = Some(Instant::now());

        match inner.state {
            CircuitState::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.open_time = Some(Instant::now());
                    metrics::record_circuit_transition(&self.name, CircuitState::Open);
                    tracing::warn!(
                        breaker = %self.name,
                        failures = inner.failure_count,
                        "Failure threshold reached, breaker opened"
                    );
                }
            }
            CircuitState::HalfOpen => {
                // One failed trial reopens immediately.
                inner.state = CircuitState::Open;
                inner.open_time = Some(Instant::now());
                inner.success_count = 0;
                metrics::record_circuit_transition(&self.name, CircuitState::Open);
                tracing::warn!(breaker = %self.name, "Trial failed, breaker reopened");
            }
            CircuitState::Open => {}
        }
        inner.state
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().expect("circuit breaker mutex poisoned")
    }
}

/// Name-keyed registry of circuit breakers.
///
/// Explicitly constructed and owned by the gateway host; never a global.
#[derive(Debug, Default)]
pub struct CircuitBreakerManager {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a breaker under `name`, or return the live one if the name
    /// is already taken. Idempotent so repeated configuration loads never
    /// silently reset in-flight breaker state.
    pub fn register(&self, name: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        match self.breakers.entry(name.to_string()) {
            Entry::Occupied(existing) => {
                tracing::warn!(breaker = name, "Already registered, keeping live breaker");
                existing.get().clone()
            }
            Entry::Vacant(slot) => {
                tracing::debug!(breaker = name, "Registered new breaker");
                slot.insert(Arc::new(CircuitBreaker::new(name, config))).clone()
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| entry.value().clone())
    }

    /// Manually reset one breaker. Returns false for unknown names.
    pub fn reset(&self, name: &str) -> bool {
        match self.get(name) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Snapshot every registered breaker, for dashboards and admin surfaces.
    pub fn snapshot_all(&self) -> Vec<BreakerSnapshot> {
        self.breakers
            .iter()
            .map(|entry| entry.value().get_state())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tokio::time;

    fn config(failure_threshold: u32, success_threshold: u32, timeout_seconds: f64) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold,
            success_threshold,
            timeout_seconds,
        }
    }

    async fn fail(breaker: &CircuitBreaker) -> CallOutcome<&'static str> {
        breaker
            .call(|| async { Err::<&str, _>("upstream exploded") })
            .await
    }

    async fn succeed(breaker: &CircuitBreaker) -> CallOutcome<&'static str> {
        breaker.call(|| async { Ok::<_, String>("ok") }).await
    }

    #[tokio::test]
    async fn opens_exactly_on_the_threshold() {
        let breaker = CircuitBreaker::new("upstream", config(3, 1, 60.0));

        assert_eq!(fail(&breaker).await.state, CircuitState::Closed);
        assert_eq!(fail(&breaker).await.state, CircuitState::Closed);
        assert_eq!(fail(&breaker).await.state, CircuitState::Open);
    }

    #[tokio::test]
    async fn success_resets_the_failure_count() {
        let breaker = CircuitBreaker::new("upstream", config(3, 1, 60.0));

        fail(&breaker).await;
        fail(&breaker).await;
        succeed(&breaker).await;
        assert_eq!(breaker.get_state().failure_count, 0);

        // Two more failures are not enough to open after the reset.
        fail(&breaker).await;
        fail(&breaker).await;
        assert_eq!(breaker.get_state().state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn open_breaker_never_invokes_the_operation() {
        let breaker = CircuitBreaker::new("upstream", config(1, 1, 60.0));
        fail(&breaker).await;
        assert_eq!(breaker.get_state().state, CircuitState::Open);

        let invocations = AtomicU32::new(0);
        for _ in 0..5 {
            let outcome = breaker
                .call(|| async {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(())
                })
                .await;
            assert!(!outcome.success);
            assert!(outcome.rejected);
            assert_eq!(outcome.state, CircuitState::Open);
            assert_eq!(outcome.error.as_deref(), Some("circuit breaker is OPEN"));
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_is_entered_before_the_trial_runs() {
        let breaker = CircuitBreaker::new("upstream", config(1, 1, 5.0));
        fail(&breaker).await;

        time::advance(Duration::from_secs(5)).await;

        let outcome = breaker
            .call(|| async {
                // Runs only after the lazy transition.
                Ok::<_, String>("probe")
            })
            .await;
        assert!(outcome.success);
        // success_threshold = 1, so the probe closed the breaker.
        assert_eq!(outcome.state, CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_trial_reopens_and_clears_successes() {
        let breaker = CircuitBreaker::new("upstream", config(1, 2, 5.0));
        fail(&breaker).await;

        time::advance(Duration::from_secs(5)).await;
        succeed(&breaker).await;
        assert_eq!(breaker.get_state().state, CircuitState::HalfOpen);
        assert_eq!(breaker.get_state().success_count, 1);

        let outcome = fail(&breaker).await;
        assert_eq!(outcome.state, CircuitState::Open);
        assert_eq!(breaker.get_state().success_count, 0);

        // The cool-down restarted; an immediate call is still refused.
        let refused = succeed(&breaker).await;
        assert!(refused.rejected);
    }

    #[tokio::test(start_paused = true)]
    async fn close_requires_the_full_success_streak() {
        let breaker = CircuitBreaker::new("upstream", config(1, 2, 5.0));
        fail(&breaker).await;
        time::advance(Duration::from_secs(5)).await;

        assert_eq!(succeed(&breaker).await.state, CircuitState::HalfOpen);
        assert_eq!(succeed(&breaker).await.state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn upstream_error_is_surfaced_verbatim() {
        let breaker = CircuitBreaker::new("upstream", config(5, 1, 60.0));
        let outcome = fail(&breaker).await;
        assert!(!outcome.success);
        assert!(!outcome.rejected);
        assert_eq!(outcome.error.as_deref(), Some("upstream exploded"));
    }

    #[tokio::test]
    async fn manual_reset_overrides_open_state() {
        let breaker = CircuitBreaker::new("upstream", config(1, 1, 3600.0));
        fail(&breaker).await;
        assert_eq!(breaker.get_state().state, CircuitState::Open);

        breaker.reset();
        let snapshot = breaker.get_state();
        assert_eq!(snapshot.state, CircuitState::Closed);
        assert_eq!(snapshot.failure_count, 0);
        assert_eq!(snapshot.open_time, None);
        assert!(succeed(&breaker).await.success);
    }

    #[tokio::test]
    async fn manager_registration_is_idempotent() {
        let manager = CircuitBreakerManager::new();
        let first = manager.register("orders", config(1, 1, 60.0));
        fail(&first).await;

        // Re-registering must hand back the live breaker, open state intact.
        let second = manager.register("orders", config(99, 1, 60.0));
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.get_state().state, CircuitState::Open);
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn manager_reset_and_snapshots() {
        let manager = CircuitBreakerManager::new();
        let orders = manager.register("orders", config(1, 1, 60.0));
        manager.register("quotes", config(1, 1, 60.0));
        fail(&orders).await;

        let snapshots = manager.snapshot_all();
        assert_eq!(snapshots.len(), 2);

        assert!(manager.reset("orders"));
        assert_eq!(manager.get("orders").unwrap().get_state().state, CircuitState::Closed);
        assert!(!manager.reset("unknown"));
    }
}
