//! Gateway metrics recording.
//!
//! Counters only; the host decides whether to install a recorder and how to
//! export. With no recorder installed these calls are no-ops.

use metrics::counter;

use crate::resilience::CircuitState;

/// Count a request entering the pipeline.
pub fn record_request(version: &str, method: &str) {
    counter!(
        "gateway_requests_total",
        "version" => version.to_string(),
        "method" => method.to_string()
    )
    .increment(1);
}

/// Count a rate-limit denial.
pub fn record_rate_limited() {
    counter!("gateway_rate_limited_total").increment(1);
}

/// Count a fail-fast rejection by an open breaker.
pub fn record_circuit_rejection(breaker: &str) {
    counter!("gateway_circuit_rejections_total", "breaker" => breaker.to_string()).increment(1);
}

/// Count a breaker state transition.
pub fn record_circuit_transition(breaker: &str, to: CircuitState) {
    counter!(
        "gateway_circuit_transitions_total",
        "breaker" => breaker.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
}

/// Count a request that matched no route.
pub fn record_route_miss(version: &str) {
    counter!("gateway_route_misses_total", "version" => version.to_string()).increment(1);
}
