//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacity > 0, thresholds >= 1)
//! - Reject non-finite numeric settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ConfigViolation>>
//! - Runs before a config is accepted into the system, so bad values fail
//!   at construction time rather than on first use

use crate::config::schema::GatewayConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic violation, scoped to the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ConfigViolation {
    /// Dotted path of the offending field, e.g. `rate_limit.capacity`.
    pub field: &'static str,
    pub message: String,
}

fn violation(field: &'static str, message: impl Into<String>) -> ConfigViolation {
    ConfigViolation {
        field,
        message: message.into(),
    }
}

/// Validate a configuration, collecting every violation.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ConfigViolation>> {
    let mut errors = Vec::new();

    let rl = &config.rate_limit;
    if !(rl.capacity > 0.0 && rl.capacity.is_finite()) {
        errors.push(violation(
            "rate_limit.capacity",
            format!("must be a positive finite number, got {}", rl.capacity),
        ));
    }
    if !(rl.refill_rate >= 0.0 && rl.refill_rate.is_finite()) {
        errors.push(violation(
            "rate_limit.refill_rate",
            format!("must be a non-negative finite number, got {}", rl.refill_rate),
        ));
    }
    if !(rl.window_size > 0.0 && rl.window_size.is_finite()) {
        errors.push(violation(
            "rate_limit.window_size",
            format!("must be a positive finite number, got {}", rl.window_size),
        ));
    }

    let cb = &config.circuit_breaker;
    if cb.failure_threshold == 0 {
        errors.push(violation(
            "circuit_breaker.failure_threshold",
            "must be at least 1",
        ));
    }
    if cb.success_threshold == 0 {
        errors.push(violation(
            "circuit_breaker.success_threshold",
            "must be at least 1",
        ));
    }
    if !(cb.timeout_seconds >= 0.0 && cb.timeout_seconds.is_finite()) {
        errors.push(violation(
            "circuit_breaker.timeout_seconds",
            format!("must be a non-negative finite number, got {}", cb.timeout_seconds),
        ));
    }

    let retry = &config.retry;
    if retry.max_attempts == 0 {
        errors.push(violation("retry.max_attempts", "must be at least 1"));
    }
    if !(retry.backoff_factor >= 1.0 && retry.backoff_factor.is_finite()) {
        errors.push(violation(
            "retry.backoff_factor",
            format!("must be >= 1.0, got {}", retry.backoff_factor),
        ));
    }

    let level = config.observability.log_level.as_str();
    if !LOG_LEVELS.contains(&level) {
        errors.push(violation(
            "observability.log_level",
            format!("unknown level '{level}', expected one of {LOG_LEVELS:?}"),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
