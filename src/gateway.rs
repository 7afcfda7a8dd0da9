//! Gateway pipeline orchestration.
//!
//! # Data Flow
//! ```text
//! handle(client_id, path, method, headers, body, query)
//!     → transform: normalize shape, stamp metadata
//!     → routing: resolve (path, method, version)
//!     → admission: charge the route's token cost to the client bucket
//!     → resilience: invoke the handler through the upstream's breaker
//!     → transform: success or error envelope, correlation id echoed
//! ```
//!
//! # Design Decisions
//! - All registries are owned by the Gateway value and injected at
//!   construction; nothing lives in module-level globals
//! - Expected negative outcomes (denial, open circuit, no route) come back
//!   as error envelopes with mapped status codes, never as panics
//! - The route's timeout is applied around the handler inside the breaker
//!   call, so a hung upstream counts as a breaker failure

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{json, Value};

use crate::admission::RateLimiter;
use crate::config::{validate_config, ConfigError, GatewayConfig};
use crate::observability::metrics;
use crate::resilience::{CircuitBreakerManager, RetryPolicy};
use crate::routing::router::UpstreamError;
use crate::routing::{RequestRouterManager, RouteDefinition, RouterError};
use crate::transform::{
    NormalizedRequest, RequestTransformer, ResponseTransformer, ValidationError,
};

/// Gateway error taxonomy.
///
/// Each variant maps to one response class; [`Gateway::error_envelope`]
/// performs that mapping for the pipeline and for hosts that drive the
/// components directly.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Option<u64> },

    #[error("circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    #[error("no route for {method} {path} ({version})")]
    RouteNotFound {
        path: String,
        method: String,
        version: String,
    },

    #[error("missing credentials")]
    Unauthorized,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl GatewayError {
    /// Response status code for this error class.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::RateLimited { .. } => 429,
            GatewayError::CircuitOpen { .. } => 503,
            GatewayError::RouteNotFound { .. } => 404,
            GatewayError::Unauthorized => 401,
            GatewayError::Validation(_) => 400,
            GatewayError::Upstream(_) => 502,
            GatewayError::Config(_) => 500,
        }
    }

    /// Open error-type label for the error envelope.
    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::CircuitOpen { .. } => "circuit_open",
            GatewayError::RouteNotFound { .. } => "route_not_found",
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::Validation(_) => "validation_error",
            GatewayError::Upstream(_) => "upstream_error",
            GatewayError::Config(_) => "configuration_error",
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            GatewayError::RateLimited { retry_after } => {
                Some(json!({ "retry_after": retry_after }))
            }
            GatewayError::CircuitOpen { name } => Some(json!({ "upstream": name })),
            GatewayError::Validation(fault) => Some(json!({ "field": fault.field })),
            _ => None,
        }
    }
}

/// The gateway core: admission, fault isolation, routing, and
/// normalization behind one entry point.
///
/// Constructed explicitly by the host and shared (e.g. in an `Arc`) across
/// its request-processing tasks.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    rate_limiter: RateLimiter,
    breakers: CircuitBreakerManager,
    routers: RequestRouterManager,
    retry_policy: RetryPolicy,
    request_transformer: RequestTransformer,
    response_transformer: ResponseTransformer,
}

impl Gateway {
    /// Build a gateway from a validated configuration. All semantic config
    /// violations are reported together, at construction time.
    pub fn new(config: GatewayConfig) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        Ok(Self {
            rate_limiter: RateLimiter::new(config.rate_limit.clone()),
            breakers: CircuitBreakerManager::new(),
            routers: RequestRouterManager::new(),
            retry_policy: RetryPolicy::from_config(&config.retry),
            request_transformer: RequestTransformer::new(),
            response_transformer: ResponseTransformer::new(),
            config,
        })
    }

    pub fn register_route(&self, definition: RouteDefinition) -> Result<(), RouterError> {
        self.routers.register_route(definition)
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn breakers(&self) -> &CircuitBreakerManager {
        &self.breakers
    }

    pub fn routers(&self) -> &RequestRouterManager {
        &self.routers
    }

    /// Default retry policy derived from the config, for hosts composing
    /// retries around `handle` or around individual breaker calls.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Run one request through the full pipeline and produce the response
    /// envelope. Expected negative outcomes become error envelopes, never
    /// panics.
    pub async fn handle(
        &self,
        client_id: &str,
        path: &str,
        method: &str,
        headers: &HashMap<String, String>,
        body: Option<Value>,
        query_params: Option<HashMap<String, String>>,
    ) -> Value {
        let request =
            self.request_transformer
                .transform(path, method, headers, body, query_params);
        let correlation_id = request.metadata.correlation_id.clone();
        if self.config.observability.metrics_enabled {
            metrics::record_request(&request.metadata.version, &request.method);
        }

        match self.dispatch(client_id, request).await {
            Ok(data) => self
                .response_transformer
                .transform(data, 200, Some(&correlation_id), None),
            Err(err) => self.error_envelope(&err, Some(&correlation_id)),
        }
    }

    /// Map an error to its response envelope.
    pub fn error_envelope(&self, err: &GatewayError, correlation_id: Option<&str>) -> Value {
        self.response_transformer.transform_error(
            err.status_code(),
            &err.to_string(),
            err.error_type(),
            correlation_id,
            err.details(),
        )
    }

    async fn dispatch(
        &self,
        client_id: &str,
        mut request: NormalizedRequest,
    ) -> Result<Value, GatewayError> {
        let route = self
            .routers
            .find_route(&request.path, &request.method, &request.metadata.version)
            .ok_or_else(|| {
                if self.config.observability.metrics_enabled {
                    metrics::record_route_miss(&request.metadata.version);
                }
                GatewayError::RouteNotFound {
                    path: request.path.clone(),
                    method: request.method.clone(),
                    version: request.metadata.version.clone(),
                }
            })?;

        // Presence gate only; credential verification belongs to the host.
        if route.require_auth && !request.headers.contains_key("authorization") {
            return Err(GatewayError::Unauthorized);
        }

        let decision = self
            .rate_limiter
            .is_allowed(client_id, route.rate_limit_tokens);
        if !decision.allowed {
            return Err(GatewayError::RateLimited {
                retry_after: decision.retry_after,
            });
        }

        request.path_params = route.extract_params(&request.path);

        let breaker = self
            .breakers
            .register(&route.upstream, self.config.circuit_breaker.clone());
        let timeout = Duration::from_secs_f64(route.timeout_seconds.max(0.0));
        let handler = route.handler.clone();
        let outcome = breaker
            .call(move || async move {
                match tokio::time::timeout(timeout, (handler)(request)).await {
                    Ok(result) => result,
                    Err(_) => Err(UpstreamError(format!(
                        "upstream timed out after {:.1}s",
                        timeout.as_secs_f64()
                    ))),
                }
            })
            .await;

        if outcome.rejected {
            return Err(GatewayError::CircuitOpen {
                name: route.upstream.clone(),
            });
        }
        match (outcome.success, outcome.result) {
            (true, Some(data)) => Ok(data),
            _ => Err(GatewayError::Upstream(outcome.error.unwrap_or_else(|| {
                "upstream failed without detail".to_string()
            }))),
        }
    }
}
