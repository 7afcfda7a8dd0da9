//! End-to-end pipeline tests for the gateway core.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time;

use gateway_core::config::{CircuitBreakerConfig, GatewayConfig, RateLimitConfig};
use gateway_core::routing::{Handler, RouteDefinition};
use gateway_core::{CircuitState, Gateway};

fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit = RateLimitConfig {
        capacity: 10.0,
        refill_rate: 1.0,
        window_size: 3600.0,
    };
    config.circuit_breaker = CircuitBreakerConfig {
        failure_threshold: 2,
        success_threshold: 1,
        timeout_seconds: 5.0,
    };
    config
}

fn echo_handler() -> Handler {
    Arc::new(|req| {
        Box::pin(async move {
            Ok(json!({
                "path": req.path,
                "params": req.path_params,
                "version": req.metadata.version,
            }))
        })
    })
}

fn counting_handler(calls: Arc<AtomicU32>, healthy: bool) -> Handler {
    Arc::new(move |_req| {
        let calls = calls.clone();
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            if healthy {
                Ok(json!({"status": "ok"}))
            } else {
                Err(gateway_core::routing::UpstreamError("backend down".into()))
            }
        })
    })
}

fn no_headers() -> HashMap<String, String> {
    HashMap::new()
}

#[tokio::test]
async fn success_flow_produces_the_standard_envelope() {
    let gateway = Gateway::new(test_config()).unwrap();
    gateway
        .register_route(
            RouteDefinition::new("/users/{id}", &["GET"], echo_handler()).with_version("v1"),
        )
        .unwrap();

    let mut headers = no_headers();
    headers.insert("x-correlation-id".to_string(), "cid-42".to_string());

    let response = gateway
        .handle("client-a", "/users/7", "GET", &headers, None, None)
        .await;

    assert_eq!(response["success"], true);
    assert_eq!(response["status_code"], 200);
    assert_eq!(response["correlation_id"], "cid-42");
    assert_eq!(response["data"]["params"]["id"], "7");
    assert_eq!(response["data"]["version"], "v1");
}

#[tokio::test]
async fn unknown_route_maps_to_not_found() {
    let gateway = Gateway::new(test_config()).unwrap();

    let response = gateway
        .handle("client-a", "/nowhere", "GET", &no_headers(), None, None)
        .await;

    assert_eq!(response["success"], false);
    assert_eq!(response["status_code"], 404);
    assert_eq!(response["error"]["type"], "route_not_found");
}

#[tokio::test]
async fn versions_partition_the_route_space() {
    let gateway = Gateway::new(test_config()).unwrap();
    let v1: Handler = Arc::new(|_req| Box::pin(async { Ok(json!({"api": 1})) }));
    let v2: Handler = Arc::new(|_req| Box::pin(async { Ok(json!({"api": 2})) }));
    // The version path segment picks the router, so the registered path
    // includes it; the same logical path binds different handlers per
    // version.
    gateway
        .register_route(RouteDefinition::new("/v1/reports", &["GET"], v1).with_version("v1"))
        .unwrap();
    gateway
        .register_route(RouteDefinition::new("/v2/reports", &["GET"], v2).with_version("v2"))
        .unwrap();

    let one = gateway
        .handle("c", "/v1/reports", "GET", &no_headers(), None, None)
        .await;
    let two = gateway
        .handle("c", "/v2/reports", "GET", &no_headers(), None, None)
        .await;
    assert_eq!(one["data"]["api"], 1);
    assert_eq!(two["data"]["api"], 2);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_denial_carries_retry_after() {
    let gateway = Gateway::new(test_config()).unwrap();
    gateway
        .register_route(RouteDefinition::new("/ping", &["GET"], echo_handler()))
        .unwrap();

    for _ in 0..10 {
        let response = gateway
            .handle("greedy", "/ping", "GET", &no_headers(), None, None)
            .await;
        assert_eq!(response["status_code"], 200);
    }

    let denied = gateway
        .handle("greedy", "/ping", "GET", &no_headers(), None, None)
        .await;
    assert_eq!(denied["status_code"], 429);
    assert_eq!(denied["error"]["type"], "rate_limited");
    assert_eq!(denied["error"]["details"]["retry_after"], 1);

    // Other clients are unaffected.
    let other = gateway
        .handle("modest", "/ping", "GET", &no_headers(), None, None)
        .await;
    assert_eq!(other["status_code"], 200);
}

#[tokio::test(start_paused = true)]
async fn breaker_opens_fails_fast_and_recovers() {
    let gateway = Gateway::new(test_config()).unwrap();
    let failing_calls = Arc::new(AtomicU32::new(0));
    gateway
        .register_route(
            RouteDefinition::new(
                "/orders",
                &["POST"],
                counting_handler(failing_calls.clone(), false),
            )
            .with_upstream("orders"),
        )
        .unwrap();

    // failure_threshold = 2: two upstream faults open the breaker.
    for _ in 0..2 {
        let response = gateway
            .handle("c", "/orders", "POST", &no_headers(), None, None)
            .await;
        assert_eq!(response["status_code"], 502);
        assert_eq!(response["error"]["type"], "upstream_error");
        assert_eq!(response["error"]["message"], "backend down");
    }
    assert_eq!(failing_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        gateway.breakers().get("orders").unwrap().get_state().state,
        CircuitState::Open
    );

    // While open, calls fail fast without touching the handler.
    let rejected = gateway
        .handle("c", "/orders", "POST", &no_headers(), None, None)
        .await;
    assert_eq!(rejected["status_code"], 503);
    assert_eq!(rejected["error"]["type"], "circuit_open");
    assert_eq!(failing_calls.load(Ordering::SeqCst), 2);

    // After the cool-down, the next call is actually attempted. Swap in a
    // healthy handler by re-registering the route (replacement semantics).
    let healthy_calls = Arc::new(AtomicU32::new(0));
    gateway
        .register_route(
            RouteDefinition::new(
                "/orders",
                &["POST"],
                counting_handler(healthy_calls.clone(), true),
            )
            .with_upstream("orders"),
        )
        .unwrap();

    time::advance(Duration::from_secs(5)).await;
    let recovered = gateway
        .handle("c", "/orders", "POST", &no_headers(), None, None)
        .await;
    assert_eq!(recovered["status_code"], 200);
    assert_eq!(healthy_calls.load(Ordering::SeqCst), 1);
    // success_threshold = 1, so the probe closed the breaker.
    assert_eq!(
        gateway.breakers().get("orders").unwrap().get_state().state,
        CircuitState::Closed
    );
}

#[tokio::test(start_paused = true)]
async fn hung_upstream_counts_as_a_breaker_failure() {
    let gateway = Gateway::new(test_config()).unwrap();
    let hang: Handler = Arc::new(|_req| {
        Box::pin(async {
            time::sleep(Duration::from_secs(3600)).await;
            Ok(Value::Null)
        })
    });
    gateway
        .register_route(
            RouteDefinition::new("/slow", &["GET"], hang)
                .with_upstream("slow")
                .with_timeout_seconds(1.0),
        )
        .unwrap();

    let response = gateway
        .handle("c", "/slow", "GET", &no_headers(), None, None)
        .await;
    assert_eq!(response["status_code"], 502);
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("timed out"));
    assert_eq!(
        gateway
            .breakers()
            .get("slow")
            .unwrap()
            .get_state()
            .failure_count,
        1
    );
}

#[tokio::test]
async fn auth_required_routes_gate_on_credentials() {
    let gateway = Gateway::new(test_config()).unwrap();
    gateway
        .register_route(
            RouteDefinition::new("/private", &["GET"], echo_handler()).with_require_auth(true),
        )
        .unwrap();

    let denied = gateway
        .handle("c", "/private", "GET", &no_headers(), None, None)
        .await;
    assert_eq!(denied["status_code"], 401);
    assert_eq!(denied["error"]["type"], "unauthorized");

    let mut headers = no_headers();
    headers.insert("Authorization".to_string(), "Bearer t0ken".to_string());
    let allowed = gateway
        .handle("c", "/private", "GET", &headers, None, None)
        .await;
    assert_eq!(allowed["status_code"], 200);
}

#[tokio::test]
async fn invalid_config_fails_construction_with_all_violations() {
    let mut config = GatewayConfig::default();
    config.rate_limit.capacity = -1.0;
    config.circuit_breaker.success_threshold = 0;

    let err = Gateway::new(config).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("rate_limit.capacity"));
    assert!(message.contains("circuit_breaker.success_threshold"));
}

#[tokio::test]
async fn correlation_id_is_minted_when_absent() {
    let gateway = Gateway::new(test_config()).unwrap();
    gateway
        .register_route(RouteDefinition::new("/ping", &["GET"], echo_handler()))
        .unwrap();

    let a = gateway
        .handle("c", "/ping", "GET", &no_headers(), None, None)
        .await;
    let b = gateway
        .handle("c", "/ping", "GET", &no_headers(), None, None)
        .await;

    let id_a = a["correlation_id"].as_str().unwrap();
    let id_b = b["correlation_id"].as_str().unwrap();
    assert!(!id_a.is_empty());
    assert_ne!(id_a, id_b);
}
