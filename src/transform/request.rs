//! Inbound request normalization.
//!
//! # Responsibilities
//! - Canonicalize path, method, and header keys
//! - Derive the API version from the path (default v1)
//! - Propagate or mint a correlation id (UUID v4) for traceability
//! - Stamp request time and client metadata
//!
//! # Design Decisions
//! - Never raises on malformed input: a non-object body is coerced to an
//!   empty object, so downstream code can always treat the body as a map
//! - Correlation ids are minted with a UUID-class generator, so they stay
//!   collision-resistant under concurrent request processing

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::routing::matcher::normalize_path;

const CORRELATION_HEADER: &str = "x-correlation-id";

/// Per-request metadata, discarded once the response is emitted.
#[derive(Debug, Clone, Serialize)]
pub struct RequestMetadata {
    pub correlation_id: String,
    /// Epoch seconds at normalization time.
    pub request_time: f64,
    pub client_ip: String,
    pub user_agent: String,
    pub version: String,
}

/// Canonical request shape consumed by routing and handlers.
#[derive(Debug, Clone)]
pub struct NormalizedRequest {
    pub path: String,
    pub method: String,
    /// Header keys lower-cased for case-insensitive lookup.
    pub headers: HashMap<String, String>,
    /// Always an object; malformed bodies collapse to empty.
    pub body: Map<String, Value>,
    pub query_params: HashMap<String, String>,
    /// Placeholder captures, filled in after routing.
    pub path_params: HashMap<String, String>,
    pub metadata: RequestMetadata,
}

/// Inbound normalization. Stateless; one instance serves all requests.
#[derive(Debug, Default, Clone)]
pub struct RequestTransformer;

impl RequestTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a raw request into the canonical shape.
    pub fn transform(
        &self,
        path: &str,
        method: &str,
        headers: &HashMap<String, String>,
        body: Option<Value>,
        query_params: Option<HashMap<String, String>>,
    ) -> NormalizedRequest {
        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.clone()))
            .collect();

        let correlation_id = headers
            .get(CORRELATION_HEADER)
            .filter(|v| !v.is_empty())
            .cloned()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let body = match body {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        let query_params = query_params
            .unwrap_or_default()
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect();

        let metadata = RequestMetadata {
            correlation_id,
            request_time: epoch_seconds(),
            client_ip: client_ip_from(&headers),
            user_agent: headers.get("user-agent").cloned().unwrap_or_default(),
            version: version_from_path(path),
        };

        NormalizedRequest {
            path: normalize_path(path),
            method: method.to_uppercase(),
            headers,
            body,
            query_params,
            path_params: HashMap::new(),
            metadata,
        }
    }
}

/// Epoch seconds as a float, matching envelope timestamps.
pub(crate) fn epoch_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// First `v<digits>` path segment, lower-cased; `v1` when absent.
fn version_from_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_lowercase)
        .find(|segment| {
            segment
                .strip_prefix('v')
                .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()))
        })
        .unwrap_or_else(|| "v1".to_string())
}

/// First hop of x-forwarded-for, then x-real-ip, then "unknown".
fn client_ip_from(headers: &HashMap<String, String>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    headers
        .get("x-real-ip")
        .cloned()
        .unwrap_or_else(|| "unknown".to_string())
}
