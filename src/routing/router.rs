//! Route registration and lookup for one API version.
//!
//! # Responsibilities
//! - Store immutable route entries keyed by normalized path pattern
//! - Resolve (path, method) to an entry: exact lookup, then pattern scan
//! - Extract placeholder parameters for the matched pattern
//!
//! # Design Decisions
//! - Entries are immutable once registered; re-registration replaces the
//!   whole entry (methods, metadata, handler) atomically
//! - Registry lock is write-held only during (re)registration; lookups
//!   take the read lock and clone the matched entry (the handler is an Arc)
//! - Method mismatch on a matching path reports no-match; the caller maps
//!   that to not-found or method-not-allowed

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, RwLock};

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::routing::matcher::{normalize_path, PathPattern, PatternError};
use crate::transform::NormalizedRequest;

/// Error raised by a handler or the upstream it fronts. Recorded as a
/// circuit breaker failure and surfaced to the caller verbatim.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct UpstreamError(pub String);

/// Async handler bound to a route.
pub type Handler =
    Arc<dyn Fn(NormalizedRequest) -> BoxFuture<'static, Result<Value, UpstreamError>> + Send + Sync>;

/// Route registration error.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error(transparent)]
    BadPattern(#[from] PatternError),

    #[error("route '{0}' has an empty method set")]
    NoMethods(String),
}

/// Registration input for a single route.
#[derive(Clone)]
pub struct RouteDefinition {
    pub path: String,
    pub methods: Vec<String>,
    pub version: String,
    pub description: String,
    /// Name of the upstream dependency the handler calls; the gateway binds
    /// a circuit breaker to it. Empty means derive from the first path
    /// segment.
    pub upstream: String,
    /// Tokens this route costs against the client's bucket.
    pub rate_limit_tokens: u32,
    pub timeout_seconds: f64,
    pub require_auth: bool,
    pub handler: Handler,
}

impl RouteDefinition {
    pub fn new(path: impl Into<String>, methods: &[&str], handler: Handler) -> Self {
        Self {
            path: path.into(),
            methods: methods.iter().map(|m| m.to_string()).collect(),
            version: "v1".to_string(),
            description: String::new(),
            upstream: String::new(),
            rate_limit_tokens: 1,
            timeout_seconds: 30.0,
            require_auth: false,
            handler,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_upstream(mut self, upstream: impl Into<String>) -> Self {
        self.upstream = upstream.into();
        self
    }

    pub fn with_rate_limit_tokens(mut self, tokens: u32) -> Self {
        self.rate_limit_tokens = tokens;
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_require_auth(mut self, required: bool) -> Self {
        self.require_auth = required;
        self
    }
}

/// An immutable registered route.
#[derive(Clone)]
pub struct RouteEntry {
    pub path: String,
    pub methods: HashSet<String>,
    pub version: String,
    pub description: String,
    pub upstream: String,
    pub rate_limit_tokens: u32,
    pub timeout_seconds: f64,
    pub require_auth: bool,
    pub handler: Handler,
    pattern: Arc<PathPattern>,
}

impl RouteEntry {
    /// Extract placeholder parameters from a concrete path.
    pub fn extract_params(&self, path: &str) -> HashMap<String, String> {
        self.pattern.extract(&normalize_path(path))
    }

    fn allows(&self, method: &str) -> bool {
        self.methods.contains(method)
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("path", &self.path)
            .field("methods", &self.methods)
            .field("version", &self.version)
            .field("upstream", &self.upstream)
            .field("rate_limit_tokens", &self.rate_limit_tokens)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("require_auth", &self.require_auth)
            .finish_non_exhaustive()
    }
}

/// Path/method resolution for a single API version.
#[derive(Debug)]
pub struct RequestRouter {
    version: String,
    routes: RwLock<HashMap<String, RouteEntry>>,
}

impl RequestRouter {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            routes: RwLock::new(HashMap::new()),
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Register a route under its normalized path, replacing any previous
    /// entry for that path wholesale.
    pub fn register(&self, definition: RouteDefinition) -> Result<(), RouterError> {
        if definition.methods.is_empty() {
            return Err(RouterError::NoMethods(definition.path));
        }
        let pattern = PathPattern::compile(&definition.path)?;
        let path = pattern.as_str().to_string();

        let upstream = if definition.upstream.is_empty() {
            derive_upstream(&path)
        } else {
            definition.upstream
        };

        let entry = RouteEntry {
            path: path.clone(),
            methods: definition
                .methods
                .iter()
                .map(|m| m.to_uppercase())
                .collect(),
            version: self.version.clone(),
            description: definition.description,
            upstream,
            rate_limit_tokens: definition.rate_limit_tokens,
            timeout_seconds: definition.timeout_seconds,
            require_auth: definition.require_auth,
            handler: definition.handler,
            pattern: Arc::new(pattern),
        };

        let mut routes = self.routes.write().expect("route table lock poisoned");
        let replaced = routes.insert(path.clone(), entry).is_some();
        tracing::debug!(
            version = %self.version,
            path = %path,
            replaced,
            "Route registered"
        );
        Ok(())
    }

    /// Resolve a concrete path and method to a registered entry.
    ///
    /// Exact path lookup wins; otherwise every placeholder pattern under
    /// this version is scanned. Entries whose method set excludes `method`
    /// are skipped, so a path match alone is not enough.
    pub fn find(&self, path: &str, method: &str) -> Option<RouteEntry> {
        let path = normalize_path(path);
        let method = method.to_uppercase();
        let routes = self.routes.read().expect("route table lock poisoned");

        if let Some(entry) = routes.get(&path) {
            if entry.allows(&method) {
                return Some(entry.clone());
            }
        }

        routes
            .values()
            .find(|entry| {
                entry.pattern.has_placeholders()
                    && entry.allows(&method)
                    && entry.pattern.matches(&path)
            })
            .cloned()
    }

    pub fn route_count(&self) -> usize {
        self.routes.read().expect("route table lock poisoned").len()
    }

    /// Registered path patterns, for admin listings.
    pub fn paths(&self) -> Vec<String> {
        self.routes
            .read()
            .expect("route table lock poisoned")
            .keys()
            .cloned()
            .collect()
    }
}

/// First literal path segment, used as the default upstream name.
fn derive_upstream(path: &str) -> String {
    path.split('/')
        .find(|segment| !segment.is_empty() && !segment.starts_with('{'))
        .unwrap_or("root")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop_handler() -> Handler {
        Arc::new(|_req| Box::pin(async { Ok(json!({"ok": true})) }))
    }

    fn route(path: &str, methods: &[&str]) -> RouteDefinition {
        RouteDefinition::new(path, methods, noop_handler())
    }

    #[test]
    fn exact_match_beats_pattern_scan() {
        let router = RequestRouter::new("v1");
        router.register(route("/users/me", &["GET"])).unwrap();
        router.register(route("/users/{id}", &["GET"])).unwrap();

        let entry = router.find("/users/me", "GET").unwrap();
        assert_eq!(entry.path, "/users/me");

        let entry = router.find("/users/42", "GET").unwrap();
        assert_eq!(entry.path, "/users/{id}");
    }

    #[test]
    fn method_set_is_enforced() {
        let router = RequestRouter::new("v1");
        router.register(route("/orders", &["GET", "post"])).unwrap();

        assert!(router.find("/orders", "GET").is_some());
        assert!(router.find("/orders", "POST").is_some());
        assert!(router.find("/orders", "DELETE").is_none());
    }

    #[test]
    fn trailing_slashes_normalize_on_both_sides() {
        let router = RequestRouter::new("v1");
        router.register(route("/orders/", &["GET"])).unwrap();
        assert!(router.find("/orders", "GET").is_some());
        assert!(router.find("/orders/", "GET").is_some());
    }

    #[test]
    fn reregistration_replaces_the_whole_entry() {
        let router = RequestRouter::new("v1");
        router.register(route("/orders", &["GET"])).unwrap();
        router
            .register(route("/orders", &["POST"]).with_rate_limit_tokens(5))
            .unwrap();

        assert_eq!(router.route_count(), 1);
        assert!(router.find("/orders", "GET").is_none());
        let entry = router.find("/orders", "POST").unwrap();
        assert_eq!(entry.rate_limit_tokens, 5);
    }

    #[test]
    fn placeholder_does_not_swallow_extra_segments() {
        let router = RequestRouter::new("v1");
        router.register(route("/users/{id}", &["GET"])).unwrap();
        assert!(router.find("/users/42/posts", "GET").is_none());
    }

    #[test]
    fn extract_params_via_matched_entry() {
        let router = RequestRouter::new("v1");
        router
            .register(route("/users/{id}/posts/{post_id}", &["GET"]))
            .unwrap();

        let entry = router.find("/users/7/posts/9", "GET").unwrap();
        let params = entry.extract_params("/users/7/posts/9");
        assert_eq!(params["id"], "7");
        assert_eq!(params["post_id"], "9");
    }

    #[test]
    fn empty_method_set_is_rejected() {
        let router = RequestRouter::new("v1");
        assert!(matches!(
            router.register(route("/orders", &[])),
            Err(RouterError::NoMethods(_))
        ));
    }

    #[test]
    fn upstream_defaults_to_first_literal_segment() {
        let router = RequestRouter::new("v1");
        router.register(route("/orders/{id}", &["GET"])).unwrap();
        let entry = router.find("/orders/5", "GET").unwrap();
        assert_eq!(entry.upstream, "orders");

        router
            .register(route("/quotes", &["GET"]).with_upstream("pricing"))
            .unwrap();
        assert_eq!(router.find("/quotes", "GET").unwrap().upstream, "pricing");
    }
}
