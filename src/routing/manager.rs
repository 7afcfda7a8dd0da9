//! Version-partitioned routing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::routing::router::{RequestRouter, RouteDefinition, RouteEntry, RouterError};

/// Canonicalize a version token to lowercase `vN`, defaulting to `v1`.
///
/// `"1"`, `"V2"`, and `"v10"` all canonicalize; anything unrecognizable
/// (including the empty string) falls back to `v1`.
pub fn normalize_version(version: &str) -> String {
    let token = version.trim().to_lowercase();
    if token.is_empty() {
        return "v1".to_string();
    }
    if let Some(digits) = token.strip_prefix('v') {
        if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
            return token;
        }
    }
    if token.chars().all(|c| c.is_ascii_digit()) {
        return format!("v{token}");
    }
    "v1".to_string()
}

/// One [`RequestRouter`] per canonical version.
///
/// Keeping the versions in separate routers means a v1 and a v2
/// registration of the same logical path never interfere and may bind
/// independent handlers.
#[derive(Debug, Default)]
pub struct RequestRouterManager {
    routers: RwLock<HashMap<String, Arc<RequestRouter>>>,
}

impl RequestRouterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route under its (canonicalized) version.
    pub fn register_route(&self, definition: RouteDefinition) -> Result<(), RouterError> {
        let version = normalize_version(&definition.version);
        let router = self.router_for(&version);
        router.register(RouteDefinition {
            version: version.clone(),
            ..definition
        })
    }

    /// Resolve (path, method, version) to a route entry.
    pub fn find_route(&self, path: &str, method: &str, version: &str) -> Option<RouteEntry> {
        let version = normalize_version(version);
        let router = {
            let routers = self.routers.read().expect("router table lock poisoned");
            routers.get(&version).cloned()
        };
        router.and_then(|r| r.find(path, method))
    }

    /// The router serving `version`, if any routes are registered there.
    pub fn router(&self, version: &str) -> Option<Arc<RequestRouter>> {
        let version = normalize_version(version);
        self.routers
            .read()
            .expect("router table lock poisoned")
            .get(&version)
            .cloned()
    }

    /// Versions with at least one registered route.
    pub fn versions(&self) -> Vec<String> {
        self.routers
            .read()
            .expect("router table lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Total registered routes across all versions.
    pub fn route_count(&self) -> usize {
        self.routers
            .read()
            .expect("router table lock poisoned")
            .values()
            .map(|router| router.route_count())
            .sum()
    }

    fn router_for(&self, version: &str) -> Arc<RequestRouter> {
        let mut routers = self.routers.write().expect("router table lock poisoned");
        routers
            .entry(version.to_string())
            .or_insert_with(|| Arc::new(RequestRouter::new(version)))
            .clone()
    }
}
