//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (path, method, version)
//!     → manager.rs (canonicalize version, pick that version's router)
//!     → router.rs (exact lookup, then pattern scan)
//!     → matcher.rs (placeholder patterns, param extraction)
//!     → Return: matched RouteEntry or explicit no-match
//!
//! Route registration:
//!     RouteDefinition
//!     → normalize path, compile pattern once
//!     → stored immutable under (version, path); re-registration replaces
//! ```
//!
//! # Design Decisions
//! - One router per version: v1 and v2 registrations of the same logical
//!   path never interfere and may bind independent handlers
//! - Patterns compile at registration, never in the lookup hot path
//! - `{name}` matches exactly one path segment (no slashes)
//! - Explicit None rather than a silent default route

pub mod manager;
pub mod matcher;
pub mod router;

pub use manager::{normalize_version, RequestRouterManager};
pub use matcher::{extract_path_params, normalize_path, PathPattern};
pub use router::{Handler, RequestRouter, RouteDefinition, RouteEntry, RouterError, UpstreamError};
