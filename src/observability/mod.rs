//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters via the metrics facade)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Whatever metrics recorder the host installs
//! ```
//!
//! # Design Decisions
//! - Correlation id flows through log events and response envelopes
//! - Counters are recorded against the `metrics` facade only; installing
//!   an exporter is the host's business
//! - Metric updates are cheap enough to sit on the request path

pub mod logging;
pub mod metrics;
