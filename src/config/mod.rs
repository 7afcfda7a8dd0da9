//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to Gateway::new by the host
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a new Gateway
//! - All fields have defaults to allow minimal configs
//! - Unknown fields are rejected (typos surface at load, not at runtime)
//! - Validation separates syntactic (serde) from semantic checks and
//!   reports every violation at once, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::CircuitBreakerConfig;
pub use schema::GatewayConfig;
pub use schema::ObservabilityConfig;
pub use schema::RateLimitConfig;
pub use schema::RetryConfig;
pub use validation::{validate_config, ConfigViolation};
