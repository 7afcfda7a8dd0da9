//! API Gateway Core Library
//!
//! Admission control, fault isolation, versioned routing, and
//! request/response normalization for a gateway host.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                 GATEWAY CORE                      │
//!                    │                                                   │
//!   Inbound Request  │  ┌───────────┐   ┌─────────┐   ┌─────────────┐   │
//!   ─────────────────┼─▶│ transform │──▶│ routing │──▶│  admission  │   │
//!                    │  │ normalize │   │ resolve │   │ token bucket│   │
//!                    │  └───────────┘   └─────────┘   └──────┬──────┘   │
//!                    │                                       │          │
//!                    │                                       ▼          │
//!                    │                               ┌──────────────┐   │
//!                    │                               │  resilience  │   │
//!                    │                               │circuit break │──▶│──── Upstream
//!                    │                               └──────┬───────┘   │     Handler
//!                    │                                       │          │
//!   Response         │  ┌───────────┐                        │          │
//!   ◀────────────────┼──│ transform │◀───────────────────────┘          │
//!                    │  │ envelope  │                                   │
//!                    │  └───────────┘                                   │
//!                    │                                                   │
//!                    │  ┌────────────────────────────────────────────┐  │
//!                    │  │          Cross-Cutting Concerns             │  │
//!                    │  │  ┌────────┐  ┌───────────────────────────┐  │  │
//!                    │  │  │ config │  │ observability (log+metric)│  │  │
//!                    │  │  └────────┘  └───────────────────────────┘  │  │
//!                    │  └────────────────────────────────────────────┘  │
//!                    └──────────────────────────────────────────────────┘
//! ```
//!
//! The crate deliberately stops at the gateway primitives: it does not open
//! sockets, parse HTTP, or issue sessions. A host embeds [`Gateway`] (or the
//! individual components) and owns the transport.

// Core subsystems
pub mod admission;
pub mod config;
pub mod gateway;
pub mod routing;
pub mod transform;

// Cross-cutting concerns
pub mod observability;
pub mod resilience;

pub use admission::{AdmissionDecision, RateLimiter};
pub use config::GatewayConfig;
pub use gateway::{Gateway, GatewayError};
pub use resilience::{CircuitBreaker, CircuitBreakerManager, CircuitState, RetryPolicy};
pub use routing::{RequestRouter, RequestRouterManager, RouteDefinition, RouteEntry};
pub use transform::{RequestTransformer, RequestValidator, ResponseTransformer};
