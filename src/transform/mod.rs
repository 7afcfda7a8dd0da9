//! Request/response normalization subsystem.
//!
//! # Data Flow
//! ```text
//! Raw request (path, method, headers, body?, query?)
//!     → request.rs (normalize shape, stamp metadata, mint correlation id)
//!     → NormalizedRequest → router / handler
//!
//! Handler result or fault
//!     → response.rs (success / error / paginated envelope)
//!     → NormalizedResponse JSON, correlation id echoed back
//! ```
//!
//! # Design Decisions
//! - Normalization never raises on malformed input: a non-object body
//!   becomes an empty object, empty query values are dropped
//! - Envelopes format, they do not classify: error_type is an open label
//! - Validation checks are independent and field-scoped; aggregating
//!   multiple faults is the caller's job

pub mod request;
pub mod response;
pub mod validation;

pub use request::{NormalizedRequest, RequestMetadata, RequestTransformer};
pub use response::ResponseTransformer;
pub use validation::{FieldType, RequestValidator, ValidationError};
