//! Outbound envelope formatting.
//!
//! # Responsibilities
//! - Wrap handler payloads in the success envelope
//! - Format structured error envelopes
//! - Format paginated list envelopes
//!
//! # Design Decisions
//! - This module formats, it does not classify: `error_type` is an open
//!   string label chosen by the caller, never a closed enum
//! - `success` is derived from the status code (2xx), so the flag can
//!   never disagree with the code

use serde_json::{json, Value};

use crate::transform::request::epoch_seconds;

/// Outbound envelope formatting. Stateless; one instance serves all
/// responses.
#[derive(Debug, Default, Clone)]
pub struct ResponseTransformer;

impl ResponseTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Wrap `data` in the standard envelope.
    pub fn transform(
        &self,
        data: Value,
        status_code: u16,
        correlation_id: Option<&str>,
        error: Option<&str>,
    ) -> Value {
        let mut envelope = json!({
            "success": (200..300).contains(&status_code),
            "status_code": status_code,
            "data": data,
            "timestamp": epoch_seconds(),
        });
        if let Some(id) = correlation_id {
            envelope["correlation_id"] = json!(id);
        }
        if let Some(message) = error {
            envelope["error"] = json!(message);
        }
        envelope
    }

    /// Structured error envelope. `error_type` is an open label such as
    /// `"rate_limited"` or `"upstream_error"`.
    pub fn transform_error(
        &self,
        status_code: u16,
        message: &str,
        error_type: &str,
        correlation_id: Option<&str>,
        details: Option<Value>,
    ) -> Value {
        let mut error = json!({
            "type": error_type,
            "message": message,
        });
        if let Some(details) = details {
            error["details"] = details;
        }

        let mut envelope = json!({
            "success": false,
            "status_code": status_code,
            "error": error,
            "timestamp": epoch_seconds(),
        });
        if let Some(id) = correlation_id {
            envelope["correlation_id"] = json!(id);
        }
        envelope
    }

    /// Paginated envelope; `total_pages` rounds up.
    pub fn transform_list(
        &self,
        items: Vec<Value>,
        total: u64,
        page: u64,
        page_size: u64,
        correlation_id: Option<&str>,
    ) -> Value {
        let total_pages = if page_size == 0 {
            0
        } else {
            total.div_ceil(page_size)
        };

        let mut envelope = json!({
            "success": true,
            "status_code": 200,
            "data": items,
            "pagination": {
                "total": total,
                "page": page,
                "page_size": page_size,
                "total_pages": total_pages,
            },
            "timestamp": epoch_seconds(),
        });
        if let Some(id) = correlation_id {
            envelope["correlation_id"] = json!(id);
        }
        envelope
    }
}
