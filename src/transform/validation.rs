//! Composable field validation.
//!
//! # Responsibilities
//! - Required-field presence, type, numeric range, and enumerated-choice
//!   checks over a normalized request body
//!
//! # Design Decisions
//! - Each check fails fast on its first violation and names the offending
//!   field; running several checks and collecting the faults is the
//!   caller's job
//! - Type and range checks skip absent fields: presence is exclusively
//!   the concern of `require_fields`, so checks stay composable

use serde_json::{Map, Value};

/// A field-scoped validation fault.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Expected JSON type for [`RequestValidator::check_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    fn name(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Integer => "integer",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
        }
    }
}

/// Independent, composable request body checks.
pub struct RequestValidator;

impl RequestValidator {
    /// Fail on the first missing or null field.
    pub fn require_fields(
        body: &Map<String, Value>,
        fields: &[&str],
    ) -> Result<(), ValidationError> {
        for field in fields {
            match body.get(*field) {
                None | Some(Value::Null) => {
                    return Err(ValidationError::new(field, "field is required"));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Fail when a present field has the wrong JSON type.
    pub fn check_type(
        body: &Map<String, Value>,
        field: &str,
        expected: FieldType,
    ) -> Result<(), ValidationError> {
        match body.get(field) {
            Some(value) if !expected.accepts(value) => Err(ValidationError::new(
                field,
                format!("expected {}, got {}", expected.name(), json_type_name(value)),
            )),
            _ => Ok(()),
        }
    }

    /// Fail when a present numeric field falls outside `[min, max]`.
    /// A non-numeric value is itself a violation.
    pub fn check_range(
        body: &Map<String, Value>,
        field: &str,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<(), ValidationError> {
        let Some(value) = body.get(field) else {
            return Ok(());
        };
        let Some(number) = value.as_f64() else {
            return Err(ValidationError::new(
                field,
                format!("expected number, got {}", json_type_name(value)),
            ));
        };

        if let Some(min) = min {
            if number < min {
                return Err(ValidationError::new(
                    field,
                    format!("must be >= {min}, got {number}"),
                ));
            }
        }
        if let Some(max) = max {
            if number > max {
                return Err(ValidationError::new(
                    field,
                    format!("must be <= {max}, got {number}"),
                ));
            }
        }
        Ok(())
    }

    /// Fail when a present string field is not one of `choices`.
    pub fn check_choice(
        body: &Map<String, Value>,
        field: &str,
        choices: &[&str],
    ) -> Result<(), ValidationError> {
        let Some(value) = body.get(field) else {
            return Ok(());
        };
        let Some(text) = value.as_str() else {
            return Err(ValidationError::new(
                field,
                format!("expected string, got {}", json_type_name(value)),
            ));
        };

        if choices.contains(&text) {
            Ok(())
        } else {
            Err(ValidationError::new(
                field,
                format!("'{text}' is not one of {choices:?}"),
            ))
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
