//! Typed error handling for the viewkit helper layer
//!
//! The taxonomy distinguishes three situations:
//!
//! - [`InvalidParams`]: the client sent something wrong (malformed JSON body,
//!   rejected request payload). Surfaced as a 4xx response with field-level
//!   detail when available.
//! - [`SchemaMismatch`]: the server produced a response that fails its own
//!   declared schema. Always a server bug, never the caller's fault.
//! - Construction-time contract violations (an empty error list, `post_data`
//!   without an encoder, reading the body of a non-POST request) are defects
//!   and panic instead of surfacing as user-facing errors.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// A single field-level validation failure
///
/// Rendered as `"key: message"` when a key is present, `"message"` otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    key: Option<String>,
    message: String,
}

impl FieldError {
    pub fn new(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            message: message.into(),
        }
    }

    /// A failure not tied to any particular field
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            key: None,
            message: message.into(),
        }
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}: {}", key, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Client input error: the request parameters or body were invalid
///
/// Carries an ordered, never-empty list of [`FieldError`]s. `Display` joins
/// all entries with newlines.
#[derive(Debug, Clone)]
pub struct InvalidParams {
    errors: Vec<FieldError>,
}

impl InvalidParams {
    /// Build from a single keyless message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::message_only(message)],
        }
    }

    /// Build from a pre-built list of field errors
    ///
    /// # Panics
    ///
    /// Panics when `errors` is empty; an error with nothing to report is a
    /// programming mistake, caught at construction.
    pub fn with_errors(errors: Vec<FieldError>) -> Self {
        assert!(
            !errors.is_empty(),
            "InvalidParams requires at least one FieldError"
        );
        Self { errors }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

impl fmt::Display for InvalidParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.errors.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", lines.join("\n"))
    }
}

impl std::error::Error for InvalidParams {}

/// Server contract error: a response failed its own declared schema
#[derive(Debug, Clone)]
pub struct SchemaMismatch {
    message: String,
}

impl SchemaMismatch {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SchemaMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SchemaMismatch {}

/// The umbrella error type handlers return through this layer
#[derive(Debug)]
pub enum ApiError {
    /// Client-caused invalid input
    InvalidParams(InvalidParams),

    /// Server response failed its own schema
    SchemaMismatch(SchemaMismatch),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidParams(e) => write!(f, "{}", e),
            ApiError::SchemaMismatch(e) => write!(f, "{}", e),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::InvalidParams(e) => Some(e),
            ApiError::SchemaMismatch(e) => Some(e),
            ApiError::Internal(_) => None,
        }
    }
}

/// Error response body
///
/// Shape: `{"code": ..., "message": ..., "errors"?: [...]}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Rendered field errors, omitted when there are none to detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ApiError::SchemaMismatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::InvalidParams(_) => "INVALID_PARAMS",
            ApiError::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response body
    pub fn to_body(&self) -> ErrorBody {
        let errors = match self {
            ApiError::InvalidParams(e) => {
                Some(e.errors().iter().map(|fe| fe.to_string()).collect())
            }
            _ => None,
        };
        ErrorBody {
            code: self.error_code().to_string(),
            message: self.to_string(),
            errors,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_body());
        (status, body).into_response()
    }
}

impl From<InvalidParams> for ApiError {
    fn from(err: InvalidParams) -> Self {
        ApiError::InvalidParams(err)
    }
}

impl From<SchemaMismatch> for ApiError {
    fn from(err: SchemaMismatch) -> Self {
        ApiError::SchemaMismatch(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// A specialized Result type for viewkit operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_with_key_display() {
        let e = FieldError::new("x", "required");
        assert_eq!(e.to_string(), "x: required");
    }

    #[test]
    fn test_field_error_without_key_display() {
        let e = FieldError::message_only("something went wrong");
        assert_eq!(e.to_string(), "something went wrong");
    }

    #[test]
    fn test_invalid_params_from_message() {
        let e = InvalidParams::new("bad");
        assert_eq!(e.to_string(), "bad");
        assert_eq!(e.errors().len(), 1);
        assert_eq!(e.errors()[0].key(), None);
    }

    #[test]
    fn test_invalid_params_from_field_errors() {
        let e = InvalidParams::with_errors(vec![FieldError::new("x", "required")]);
        assert_eq!(e.to_string(), "x: required");
    }

    #[test]
    fn test_invalid_params_joins_with_newlines() {
        let e = InvalidParams::with_errors(vec![
            FieldError::new("name", "required"),
            FieldError::message_only("body too large"),
        ]);
        assert_eq!(e.to_string(), "name: required\nbody too large");
    }

    #[test]
    #[should_panic(expected = "at least one FieldError")]
    fn test_invalid_params_empty_list_panics() {
        let _ = InvalidParams::with_errors(vec![]);
    }

    #[test]
    fn test_api_error_status_codes() {
        assert_eq!(
            ApiError::from(InvalidParams::new("bad")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(SchemaMismatch::new("drift")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_body_shape() {
        let err = ApiError::from(InvalidParams::with_errors(vec![
            FieldError::new("email", "invalid format"),
            FieldError::message_only("missing payload"),
        ]));
        let body = err.to_body();
        assert_eq!(body.code, "INVALID_PARAMS");
        let errors = body.errors.expect("field errors present");
        assert_eq!(errors, vec!["email: invalid format", "missing payload"]);
    }

    #[test]
    fn test_error_body_omits_errors_key_when_absent() {
        let err = ApiError::Internal("boom".into());
        let json = serde_json::to_value(err.to_body()).unwrap();
        assert!(json.get("errors").is_none());
        assert_eq!(json["code"], "INTERNAL_ERROR");
    }
}
