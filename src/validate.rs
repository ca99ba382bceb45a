//! Schema validation around handlers
//!
//! [`SchemaValidation`] wraps a handler with a pre-request and a
//! post-response schema check. The two phases fail differently on purpose:
//! a pre-phase rejection is the client's fault, a post-phase rejection means
//! the server no longer satisfies its own response schema.

use axum::body::Bytes;
use axum::http::{Request, Response, StatusCode};
use serde_json::Value;
use tracing::warn;

use crate::error::{ApiError, ApiResult, InvalidParams, SchemaMismatch};
use crate::view::JsonView;

/// Message returned when a response fails its own schema
pub const SCHEMA_MISMATCH_MESSAGE: &str = "service under maintenance: invalid data to schema";

type PreValidator = Box<dyn Fn(&Value, &Request<Bytes>) -> anyhow::Result<()> + Send + Sync>;
type PostValidator = Box<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Pre/post schema checks wrapped around a handler
///
/// The response-validation switch is an explicit per-instance configuration
/// value, injected at construction so tests can toggle it without shared
/// state. It defaults to on: a response failing its schema replaces the
/// outcome with a [`SchemaMismatch`] failure rather than leaking drifted
/// data. With the switch off the drift is logged and the original response
/// passes through unchanged.
pub struct SchemaValidation {
    pre: Option<PreValidator>,
    post: Option<PostValidator>,
    validate_response: bool,
}

impl SchemaValidation {
    pub fn new() -> Self {
        Self {
            pre: None,
            post: None,
            validate_response: true,
        }
    }

    /// Validate the parsed request body before the handler runs
    ///
    /// An [`InvalidParams`] returned by the validator propagates unchanged;
    /// any other error is treated as bad client input and wrapped into an
    /// [`InvalidParams`] carrying its message.
    pub fn pre(
        mut self,
        validator: impl Fn(&Value, &Request<Bytes>) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.pre = Some(Box::new(validator));
        self
    }

    /// Validate the response body of 200 responses after the handler runs
    pub fn post(
        mut self,
        validator: impl Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.post = Some(Box::new(validator));
        self
    }

    /// Whether a post-phase rejection fails the call (on) or only logs (off)
    pub fn validate_response(mut self, enabled: bool) -> Self {
        self.validate_response = enabled;
        self
    }

    /// Wrap a handler with the configured checks
    ///
    /// Pipeline per call: pre-check, handler invocation, post-check. No
    /// retries; pre-phase errors abort before the handler runs.
    pub fn wrap<H>(self, handler: H) -> impl Fn(&JsonView) -> ApiResult<Response<Bytes>>
    where
        H: Fn(&JsonView) -> ApiResult<Response<Bytes>>,
    {
        move |view: &JsonView| {
            if let Some(pre) = &self.pre {
                let data = view.parsed_body()?;
                pre(data, view.request()).map_err(as_invalid_params)?;
            }

            let response = handler(view)?;

            if response.status() == StatusCode::OK {
                if let Some(post) = &self.post {
                    let data: Value = serde_json::from_slice(response.body())?;
                    if let Err(err) = post(&data) {
                        match err.downcast::<InvalidParams>() {
                            Ok(invalid) => {
                                // schema drift is a server bug, not a client error
                                warn!("post_validator error: {}", invalid);
                                if self.validate_response {
                                    return Err(
                                        SchemaMismatch::new(SCHEMA_MISMATCH_MESSAGE).into()
                                    );
                                }
                            }
                            Err(other) => return Err(ApiError::Internal(other.to_string())),
                        }
                    }
                }
            }

            Ok(response)
        }
    }
}

impl Default for SchemaValidation {
    fn default() -> Self {
        Self::new()
    }
}

fn as_invalid_params(err: anyhow::Error) -> ApiError {
    match err.downcast::<InvalidParams>() {
        Ok(invalid) => invalid.into(),
        Err(other) => InvalidParams::new(other.to_string()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{JsonView, json_response};
    use axum::http::Method;
    use serde_json::json;

    fn post_view(body: &str) -> JsonView {
        JsonView::new(
            Request::builder()
                .method(Method::POST)
                .uri("/items")
                .body(Bytes::from(body.to_string()))
                .unwrap(),
        )
    }

    fn ok_handler(_: &JsonView) -> ApiResult<Response<Bytes>> {
        json_response(&json!({"data": []}), StatusCode::OK)
    }

    #[test]
    fn test_no_validators_passes_through() {
        let wrapped = SchemaValidation::new().wrap(ok_handler);
        let resp = wrapped(&post_view("{}")).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_pre_validator_invalid_params_propagates_unchanged() {
        let wrapped = SchemaValidation::new()
            .pre(|_, _| Err(InvalidParams::with_errors(vec![
                crate::error::FieldError::new("name", "required"),
            ])
            .into()))
            .wrap(ok_handler);
        let err = wrapped(&post_view("{}")).unwrap_err();
        match err {
            ApiError::InvalidParams(e) => assert_eq!(e.to_string(), "name: required"),
            other => panic!("expected InvalidParams, got {:?}", other),
        }
    }

    #[test]
    fn test_pre_validator_other_error_wrapped_as_client_error() {
        let wrapped = SchemaValidation::new()
            .pre(|_, _| Err(anyhow::anyhow!("missing field kaboom")))
            .wrap(ok_handler);
        let err = wrapped(&post_view("{}")).unwrap_err();
        match err {
            ApiError::InvalidParams(e) => assert!(e.to_string().contains("kaboom")),
            other => panic!("expected InvalidParams, got {:?}", other),
        }
    }

    #[test]
    fn test_pre_phase_rejects_malformed_body_before_handler() {
        let wrapped = SchemaValidation::new().pre(|_, _| Ok(())).wrap(|_| {
            panic!("handler must not run");
        });
        let err = wrapped(&post_view("not json")).unwrap_err();
        match err {
            ApiError::InvalidParams(e) => {
                assert!(e.to_string().contains("could not parse body as json"))
            }
            other => panic!("expected InvalidParams, got {:?}", other),
        }
    }

    #[test]
    fn test_post_validator_rejection_fails_when_switch_on() {
        let wrapped = SchemaValidation::new()
            .post(|_| Err(InvalidParams::new("data does not match schema").into()))
            .wrap(ok_handler);
        let err = wrapped(&post_view("{}")).unwrap_err();
        match err {
            ApiError::SchemaMismatch(e) => {
                assert_eq!(e.to_string(), SCHEMA_MISMATCH_MESSAGE)
            }
            other => panic!("expected SchemaMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_post_validator_rejection_logs_only_when_switch_off() {
        let wrapped = SchemaValidation::new()
            .post(|_| Err(InvalidParams::new("data does not match schema").into()))
            .validate_response(false)
            .wrap(ok_handler);
        let resp = wrapped(&post_view("{}")).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body, json!({"data": []}));
    }

    #[test]
    fn test_post_validator_skipped_for_non_200() {
        let wrapped = SchemaValidation::new()
            .post(|_| Err(InvalidParams::new("never checked").into()))
            .wrap(|_| json_response(&json!({"code": "X"}), StatusCode::CREATED));
        let resp = wrapped(&post_view("{}")).unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[test]
    fn test_post_validator_accepts_valid_response() {
        let wrapped = SchemaValidation::new()
            .post(|data| {
                if data.get("data").is_some() {
                    Ok(())
                } else {
                    Err(InvalidParams::new("missing data key").into())
                }
            })
            .wrap(ok_handler);
        assert!(wrapped(&post_view("{}")).is_ok());
    }

    #[test]
    fn test_post_validator_unexpected_error_is_internal() {
        let wrapped = SchemaValidation::new()
            .post(|_| Err(anyhow::anyhow!("validator crashed")))
            .wrap(ok_handler);
        let err = wrapped(&post_view("{}")).unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
