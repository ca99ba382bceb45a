//! JSON request/response plumbing for handlers
//!
//! [`JsonView`] wraps one incoming request with lazy body parsing;
//! [`json_response`]/[`error_response`] build JSON responses with the exact
//! body shapes list endpoints rely on; [`PagingResponse`] orchestrates the
//! paged-list response; [`process_start_end_date`] rewrites start/end date
//! parameters into range-filter criteria.

use axum::body::Bytes;
use axum::http::{Method, Request, Response, StatusCode, header};
use chrono::{DateTime, Duration};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::any::Any;
use std::sync::OnceLock;

use crate::encode::ResponseEncoder;
use crate::error::{ApiError, ApiResult, FieldError, InvalidParams};
use crate::keys::is_truthy;
use crate::paging::{PageQuery, Paginator, remove_paginator_keys};
use crate::query::QuerySet;

/// Fields `process_start_end_date` rewrites by default
pub const DEFAULT_DATE_RANGE_FIELDS: [&str; 2] = ["updated_at", "created_at"];

/// The authenticated principal attached to a request, if any
pub trait RequestUser {
    fn is_anonymous(&self) -> bool;
}

/// One incoming request plus its lazily parsed JSON body
///
/// The parsed body is cached per request instance; the cache is never shared
/// across requests, so no locking discipline is needed beyond the cell.
pub struct JsonView {
    request: Request<Bytes>,
    user: Option<Box<dyn RequestUser + Send + Sync>>,
    parsed: OnceLock<Value>,
}

impl JsonView {
    pub fn new(request: Request<Bytes>) -> Self {
        Self {
            request,
            user: None,
            parsed: OnceLock::new(),
        }
    }

    pub fn with_user(mut self, user: impl RequestUser + Send + Sync + 'static) -> Self {
        self.user = Some(Box::new(user));
        self
    }

    pub fn request(&self) -> &Request<Bytes> {
        &self.request
    }

    /// The request body parsed as JSON, cached on first success
    ///
    /// Malformed JSON is a client error. Calling this on anything but a POST
    /// request is a programming error.
    ///
    /// # Panics
    ///
    /// Panics when the request method is not POST.
    pub fn parsed_body(&self) -> Result<&Value, InvalidParams> {
        assert_eq!(
            self.request.method(),
            Method::POST,
            "parsed_body is only valid on POST requests"
        );
        if let Some(value) = self.parsed.get() {
            return Ok(value);
        }
        let value: Value = serde_json::from_slice(self.request.body())
            .map_err(|e| InvalidParams::new(format!("could not parse body as json: {}", e)))?;
        Ok(self.parsed.get_or_init(|| value))
    }

    /// False only when an attached user is anonymous
    pub fn logged_in(&self) -> bool {
        !self.user.as_ref().is_some_and(|u| u.is_anonymous())
    }
}

/// Build a JSON response with the given status
pub fn json_response<T: Serialize + Any>(data: &T, status: StatusCode) -> ApiResult<Response<Bytes>> {
    json_response_with(data, status, None, false)
}

/// Build a JSON response, optionally encoding through a [`ResponseEncoder`]
/// and optionally wrapping the value as `{"data": ...}`
///
/// Non-ASCII characters are preserved as-is, never escaped.
pub fn json_response_with<T: Serialize + Any>(
    data: &T,
    status: StatusCode,
    encoder: Option<&ResponseEncoder>,
    as_root_data: bool,
) -> ApiResult<Response<Bytes>> {
    let mut value = match encoder {
        Some(enc) => enc.encode(data)?,
        None => serde_json::to_value(data)?,
    };
    if as_root_data {
        value = json!({ "data": value });
    }
    let body = serde_json::to_vec(&value)?;
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Bytes::from(body))
        .map_err(|e| ApiError::Internal(e.to_string()))
}

/// Build an error response: `{"code", "message", "errors"?}`
pub fn error_response(
    message: &str,
    status: StatusCode,
    code: &str,
    errors: Option<&[FieldError]>,
) -> ApiResult<Response<Bytes>> {
    let mut body = json!({ "code": code, "message": message });
    if let Some(errors) = errors.filter(|e| !e.is_empty()) {
        let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        body["errors"] = json!(rendered);
    }
    json_response(&body, status)
}

/// Builder for the canonical paged-list response
///
/// Paginates the queryset, then shapes
/// `{"data": [...], "pagination": {count, limit, page, pages}}`.
///
/// # Example
/// ```rust,ignore
/// PagingResponse::new(&params, qs)
///     .post_item(|mut item| { item.redact(); item })
///     .encoder(&encoder)
///     .build()?
/// ```
pub struct PagingResponse<'a, Q: QuerySet> {
    params: &'a PageQuery,
    query: Q,
    encoder: Option<&'a ResponseEncoder>,
    post_item: Option<Box<dyn Fn(Q::Item) -> Q::Item + 'a>>,
    post_data: Option<Box<dyn Fn(Value) -> Value + 'a>>,
}

impl<'a, Q> PagingResponse<'a, Q>
where
    Q: QuerySet,
    Q::Item: Serialize + Any,
{
    pub fn new(params: &'a PageQuery, query: Q) -> Self {
        Self {
            params,
            query,
            encoder: None,
            post_item: None,
            post_data: None,
        }
    }

    /// Force each data item through this encoder into plain JSON
    pub fn encoder(mut self, encoder: &'a ResponseEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Map each item of the page before encoding
    pub fn post_item(mut self, f: impl Fn(Q::Item) -> Q::Item + 'a) -> Self {
        self.post_item = Some(Box::new(f));
        self
    }

    /// Final transform over the whole encoded data value; requires an encoder
    pub fn post_data(mut self, f: impl Fn(Value) -> Value + 'a) -> Self {
        self.post_data = Some(Box::new(f));
        self
    }

    /// Paginate, shape and serialize the response
    ///
    /// # Panics
    ///
    /// Panics when `post_data` was set without an encoder; that combination
    /// is a programming error.
    pub fn build(self) -> ApiResult<Response<Bytes>> {
        let (qs, meta) = Paginator::new(self.params).parse(self.query);
        let mut items = qs.collect_items();
        if let Some(f) = &self.post_item {
            items = items.into_iter().map(f).collect();
        }
        let mut data = match self.encoder {
            Some(enc) => {
                let mut encoded = Vec::with_capacity(items.len());
                for item in &items {
                    encoded.push(enc.encode(item)?);
                }
                Value::Array(encoded)
            }
            None => serde_json::to_value(&items)?,
        };
        if let Some(f) = &self.post_data {
            assert!(
                self.encoder.is_some(),
                "missing encoder to apply post_data"
            );
            data = f(data);
        }
        let body = json!({ "data": data, "pagination": meta });
        json_response(&body, StatusCode::OK)
    }
}

/// Rewrite `{name}_start` / `{name}_end` parameters into range filters
///
/// Strips the reserved paging keys first, then for each field name pops the
/// start/end values and rewrites them to `{name}__gte = start` and
/// `{name}__lt = end + 1 day`, making the whole end day inclusive. Present
/// values must be RFC 3339 timestamps carrying a UTC offset.
///
/// # Panics
///
/// Panics when a present start/end value is not a timezone-aware timestamp;
/// callers are expected to have parsed their parameters first.
pub fn process_start_end_date(
    data: &Map<String, Value>,
    field_names: &[&str],
) -> Map<String, Value> {
    let mut data = remove_paginator_keys(data);
    for name in field_names {
        let start = data.shift_remove(&format!("{}_start", name));
        let end = data.shift_remove(&format!("{}_end", name));
        if let Some(value) = start.filter(is_truthy) {
            parse_aware(&value, name, "start");
            data.insert(format!("{}__gte", name), value);
        }
        if let Some(value) = end.filter(is_truthy) {
            let ts = parse_aware(&value, name, "end");
            data.insert(
                format!("{}__lt", name),
                Value::String((ts + Duration::days(1)).to_rfc3339()),
            );
        }
    }
    data
}

fn parse_aware(value: &Value, name: &str, bound: &str) -> DateTime<chrono::FixedOffset> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .unwrap_or_else(|| {
            panic!(
                "{}_{} must be a timezone-aware RFC 3339 timestamp, got {}",
                name, bound, value
            )
        })
}
