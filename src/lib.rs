//! # viewkit
//!
//! A request/response helper layer for JSON APIs, sitting between the HTTP
//! framework and application handlers.
//!
//! ## Features
//!
//! - **Pagination**: derive paging intent from request parameters and apply
//!   ordering and slicing to any queryset-like collection
//! - **Response shaping**: the canonical `{"data": ..., "pagination": ...}`
//!   list shape and `{"code", "message", "errors"?}` error shape
//! - **Schema validation**: wrap handlers with pre-request and post-response
//!   checks that distinguish bad client input from server-side schema drift
//! - **Value encoding**: an ordered chain of type rules turning temporal
//!   values, querysets and records into plain JSON
//! - **Filter shaping**: small JSON-map utilities (delete/extract/rename
//!   keys, search-field and date-range rewrites) for building query filters
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use viewkit::prelude::*;
//!
//! fn list_items(view: &JsonView, params: &PageQuery) -> ApiResult<Response<Bytes>> {
//!     let qs = VecQuery::new(load_items());
//!     PagingResponse::new(params, qs).build()
//! }
//!
//! let handler = SchemaValidation::new()
//!     .pre(|data, _req| check_request_schema(data))
//!     .post(|data| check_response_schema(data))
//!     .wrap(|view| list_items(view, &params));
//! ```

pub mod encode;
pub mod error;
pub mod keys;
pub mod paging;
pub mod query;
pub mod validate;
pub mod view;

/// Re-exports of commonly used types and traits
pub mod prelude {
    pub use crate::encode::{Record, ResponseEncoder, queryset_rule, record_rule, rule};
    pub use crate::error::{ApiError, ApiResult, FieldError, InvalidParams, SchemaMismatch};
    pub use crate::keys::{delete_keys, extract_keys, rename_keys};
    pub use crate::paging::{
        PageQuery, PaginationMeta, Paginator, paginate, remove_paginator_keys,
    };
    pub use crate::query::{QuerySet, SortOrder, VecQuery};
    pub use crate::validate::SchemaValidation;
    pub use crate::view::{
        JsonView, PagingResponse, RequestUser, error_response, json_response, json_response_with,
        process_start_end_date,
    };

    // === External dependencies ===
    pub use axum::body::Bytes;
    pub use axum::http::{Method, Request, Response, StatusCode};
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Map, Value};
}
