//! Paging parameter resolution and queryset pagination
//!
//! [`PageQuery`] is the boundary struct list endpoints deserialize their
//! paging intent into; [`paginate`] is the pure algorithm applying that
//! intent to any [`QuerySet`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::keys::delete_keys;
use crate::query::{QuerySet, SortOrder};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_LIMIT: usize = 10;

/// The reserved paging-parameter keys, including the pagination switch
pub const PAGINATE_KEYS: [&str; 5] = ["page", "limit", "sort", "order", "pagination"];

/// Raw paging parameters as supplied by the request
///
/// Missing or falsy values (zero page/limit, empty sort/order strings) fall
/// back to defaults; resolution happens once through the accessors rather
/// than ad hoc at each use site.
///
/// # Example
/// ```rust,ignore
/// // GET /items?page=2&limit=10&sort=created_at&order=asc
/// // GET /items?pagination=false        (return everything, unsliced)
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    /// Page number (starts at 1)
    pub page: Option<usize>,

    /// Number of items per page
    pub limit: Option<usize>,

    /// Field to order the collection by
    pub sort: Option<String>,

    /// `asc` or `desc`; anything but `desc` sorts ascending
    pub order: Option<String>,

    /// Tri-state switch: `Some(false)` disables paging and returns the whole
    /// collection, `Some(true)` and `None` both page normally
    pub pagination: Option<bool>,
}

impl PageQuery {
    /// Page number, defaulted; zero is treated as unset
    pub fn page(&self) -> usize {
        match self.page {
            Some(p) if p > 0 => p,
            _ => DEFAULT_PAGE,
        }
    }

    /// Page size, defaulted; zero is treated as unset
    pub fn limit(&self) -> usize {
        match self.limit {
            Some(l) if l > 0 => l,
            _ => DEFAULT_LIMIT,
        }
    }

    /// Sort field; an empty string means no sorting
    pub fn sort(&self) -> Option<&str> {
        self.sort.as_deref().filter(|s| !s.is_empty())
    }

    /// Sort direction, descending unless explicitly something else
    pub fn order(&self) -> SortOrder {
        match self.order.as_deref() {
            None | Some("") | Some("desc") => SortOrder::Desc,
            Some(_) => SortOrder::Asc,
        }
    }

    pub fn pagination(&self) -> Option<bool> {
        self.pagination
    }
}

/// Pagination metadata attached to every list response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    /// Total number of items before slicing
    pub count: usize,
    /// Page size used (the full count when paging is disabled)
    pub limit: usize,
    /// Current page number (starts at 1)
    pub page: usize,
    /// Total number of pages, never below 1
    pub pages: usize,
}

/// Applies request paging intent to a queryset
pub struct Paginator<'a> {
    query: &'a PageQuery,
}

impl<'a> Paginator<'a> {
    pub fn new(query: &'a PageQuery) -> Self {
        Self { query }
    }

    /// Order and slice `qs` according to the request parameters
    pub fn parse<Q: QuerySet>(&self, qs: Q) -> (Q, PaginationMeta) {
        paginate(
            qs,
            self.query.pagination(),
            self.query.page(),
            self.query.limit(),
            self.query.sort(),
            self.query.order(),
        )
    }
}

/// Pure pagination algorithm
///
/// Sorts when `sort` is given, then either returns the whole collection with
/// collapsed metadata (`pagination == Some(false)`) or slices out the
/// requested page. `page` and `limit` are clamped to a minimum of 1; no
/// bounds check is made against `count`, so an out-of-range page yields an
/// empty slice rather than an error.
pub fn paginate<Q: QuerySet>(
    mut qs: Q,
    pagination: Option<bool>,
    page: usize,
    limit: usize,
    sort: Option<&str>,
    order: SortOrder,
) -> (Q, PaginationMeta) {
    if let Some(field) = sort {
        qs = qs.order_by(field, order);
    }

    let page = page.max(1);
    let limit = limit.max(1);
    let count = qs.count();
    // saturate: an absurdly large page is client input and must yield an
    // empty slice, not an overflow
    let offset = limit.saturating_mul(page - 1);

    if pagination == Some(false) {
        let meta = PaginationMeta {
            count,
            limit: count,
            page: 1,
            pages: 1,
        };
        return (qs, meta);
    }

    let pages = count.div_ceil(limit).max(1);
    let qs = qs.slice(offset..offset.saturating_add(limit));
    let meta = PaginationMeta {
        count,
        limit,
        page,
        pages,
    };
    (qs, meta)
}

/// Deep-copy `data` without any of the reserved paging keys, isolating the
/// remaining keys as domain filter criteria
pub fn remove_paginator_keys(data: &Map<String, Value>) -> Map<String, Value> {
    let mut data = data.clone();
    delete_keys(&mut data, &PAGINATE_KEYS);
    data
}
