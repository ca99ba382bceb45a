//! The lazy-collection contract consumed by the paginator
//!
//! A [`QuerySet`] is a query-like handle over an ordered, countable,
//! sliceable, orderable set of records. Real backends adapt their query
//! builders to this trait; [`VecQuery`] is the in-memory implementation used
//! for testing and development.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::ops::Range;

/// Sort direction for `order_by`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn is_descending(self) -> bool {
        matches!(self, SortOrder::Desc)
    }
}

/// A lazy, orderable, countable, sliceable collection of records
///
/// Ordering and slicing consume the handle and return a narrowed one;
/// nothing is materialized until [`collect_items`](QuerySet::collect_items).
pub trait QuerySet: Sized {
    type Item;

    /// Reorder by the named field
    fn order_by(self, field: &str, order: SortOrder) -> Self;

    /// Total number of records in the collection
    fn count(&self) -> usize;

    /// Narrow to the half-open index range `[start, end)`
    fn slice(self, range: Range<usize>) -> Self;

    /// Materialize into an ordered sequence of items
    fn collect_items(self) -> Vec<Self::Item>;
}

/// In-memory queryset over a plain vector
///
/// Useful for testing and development. `order_by` compares the named field
/// through each item's JSON projection.
#[derive(Debug, Clone, Serialize)]
pub struct VecQuery<T> {
    items: Vec<T>,
}

impl<T: Serialize> VecQuery<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    fn field_value(item: &T, field: &str) -> Value {
        serde_json::to_value(item)
            .ok()
            .and_then(|v| v.get(field).cloned())
            .unwrap_or(Value::Null)
    }
}

impl<T: Serialize> FromIterator<T> for VecQuery<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T: Serialize> QuerySet for VecQuery<T> {
    type Item = T;

    fn order_by(mut self, field: &str, order: SortOrder) -> Self {
        self.items.sort_by(|a, b| {
            compare_json(&Self::field_value(a, field), &Self::field_value(b, field))
        });
        if order.is_descending() {
            self.items.reverse();
        }
        self
    }

    fn count(&self) -> usize {
        self.items.len()
    }

    fn slice(mut self, range: Range<usize>) -> Self {
        let end = range.end.min(self.items.len());
        let start = range.start.min(end);
        self.items = self.items.drain(start..end).collect();
        self
    }

    fn collect_items(self) -> Vec<T> {
        self.items
    }
}

/// Pragmatic total order over JSON scalars: null < bool < number < string;
/// arrays and objects compare by their serialized form
pub fn compare_json(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_))
            if rank(a) == rank(b) =>
        {
            a.to_string().cmp(&b.to_string())
        }
        _ => rank(a).cmp(&rank(b)),
    }
}
