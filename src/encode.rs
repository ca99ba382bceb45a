//! Response value encoding
//!
//! [`ResponseEncoder`] turns domain values (temporal values, querysets,
//! record types) into plain JSON. It is an explicit ordered chain of
//! type-predicate rules, most specific first, falling through to plain
//! serde conversion for anything no rule claims.
//!
//! The default chain checks timestamp-with-time types before the date-only
//! type: a timestamp is a refinement of a date, and matching the date rule
//! first would silently drop the time-of-day component.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;

use crate::error::ApiError;
use crate::query::QuerySet;

/// Wire format for timestamps carrying a time of day
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Wire format for date-only values
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A value the encoder chain could not represent
#[derive(Debug)]
pub struct EncodeError {
    message: String,
}

impl EncodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot encode value as json: {}", self.message)
    }
}

impl std::error::Error for EncodeError {}

impl From<serde_json::Error> for EncodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<EncodeError> for ApiError {
    fn from(err: EncodeError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// A domain record convertible to a plain field-name/value mapping
///
/// The chain matches on whole values, not on the leaves of an already-built
/// map, so implementations own the rendering of their temporal fields: use
/// [`TIME_FORMAT`] / [`DATE_FORMAT`] for them rather than relying on
/// chrono's serde default.
pub trait Record {
    fn to_field_map(&self) -> Map<String, Value>;
}

/// One step of the encoder chain: claims a value and encodes it, or passes
type EncodeRule =
    Box<dyn Fn(&ResponseEncoder, &dyn Any) -> Option<Result<Value, EncodeError>> + Send + Sync>;

/// Ordered chain of type-predicate encoding rules
///
/// Rules are tried in insertion order; the first rule whose type matches
/// wins. [`ResponseEncoder::new`] seeds the temporal rules; register rules
/// for collection and record types behind them with
/// [`with_rule`](ResponseEncoder::with_rule).
pub struct ResponseEncoder {
    rules: Vec<EncodeRule>,
}

impl ResponseEncoder {
    /// Encoder with the default temporal chain
    ///
    /// Order matters: `DateTime` rules come before `NaiveDate`.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
            .with_rule(rule::<DateTime<Utc>, _>(|_, dt| {
                Ok(Value::String(dt.format(TIME_FORMAT).to_string()))
            }))
            .with_rule(rule::<DateTime<FixedOffset>, _>(|_, dt| {
                Ok(Value::String(dt.format(TIME_FORMAT).to_string()))
            }))
            .with_rule(rule::<NaiveDate, _>(|_, d| {
                Ok(Value::String(d.format(DATE_FORMAT).to_string()))
            }))
    }

    /// Encoder with no rules at all; everything falls through to serde
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule to the end of the chain
    pub fn with_rule(mut self, rule: EncodeRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Encode a value: first matching rule wins, serde is the fallback
    pub fn encode<T: Serialize + Any>(&self, value: &T) -> Result<Value, EncodeError> {
        if let Some(result) = self.encode_dyn(value) {
            return result;
        }
        serde_json::to_value(value).map_err(EncodeError::from)
    }

    /// Run only the rule chain; `None` means no rule claimed the value
    pub fn encode_dyn(&self, value: &dyn Any) -> Option<Result<Value, EncodeError>> {
        self.rules.iter().find_map(|rule| rule(self, value))
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a rule claiming exactly the type `T`
pub fn rule<T, F>(encode: F) -> EncodeRule
where
    T: Any,
    F: Fn(&ResponseEncoder, &T) -> Result<Value, EncodeError> + Send + Sync + 'static,
{
    Box::new(move |encoder, any| any.downcast_ref::<T>().map(|v| encode(encoder, v)))
}

/// Rule converting a [`Record`] type into its field map
pub fn record_rule<T>() -> EncodeRule
where
    T: Record + Any,
{
    rule::<T, _>(|_, record| Ok(Value::Object(record.to_field_map())))
}

/// Rule materializing a queryset into a JSON array, encoding each element
/// back through the chain
pub fn queryset_rule<Q>() -> EncodeRule
where
    Q: QuerySet + Clone + Any,
    Q::Item: Serialize + Any,
{
    rule::<Q, _>(|encoder, qs| {
        let items = qs.clone().collect_items();
        let mut encoded = Vec::with_capacity(items.len());
        for item in &items {
            encoded.push(encoder.encode(item)?);
        }
        Ok(Value::Array(encoded))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::VecQuery;
    use chrono::TimeZone;
    use serde_json::json;

    #[derive(Clone, Serialize)]
    struct User {
        id: u32,
        name: String,
    }

    impl Record for User {
        fn to_field_map(&self) -> Map<String, Value> {
            let mut m = Map::new();
            m.insert("id".into(), json!(self.id));
            m.insert("name".into(), json!(self.name));
            m
        }
    }

    #[test]
    fn test_datetime_uses_time_format() {
        let enc = ResponseEncoder::new();
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 13, 45, 9).unwrap();
        assert_eq!(enc.encode(&dt).unwrap(), json!("2024-03-01 13:45:09"));
    }

    #[test]
    fn test_date_uses_date_format() {
        let enc = ResponseEncoder::new();
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(enc.encode(&d).unwrap(), json!("2024-03-01"));
    }

    #[test]
    fn test_datetime_is_not_truncated_to_date() {
        // the timestamp rule must win over the date rule
        let enc = ResponseEncoder::new();
        let dt = Utc.with_ymd_and_hms(2024, 3, 1, 13, 45, 9).unwrap();
        let encoded = enc.encode(&dt).unwrap();
        assert!(encoded.as_str().unwrap().contains("13:45:09"));
    }

    #[test]
    fn test_record_rule_converts_to_field_map() {
        let enc = ResponseEncoder::new().with_rule(record_rule::<User>());
        let user = User {
            id: 7,
            name: "alice".into(),
        };
        assert_eq!(enc.encode(&user).unwrap(), json!({"id": 7, "name": "alice"}));
    }

    #[test]
    fn test_record_renders_its_own_temporal_fields() {
        struct Event {
            at: DateTime<Utc>,
        }

        impl Record for Event {
            fn to_field_map(&self) -> Map<String, Value> {
                let mut m = Map::new();
                m.insert("at".into(), json!(self.at.format(TIME_FORMAT).to_string()));
                m
            }
        }

        let enc = ResponseEncoder::new().with_rule(record_rule::<Event>());
        let event = Event {
            at: Utc.with_ymd_and_hms(2024, 3, 1, 13, 45, 9).unwrap(),
        };
        let encoded = enc.encode_dyn(&event).unwrap().unwrap();
        assert_eq!(encoded, json!({"at": "2024-03-01 13:45:09"}));
    }

    #[test]
    fn test_queryset_rule_materializes_elements() {
        let enc = ResponseEncoder::new()
            .with_rule(queryset_rule::<VecQuery<User>>())
            .with_rule(record_rule::<User>());
        let qs = VecQuery::new(vec![
            User {
                id: 1,
                name: "a".into(),
            },
            User {
                id: 2,
                name: "b".into(),
            },
        ]);
        assert_eq!(
            enc.encode(&qs).unwrap(),
            json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}])
        );
    }

    #[test]
    fn test_unclaimed_value_falls_through_to_serde() {
        let enc = ResponseEncoder::new();
        assert_eq!(enc.encode(&vec![1, 2, 3]).unwrap(), json!([1, 2, 3]));
    }

    #[test]
    fn test_rule_order_first_match_wins() {
        let enc = ResponseEncoder::empty()
            .with_rule(rule::<u32, _>(|_, _| Ok(json!("first"))))
            .with_rule(rule::<u32, _>(|_, _| Ok(json!("second"))));
        assert_eq!(enc.encode(&5u32).unwrap(), json!("first"));
    }
}
