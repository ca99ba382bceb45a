//! Small JSON-map utilities used to shape query filter criteria
//!
//! All helpers operate on `serde_json::Map` and preserve insertion order
//! (the crate enables serde_json's `preserve_order` feature), so removals use
//! `shift_remove` rather than swap semantics.

use serde_json::{Map, Value};

/// Marker suffix for substring/partial-match filters, as opposed to equality
pub const CONTAINS_SUFFIX: &str = "__icontains";

/// Remove each key in `keys` from `data` if present; absent keys are a no-op
pub fn delete_keys(data: &mut Map<String, Value>, keys: &[&str]) {
    for key in keys {
        data.shift_remove(*key);
    }
}

/// Pop the present keys in `keys` out of `data` into a new map
///
/// The extracted keys are removed from `data` as a side effect.
pub fn extract_keys(data: &mut Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    let mut extracted = Map::new();
    for key in keys {
        if let Some(value) = data.shift_remove(*key) {
            extracted.insert((*key).to_string(), value);
        }
    }
    extracted
}

/// Move values from old keys to new keys, then mark search fields
///
/// For each `(old, new)` pair with `old` present, the value moves to `new`
/// (delete `old`, set `new`). When `search_fields` is given, a single second
/// pass renames every listed field whose value is truthy at that point to
/// `{field}__icontains`; an empty string means "exact query" and is left
/// alone. The second pass reuses the same rename logic, so renames are never
/// chained beyond that one extra pass.
pub fn rename_keys(
    data: &mut Map<String, Value>,
    renames: &[(&str, &str)],
    search_fields: Option<&[&str]>,
) {
    for (old, new) in renames {
        if let Some(value) = data.shift_remove(*old) {
            data.insert((*new).to_string(), value);
        }
    }
    if let Some(fields) = search_fields {
        let contains: Vec<(String, String)> = fields
            .iter()
            .filter(|f| data.get(**f).is_some_and(is_truthy))
            .map(|f| ((*f).to_string(), format!("{}{}", f, CONTAINS_SUFFIX)))
            .collect();
        let pairs: Vec<(&str, &str)> = contains
            .iter()
            .map(|(old, new)| (old.as_str(), new.as_str()))
            .collect();
        rename_keys(data, &pairs, None);
    }
}

/// Truthiness in the sense query filters care about: null, false, zero and
/// empty containers all mean "no filter"
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
