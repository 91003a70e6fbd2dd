//! Predicate filter over collections of unknown shape
//!
//! `must_filter` keeps the elements of a collection whose field or key named
//! `key` equals `value`. What "equals" means depends on the element:
//!
//! - maps compare the entry's value with `value` using full value equality,
//!   so `42` does not match `"42"`;
//! - records (plain objects exposed by the host, reached through their
//!   `Arc`) compare string representations, so a field holding `42`
//!   matches `"42"`.
//!
//! `filter` runs the same operation but panics instead of returning the
//! error, for callers that have already validated their arguments.

use minijinja::Value;
use minijinja::value::ValueKind;

use crate::error::FilterError;

/// Introspected shape of a value handed to the filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Sequences, fixed-size arrays and other iterables
    Sequence,
    /// Map-like values
    Map,
    /// Plain objects whose fields are reached by attribute lookup
    Record,
    /// Anything else
    Scalar(ValueKind),
}

impl Shape {
    /// Classify a value
    pub fn of(value: &Value) -> Self {
        match value.kind() {
            ValueKind::Seq | ValueKind::Iterable => Shape::Sequence,
            ValueKind::Map => Shape::Map,
            ValueKind::Plain => Shape::Record,
            kind => Shape::Scalar(kind),
        }
    }
}

/// Filter a collection by a key/value predicate.
///
/// Sequences yield every matching element in order. A single map is treated
/// as one candidate: the result is `[map]` on a match and `[]` otherwise.
/// Any other collection fails with [`FilterError::TypeMismatch`]. A
/// non-string key fails with [`FilterError::KeyNotString`] once a map or
/// record has to be inspected; an empty sequence, or one holding only
/// scalars, never looks at the key.
pub fn must_filter(
    key: &Value,
    value: &Value,
    collection: &Value,
) -> Result<Vec<Value>, FilterError> {
    let shape = Shape::of(collection);
    if !matches!(shape, Shape::Sequence | Shape::Map) {
        tracing::debug!(kind = ?collection.kind(), "filter on unsupported collection");
        return Err(FilterError::TypeMismatch {
            kind: format!("{:?}", collection.kind()),
        });
    }

    if shape == Shape::Map {
        return Ok(if matches_item(collection, key_str(key)?, value) {
            vec![collection.clone()]
        } else {
            Vec::new()
        });
    }

    let items = collection.try_iter().map_err(|_| FilterError::TypeMismatch {
        kind: format!("{:?}", collection.kind()),
    })?;

    let mut matches = Vec::new();
    for item in items {
        let needs_key = matches!(Shape::of(&item), Shape::Map | Shape::Record);
        if needs_key && matches_item(&item, key_str(key)?, value) {
            matches.push(item);
        }
    }
    Ok(matches)
}

/// Like [`must_filter`], for arguments already known to be well formed.
///
/// # Panics
///
/// Panics on every condition [`must_filter`] reports as an error.
pub fn filter(key: &Value, value: &Value, collection: &Value) -> Vec<Value> {
    match must_filter(key, value, collection) {
        Ok(items) => items,
        Err(err) => panic!("filter: {err}"),
    }
}

fn key_str(key: &Value) -> Result<&str, FilterError> {
    key.as_str().ok_or_else(|| FilterError::KeyNotString {
        kind: format!("{:?}", key.kind()),
    })
}

/// Element match rule
fn matches_item(item: &Value, key: &str, expected: &Value) -> bool {
    match Shape::of(item) {
        Shape::Map => map_entry_equals(item, key, expected),
        Shape::Record => record_field_equals(item, key, expected),
        Shape::Sequence | Shape::Scalar(_) => false,
    }
}

/// The first key whose string form is `key` decides the match.
fn map_entry_equals(map: &Value, key: &str, expected: &Value) -> bool {
    let Ok(keys) = map.try_iter() else {
        return false;
    };

    for candidate in keys {
        if display_string(&candidate) == key {
            return map
                .get_item(&candidate)
                .map(|entry| entry == *expected)
                .unwrap_or(false);
        }
    }
    false
}

fn record_field_equals(record: &Value, field: &str, expected: &Value) -> bool {
    match record.get_attr(field) {
        Ok(v) if !v.is_undefined() => display_string(&v) == display_string(expected),
        _ => false,
    }
}

fn display_string(value: &Value) -> String {
    if let Some(s) = value.as_str() {
        s.to_string()
    } else {
        value.to_string()
    }
}

// ============ Template functions ============

/// Filter a list by key/value, reporting unsupported collections as errors
///
/// Usage: {{ mustFilter("name", "web", values.services) }}
pub fn must_filter_fn(
    key: Value,
    value: Value,
    collection: Value,
) -> Result<Value, minijinja::Error> {
    Ok(Value::from(must_filter(&key, &value, &collection)?))
}

/// Filter a list by key/value, aborting on unsupported collections
///
/// Usage: {{ filter("name", "web", values.services) }}
pub fn filter_fn(key: Value, value: Value, collection: Value) -> Value {
    Value::from(filter(&key, &value, &collection))
}
