// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic field values attached to log records.
//!
//! Fields are an ordered `key → value` mapping. Values are a small tagged
//! sum over the JSON-representable types; durations are always carried as
//! integer milliseconds so serialization stays stable across platforms.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A JSON-serializable field value.
///
/// Integers serialize as integers (never floats). `Duration` converts to
/// `Int` milliseconds on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<FieldValue>),
    Map(IndexMap<String, FieldValue>),
}

impl FieldValue {
    /// Integer value, if this is an `Int`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// String value, if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(v.into())
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for FieldValue {
    fn from(v: usize) -> Self {
        FieldValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<Duration> for FieldValue {
    fn from(v: Duration) -> Self {
        FieldValue::Int(i64::try_from(v.as_millis()).unwrap_or(i64::MAX))
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(v: Vec<T>) -> Self {
        FieldValue::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, FieldValue>> for FieldValue {
    fn from(v: IndexMap<String, FieldValue>) -> Self {
        FieldValue::Map(v)
    }
}

/// Ordered list of call-site fields, as accepted by the logger façade.
pub type Fields = Vec<(String, FieldValue)>;

/// Merge scoped fields with call-site fields into the record's final map.
///
/// Scoped fields come first; call-site fields override on key conflict.
pub fn merge_fields(scoped: &[(String, FieldValue)], call_site: Fields) -> IndexMap<String, FieldValue> {
    let mut merged = IndexMap::with_capacity(scoped.len() + call_site.len());
    for (key, value) in scoped {
        merged.insert(key.clone(), value.clone());
    }
    for (key, value) in call_site {
        merged.insert(key, value);
    }
    merged
}

/// Build a [`Fields`] list from `key => value` pairs.
///
/// ```ignore
/// let f = fields! { "status" => 200, "url" => "https://example.com/" };
/// ```
#[macro_export]
macro_rules! fields {
    () => { $crate::field::Fields::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {
        vec![ $( ($key.to_string(), $crate::field::FieldValue::from($value)) ),+ ]
    };
}

#[cfg(test)]
#[path = "field_tests.rs"]
mod tests;
