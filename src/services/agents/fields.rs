//! Lenient field readers for LLM-produced JSON objects.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::services::json_extract::coerce_object_list;

/// Non-empty string field; numbers and booleans are stringified.
pub fn opt_string(value: &Value, key: &str) -> Option<String> {
    match value.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn string_or_empty(value: &Value, key: &str) -> String {
    opt_string(value, key).unwrap_or_default()
}

/// List of strings; a single string becomes a one-element list and objects
/// contribute their first string value.
pub fn strings(value: &Value, key: &str) -> Vec<String> {
    let items = match value.get(key) {
        Some(Value::Array(items)) => items.clone(),
        Some(single @ Value::String(_)) => vec![single.clone()],
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(map) => map.values().find_map(|v| v.as_str().map(|s| s.trim().to_string())),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect()
}

/// List of records; bare strings become `{primary: "..."}` and entries that
/// still fail to deserialize are dropped.
pub fn records<T: DeserializeOwned>(value: &Value, key: &str, primary: &str) -> Vec<T> {
    coerce_object_list(value.get(key).cloned(), primary)
        .into_iter()
        .filter_map(|item| serde_json::from_value(normalize_nulls(item)).ok())
        .collect()
}

/// Turn `null` and empty string values into absent keys so optional fields
/// deserialize to `None`.
fn normalize_nulls(item: Value) -> Value {
    match item {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null() && v.as_str().is_none_or(|s| !s.trim().is_empty()))
                .map(|(k, v)| match v {
                    Value::Number(n) => (k, Value::String(n.to_string())),
                    other => (k, other),
                })
                .collect(),
        ),
        other => other,
    }
}
