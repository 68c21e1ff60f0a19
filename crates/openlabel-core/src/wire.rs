//! Helpers for reading typed fields out of the canonical JSON tree.
//!
//! Errors carry a dotted path so a failed typed load points at the node
//! that broke it, the same way schema violations do.

use serde_json::{Map, Value};

use crate::error::{OpenLabelError, Result};

pub type JsonMap = Map<String, Value>;

fn missing(path: &str, key: &str) -> OpenLabelError {
    OpenLabelError::parse(format!("{path}: missing `{key}`"))
}

fn wrong(path: &str, key: &str, expected: &str) -> OpenLabelError {
    OpenLabelError::parse(format!("{path}.{key}: expected {expected}"))
}

/// Borrow a value as a JSON object.
pub fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a JsonMap> {
    value
        .as_object()
        .ok_or_else(|| OpenLabelError::parse(format!("{path}: expected an object")))
}

pub fn req_str(map: &JsonMap, key: &str, path: &str) -> Result<String> {
    map.get(key)
        .ok_or_else(|| missing(path, key))?
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| wrong(path, key, "a string"))
}

pub fn opt_str(map: &JsonMap, key: &str, path: &str) -> Result<Option<String>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(wrong(path, key, "a string")),
    }
}

pub fn req_f64(map: &JsonMap, key: &str, path: &str) -> Result<f64> {
    map.get(key)
        .ok_or_else(|| missing(path, key))?
        .as_f64()
        .ok_or_else(|| wrong(path, key, "a number"))
}

pub fn opt_f64(map: &JsonMap, key: &str, path: &str) -> Result<Option<f64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| wrong(path, key, "a number")),
    }
}

pub fn opt_u64(map: &JsonMap, key: &str, path: &str) -> Result<Option<u64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| wrong(path, key, "an unsigned integer")),
    }
}

pub fn opt_i64(map: &JsonMap, key: &str, path: &str) -> Result<Option<i64>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or_else(|| wrong(path, key, "an integer")),
    }
}

pub fn opt_bool(map: &JsonMap, key: &str, path: &str) -> Result<Option<bool>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(wrong(path, key, "a boolean")),
    }
}

/// Numeric array field. Missing is an error.
pub fn req_f64_array(map: &JsonMap, key: &str, path: &str) -> Result<Vec<f64>> {
    let arr = map
        .get(key)
        .ok_or_else(|| missing(path, key))?
        .as_array()
        .ok_or_else(|| wrong(path, key, "an array"))?;
    arr.iter()
        .map(|v| v.as_f64().ok_or_else(|| wrong(path, key, "an array of numbers")))
        .collect()
}

pub fn opt_f64_array(map: &JsonMap, key: &str, path: &str) -> Result<Option<Vec<f64>>> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(_) => req_f64_array(map, key, path).map(Some),
    }
}

pub fn req_str_array(map: &JsonMap, key: &str, path: &str) -> Result<Vec<String>> {
    let arr = map
        .get(key)
        .ok_or_else(|| missing(path, key))?
        .as_array()
        .ok_or_else(|| wrong(path, key, "an array"))?;
    arr.iter()
        .map(|v| {
            v.as_str()
                .map(str::to_owned)
                .ok_or_else(|| wrong(path, key, "an array of strings"))
        })
        .collect()
}

/// Copy every entry whose key is not in `known`.
pub fn extras(map: &JsonMap, known: &[&str]) -> JsonMap {
    map.iter()
        .filter(|(k, _)| !known.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// JSON number from an `f64`, written as an integer when it has no fraction.
pub fn number(x: f64) -> Value {
    if x.fract() == 0.0 && x.abs() < 9.0e15 {
        Value::from(x as i64)
    } else {
        Value::from(x)
    }
}

pub fn numbers(xs: &[f64]) -> Value {
    Value::Array(xs.iter().copied().map(number).collect())
}

/// Child path for error messages.
pub fn join(path: &str, key: impl std::fmt::Display) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
