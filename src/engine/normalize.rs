//! Numeric normalization boundary.
//!
//! Store rows arrive as loosely-typed JSON (numeric strings, 0/1 booleans,
//! nulls). This module is the single place where those values become typed
//! `Option`s. Unparsable or non-finite input yields `None`, never a default
//! and never NaN, so blend math can distinguish "zero" from "unknown".

use serde_json::Value;

/// Coerce a JSON value to a finite number. Returns `None` for null, booleans,
/// non-finite numbers, and unparsable strings. Never panics.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Coerce a JSON value to a boolean. Accepts native booleans, 0/1 (numeric
/// or string), and the case-insensitive tokens true/t/1/yes and
/// false/f/0/no. Anything else yields `None`, not a default.
pub fn to_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v == 0.0 => Some(false),
            Some(v) if v == 1.0 => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Some(true),
            "false" | "f" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Numeric field lookup on a JSON object
pub fn field_number(row: &Value, key: &str) -> Option<f64> {
    row.get(key).and_then(to_number)
}

/// Boolean field lookup on a JSON object
pub fn field_boolean(row: &Value, key: &str) -> Option<bool> {
    row.get(key).and_then(to_boolean)
}

/// Integer field lookup; fractional values are rejected
pub fn field_i64(row: &Value, key: &str) -> Option<i64> {
    field_number(row, key).and_then(|v| {
        if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
            Some(v as i64)
        } else {
            None
        }
    })
}

/// String field lookup; empty strings propagate as `None`
pub fn field_string(row: &Value, key: &str) -> Option<String> {
    row.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
