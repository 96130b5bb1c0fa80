//! Lenient typed lookups on a `serde_json::Value` object.
//!
//! Used for host-supplied field configuration, where a missing or mistyped
//! key falls back to the field's default instead of failing.

use serde_json::Value;

/// `params[name]` as `f64`, or `default`. Integers are widened.
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// `params[name]` as `usize`, or `default` for anything but a
/// non-negative integer.
pub fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| usize::try_from(v).ok())
        .unwrap_or(default)
}

/// `params[name]` as `u64`, or `default` for anything but a
/// non-negative integer.
pub fn param_u64(params: &Value, name: &str, default: u64) -> u64 {
    params.get(name).and_then(Value::as_u64).unwrap_or(default)
}

/// `params[name]` as `u32`, or `default` when absent or out of range.
pub fn param_u32(params: &Value, name: &str, default: u32) -> u32 {
    params
        .get(name)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(default)
}
