//! Total scalar coercions.
//!
//! None of these functions fail except [`hex_to_decimal`]: a value of an
//! unsupported shape converts to the zero value of the target type.

use sha2::{Digest, Sha256};

use crate::{Result, RuntimeError};

use super::{dereference, format_duration, parse_duration, Duration, Value};

/// Nanoseconds in a duration, saturating at the `i64` range.
pub(crate) fn duration_nanos(d: Duration) -> i64 {
    match d.num_nanoseconds() {
        Some(n) => n,
        None if d < Duration::zero() => i64::MIN,
        None => i64::MAX,
    }
}

/// Shortest decimal that round-trips, switching to exponent form only for
/// very large or very small magnitudes.
pub(crate) fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    let abs = x.abs();
    if abs != 0.0 && !(1e-6..1e21).contains(&abs) {
        format!("{x:e}")
    } else {
        format!("{x}")
    }
}

/// Convert to an integer.
pub fn to_int(value: &Value) -> i64 {
    match dereference(value) {
        Some(Value::Int(n)) => *n,
        Some(Value::Float(x)) => *x as i64,
        Some(Value::Str(s)) => s.parse().unwrap_or(0),
        Some(Value::Duration(d)) => duration_nanos(*d),
        _ => 0,
    }
}

/// Convert to a float.
pub fn to_float(value: &Value) -> f64 {
    match dereference(value) {
        Some(Value::Int(n)) => *n as f64,
        Some(Value::Float(x)) => *x,
        Some(Value::Str(s)) => s.parse().unwrap_or(0.0),
        Some(Value::Duration(d)) => duration_nanos(*d) as f64,
        _ => 0.0,
    }
}

/// Convert to a string.
///
/// Lists and maps have no string form here and give `""`.
pub fn to_string(value: &Value) -> String {
    match dereference(value) {
        Some(Value::Str(s)) => s.clone(),
        Some(Value::Int(n)) => n.to_string(),
        Some(Value::Float(x)) => format_float(*x),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Duration(d)) => format_duration(*d),
        Some(v @ Value::Timestamp(_)) => v.to_string(),
        Some(Value::Object(obj)) => obj.display(),
        _ => String::new(),
    }
}

/// Convert to a duration.
///
/// Numbers count nanoseconds. Strings go through [`parse_duration`]; a
/// result under one second is treated as zero.
pub fn to_duration(value: &Value) -> Duration {
    match dereference(value) {
        Some(Value::Int(n)) => Duration::nanoseconds(*n),
        Some(Value::Float(x)) => Duration::nanoseconds(*x as i64),
        Some(Value::Str(s)) => match parse_duration(s) {
            Ok(d) if d >= Duration::seconds(1) => d,
            _ => Duration::zero(),
        },
        Some(Value::Duration(d)) => *d,
        _ => Duration::zero(),
    }
}

/// Convert to a list of characters.
pub fn to_rune(value: &Value) -> Vec<char> {
    match dereference(value) {
        Some(v @ (Value::Int(_) | Value::Float(_) | Value::Str(_))) => {
            to_string(v).chars().collect()
        }
        _ => Vec::new(),
    }
}

/// Convert to a list of bytes.
pub fn to_byte(value: &Value) -> Vec<u8> {
    match dereference(value) {
        Some(v @ (Value::Int(_) | Value::Float(_) | Value::Str(_))) => to_string(v).into_bytes(),
        _ => Vec::new(),
    }
}

/// Convert to an integer, reading strings as base 16.
pub fn to_hex_int(value: &Value) -> i64 {
    match dereference(value) {
        Some(Value::Str(s)) => i64::from_str_radix(s, 16).unwrap_or(0),
        Some(v) => to_int(v),
        None => 0,
    }
}

/// Lowercase hex SHA-256 digest of the value's bytes.
pub fn to_sha256(value: &Value) -> String {
    format!("{:x}", Sha256::digest(to_byte(value)))
}

/// Parse a color-style hex string (`"#ff00ff"`, `"ff00ff"`) into a number.
///
/// Numbers pass through unchanged.
///
/// # Errors
///
/// Returns a validation error if the string is not a 32-bit hex number.
pub fn hex_to_decimal(value: &Value) -> Result<i64> {
    match dereference(value) {
        Some(v @ (Value::Int(_) | Value::Float(_))) => Ok(to_int(v)),
        other => {
            let raw = other.map(to_string).unwrap_or_default();
            let digits = raw.trim_start_matches('#');
            i32::from_str_radix(digits, 16)
                .map(i64::from)
                .map_err(|e| RuntimeError::Validation(format!("invalid hex value {raw:?}: {e}")))
        }
    }
}

/// Whether `needle` is an element of `haystack`.
///
/// A string haystack matches substrings instead.
pub fn in_list(haystack: &Value, needle: &Value) -> bool {
    match (dereference(haystack), dereference(needle)) {
        (Some(Value::Str(h)), Some(Value::Str(n))) => h.contains(n.as_str()),
        (Some(Value::List(items)), needle) => items
            .iter()
            .any(|item| dereference(item) == needle),
        _ => false,
    }
}

/// Case-insensitive variant of [`in_list`] for strings.
pub fn in_fold(haystack: &Value, needle: &Value) -> bool {
    let Some(Value::Str(n)) = dereference(needle) else {
        return false;
    };
    let n = n.to_lowercase();
    match dereference(haystack) {
        Some(Value::Str(h)) => h.to_lowercase().contains(&n),
        Some(Value::List(items)) => items.iter().any(|item| match dereference(item) {
            Some(Value::Str(s)) => s.to_lowercase() == n,
            _ => false,
        }),
        _ => false,
    }
}
