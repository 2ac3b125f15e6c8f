//! Recursion check for arguments passed into nested templates.
//!
//! A map handed to a nested call must not embed the caller's whole data bag
//! and must not nest deeper than a fixed bound.

use crate::value::{dereference, SDict, Value};

/// Default maximum map nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Whether `container` may be passed as nested template arguments.
///
/// `depth` is the nesting level of `container` itself (0 for the top-level
/// map). Nested maps, including boxed ones, are checked at `depth + 1`. The
/// check fails when a map sits deeper than `max_depth` or when any value is
/// deep-equal to `data`.
pub fn is_safe(container: &Value, depth: usize, data: &SDict, max_depth: usize) -> bool {
    if depth > max_depth {
        return false;
    }

    let values: Box<dyn Iterator<Item = &Value>> = match dereference(container) {
        Some(Value::Map(map)) => Box::new(map.values()),
        Some(Value::SMap(map)) => Box::new(map.values()),
        _ => return true,
    };

    for value in values {
        if let Some(inner @ (Value::Map(_) | Value::SMap(_))) = dereference(value) {
            if !is_safe(inner, depth + 1, data, max_depth) {
                return false;
            }
        }
        if matches!(dereference(value), Some(Value::SMap(map)) if map == data) {
            return false;
        }
    }

    true
}
