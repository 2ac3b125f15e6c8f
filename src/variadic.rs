//! Argument flattening for builtins that accept `f(a, b, c)` and `f([a, b, c])`.

use crate::value::{dereference, Value};

/// Flatten call arguments into one sequence.
///
/// Lists are spliced in order (one level). Nil arguments are dropped when
/// `skip_nil` is set and kept as [`Value::Null`] otherwise. Everything else
/// is appended as is.
pub fn flatten(values: &[Value], skip_nil: bool) -> Vec<Value> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        match dereference(value) {
            Some(Value::List(items)) => out.extend(items.iter().cloned()),
            Some(_) => out.push(value.clone()),
            None if skip_nil => {}
            None => out.push(Value::Null),
        }
    }
    out
}

/// Flatten and convert every element to a string, dropping nils.
pub fn flatten_strings(values: &[Value]) -> Vec<String> {
    flatten(values, true)
        .iter()
        .map(crate::value::to_string)
        .collect()
}
