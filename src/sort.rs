//! Sorting of mixed-type lists.
//!
//! Elements are split into seven buckets by type, each bucket is sorted on
//! its own, and the buckets are emitted in a fixed order:
//!
//! | # | bucket     | ordered by        |
//! |---|------------|-------------------|
//! | 0 | integers   | value             |
//! | 1 | floats     | value, NaN first  |
//! | 2 | strings    | byte order        |
//! | 3 | timestamps | time              |
//! | 4 | lists      | element count     |
//! | 5 | maps       | entry count       |
//! | 6 | other      | input order       |
//!
//! With the `key` option, lists of records are sorted by one field or index.

use std::cmp::Ordering;

use crate::value::{build_string_map, dereference, Value};
use crate::{Result, RuntimeError};

/// Number of buckets, and of sub-lists with `subslices` + `emptyslices`.
pub const BUCKET_COUNT: usize = 7;

/// Output options of [`sort`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortOptions {
    /// Sort every bucket in descending order.
    pub reverse: bool,
    /// Emit one sub-list per bucket instead of one flat list.
    pub subslices: bool,
    /// With `subslices`, keep empty buckets so there are always seven.
    pub emptyslices: bool,
    /// Sort records by this list index or map key instead of by themselves.
    pub key: Option<Value>,
}

impl SortOptions {
    /// Parse options from a flat key/value list or a single map.
    ///
    /// Keys are case-insensitive.
    ///
    /// # Errors
    ///
    /// Unknown keys and non-bool flag values are rejected.
    pub fn parse(args: &[Value]) -> Result<Self> {
        let mut opts = Self::default();
        for (name, value) in build_string_map(args)?.iter() {
            let name = name.to_lowercase();
            if name == "key" {
                opts.key = dereference(value).cloned();
                continue;
            }
            let flag = value.as_bool().ok_or_else(|| {
                RuntimeError::Validation(format!(
                    "sort option {name:?} must be a bool, got {}",
                    value.kind()
                ))
            })?;
            match name.as_str() {
                "reverse" => opts.reverse = flag,
                "subslices" => opts.subslices = flag,
                "emptyslices" => opts.emptyslices = flag,
                _ => {
                    return Err(RuntimeError::Validation(format!(
                        "unknown sort option {name:?}"
                    )))
                }
            }
        }
        Ok(opts)
    }
}

/// Look `key` up in a list (by index) or a map (by key).
fn index_container<'a>(container: &'a Value, key: &Value) -> Result<&'a Value> {
    match (dereference(container), dereference(key)) {
        (Some(Value::List(items)), Some(Value::Int(i))) => usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .ok_or_else(|| RuntimeError::Validation(format!("index {i} out of range"))),
        (Some(Value::List(_)), Some(other)) => Err(RuntimeError::Validation(format!(
            "cannot index slice by key of type {}",
            other.kind()
        ))),
        (Some(Value::SMap(map)), Some(Value::Str(k))) => map
            .get(k)
            .ok_or_else(|| RuntimeError::Validation(format!("key {k} not found in map"))),
        (Some(Value::Map(map)), Some(k)) => map
            .get(k)
            .ok_or_else(|| RuntimeError::Validation(format!("key {k} not found in map"))),
        (Some(other), _) => Err(RuntimeError::Validation(format!(
            "cannot index value of type {}",
            other.kind()
        ))),
        (None, _) => Err(RuntimeError::Validation(
            "cannot index value of type nil".to_string(),
        )),
    }
}

fn bucket_of(value: &Value) -> usize {
    match value {
        Value::Int(_) => 0,
        Value::Float(_) => 1,
        Value::Str(_) => 2,
        Value::Timestamp(_) => 3,
        Value::List(_) => 4,
        Value::Map(_) | Value::SMap(_) => 5,
        _ => 6,
    }
}

fn container_len(value: &Value) -> usize {
    match value {
        Value::List(items) => items.len(),
        Value::Map(map) => map.len(),
        Value::SMap(map) => map.len(),
        _ => 0,
    }
}

fn float_cmp(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Ascending order within one bucket.
fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => float_cmp(*x, *y),
        (Value::Str(x), Value::Str(y)) => x.cmp(y),
        (Value::Timestamp(x), Value::Timestamp(y)) => x.cmp(y),
        _ => container_len(a).cmp(&container_len(b)),
    }
}

/// Sort a mixed list.
///
/// Elements are dereferenced first. A `Ref` to nothing is dropped, a bare
/// nil lands in the `other` bucket. With [`SortOptions::key`] each element
/// is bucketed and compared by the value found under that key, and the
/// element itself is emitted.
///
/// # Errors
///
/// Fails when the key cannot be looked up in some element.
pub fn sort(items: &[Value], opts: &SortOptions) -> Result<Vec<Value>> {
    let mut buckets: [Vec<(Value, Value)>; BUCKET_COUNT] = Default::default();
    for item in items {
        let element = match dereference(item) {
            Some(value) => value.clone(),
            None if matches!(item, Value::Ref(_)) => continue,
            None => Value::Null,
        };
        let sort_key = match &opts.key {
            Some(key) => dereference(index_container(&element, key)?)
                .cloned()
                .unwrap_or(Value::Null),
            None => element.clone(),
        };
        buckets[bucket_of(&sort_key)].push((sort_key, element));
    }

    let (sortable, other) = buckets.split_at_mut(BUCKET_COUNT - 1);
    for bucket in sortable {
        if opts.reverse {
            bucket.sort_by(|a, b| compare(&b.0, &a.0));
        } else {
            bucket.sort_by(|a, b| compare(&a.0, &b.0));
        }
    }
    if opts.reverse {
        other[0].reverse();
    }

    let buckets = buckets.map(|bucket| {
        bucket
            .into_iter()
            .map(|(_, element)| element)
            .collect::<Vec<_>>()
    });
    if !opts.subslices {
        return Ok(buckets.into_iter().flatten().collect());
    }

    Ok(buckets
        .into_iter()
        .filter(|bucket| opts.emptyslices || !bucket.is_empty())
        .map(Value::from)
        .collect())
}
