//! Script-constructible containers.
//!
//! `dict`, `sdict` and `cslice` build these from either a flat key/value
//! argument list or a single existing collection. Unlike the scalar
//! coercions, construction rejects malformed input.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use crate::{Result, RuntimeError};

use super::{dereference, Duration, Timestamp, Value};

/// Maximum number of elements a [`Slice`] may grow to through `append`.
pub const MAX_SLICE_LEN: usize = 10_000;

/// Comparable map key.
///
/// Floats compare by their total order so `NaN` is a usable key.
#[derive(Debug, Clone)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Duration(Duration),
    Timestamp(Timestamp),
}

impl MapKey {
    /// Build a key from a value, dereferencing it first.
    ///
    /// # Errors
    ///
    /// Nil values and containers cannot be keys.
    pub fn from_value(value: &Value) -> Result<Self> {
        match dereference(value) {
            Some(Value::Bool(b)) => Ok(MapKey::Bool(*b)),
            Some(Value::Int(n)) => Ok(MapKey::Int(*n)),
            Some(Value::Float(x)) => Ok(MapKey::Float(*x)),
            Some(Value::Str(s)) => Ok(MapKey::Str(s.clone())),
            Some(Value::Duration(d)) => Ok(MapKey::Duration(*d)),
            Some(Value::Timestamp(t)) => Ok(MapKey::Timestamp(*t)),
            Some(other) => Err(RuntimeError::Validation(format!(
                "invalid map key of kind {}",
                other.kind()
            ))),
            None => Err(RuntimeError::Validation("nil map key".to_string())),
        }
    }

    /// Convert back into a value.
    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(n) => Value::Int(*n),
            MapKey::Float(x) => Value::Float(*x),
            MapKey::Str(s) => Value::Str(s.clone()),
            MapKey::Duration(d) => Value::Duration(*d),
            MapKey::Timestamp(t) => Value::Timestamp(*t),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            MapKey::Bool(_) => 0,
            MapKey::Int(_) => 1,
            MapKey::Float(_) => 2,
            MapKey::Str(_) => 3,
            MapKey::Duration(_) => 4,
            MapKey::Timestamp(_) => 5,
        }
    }
}

impl Ord for MapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (MapKey::Bool(a), MapKey::Bool(b)) => a.cmp(b),
            (MapKey::Int(a), MapKey::Int(b)) => a.cmp(b),
            (MapKey::Float(a), MapKey::Float(b)) => a.total_cmp(b),
            (MapKey::Str(a), MapKey::Str(b)) => a.cmp(b),
            (MapKey::Duration(a), MapKey::Duration(b)) => a.cmp(b),
            (MapKey::Timestamp(a), MapKey::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for MapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MapKey {}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl From<&str> for MapKey {
    fn from(s: &str) -> Self {
        MapKey::Str(s.to_string())
    }
}

impl From<i64> for MapKey {
    fn from(n: i64) -> Self {
        MapKey::Int(n)
    }
}

/// Map with arbitrary comparable keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict(BTreeMap<MapKey, Value>);

impl Dict {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key. Unusable keys simply miss.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        MapKey::from_value(key).ok().and_then(|k| self.0.get(&k))
    }

    /// Insert or replace an entry.
    pub fn set(&mut self, key: &Value, value: Value) -> Result<()> {
        self.0.insert(MapKey::from_value(key)?, value);
        Ok(())
    }

    /// Remove an entry, returning it if it existed.
    pub fn del(&mut self, key: &Value) -> Option<Value> {
        MapKey::from_value(key).ok().and_then(|k| self.0.remove(&k))
    }

    /// Whether the key is present.
    pub fn has_key(&self, key: &Value) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&MapKey, &Value)> {
        self.0.iter()
    }

    /// Values in key order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.values()
    }
}

/// Map with string keys.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SDict(BTreeMap<String, Value>);

impl SDict {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert or replace an entry, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn del(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Values in key order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.values()
    }
}

/// Ordered list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slice(Vec<Value>);

impl Slice {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Replace the element at `index`.
    ///
    /// # Errors
    ///
    /// Fails if `index` is out of range.
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let len = self.0.len();
        let slot = self.0.get_mut(index).ok_or_else(|| {
            RuntimeError::Validation(format!("index out of range: {index} with length {len}"))
        })?;
        *slot = value;
        Ok(())
    }

    /// Append elements.
    ///
    /// # Errors
    ///
    /// Fails without modifying the list if the result would hold more than
    /// [`MAX_SLICE_LEN`] elements.
    pub fn append(&mut self, items: impl IntoIterator<Item = Value>) -> Result<()> {
        let items: Vec<Value> = items.into_iter().collect();
        if self.0.len() + items.len() > MAX_SLICE_LEN {
            return Err(RuntimeError::Validation(format!(
                "resulting slice exceeds {MAX_SLICE_LEN} elements"
            )));
        }
        self.0.extend(items);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Slice {
    fn from(items: Vec<Value>) -> Self {
        Slice(items)
    }
}

impl FromIterator<Value> for Slice {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Slice(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Slice {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

fn check_pairs(args: &[Value]) -> Result<()> {
    if args.len() % 2 != 0 {
        return Err(RuntimeError::Validation("invalid dict call".to_string()));
    }
    Ok(())
}

fn single_arg_error(value: Option<&Value>) -> RuntimeError {
    match value {
        None => RuntimeError::Validation("nil value passed".to_string()),
        Some(v) => RuntimeError::Validation(format!("cannot convert data of type: {}", v.kind())),
    }
}

/// Build a [`Dict`] from key/value pairs or a single map.
pub fn build_map(args: &[Value]) -> Result<Dict> {
    if let [single] = args {
        return match dereference(single) {
            Some(Value::Map(map)) => Ok(map.clone()),
            Some(Value::SMap(map)) => Ok(Dict(
                map.iter()
                    .map(|(k, v)| (MapKey::Str(k.clone()), v.clone()))
                    .collect(),
            )),
            other => Err(single_arg_error(other)),
        };
    }

    check_pairs(args)?;
    let mut dict = Dict::new();
    for pair in args.chunks(2) {
        dict.set(&pair[0], pair[1].clone())?;
    }
    Ok(dict)
}

/// Build an [`SDict`] from key/value pairs or a single map.
///
/// Every key must be a string.
pub fn build_string_map(args: &[Value]) -> Result<SDict> {
    if let [single] = args {
        return match dereference(single) {
            Some(Value::SMap(map)) => Ok(map.clone()),
            Some(Value::Map(map)) => {
                let mut out = SDict::new();
                for (k, v) in map.iter() {
                    match k {
                        MapKey::Str(s) => {
                            out.set(s.clone(), v.clone());
                        }
                        other => {
                            return Err(RuntimeError::Validation(format!(
                                "map has non string key of type: {}",
                                other.to_value().kind()
                            )))
                        }
                    }
                }
                Ok(out)
            }
            other => Err(single_arg_error(other)),
        };
    }

    check_pairs(args)?;
    let mut out = SDict::new();
    for pair in args.chunks(2) {
        match dereference(&pair[0]) {
            Some(Value::Str(key)) => {
                out.set(key.clone(), pair[1].clone());
            }
            other => {
                let kind = other.map(Value::kind).unwrap_or("invalid");
                return Err(RuntimeError::Validation(format!(
                    "only string keys supported in sdict, got {kind}"
                )));
            }
        }
    }
    Ok(out)
}

/// Build a [`Slice`] from the arguments.
///
/// A single list argument is copied; anything else becomes the elements.
pub fn build_list(args: &[Value]) -> Slice {
    if let [single] = args {
        if let Some(Value::List(items)) = dereference(single) {
            return items.clone();
        }
    }
    Slice::from(args.to_vec())
}
