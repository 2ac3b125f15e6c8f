//! Dynamic values handled by builtins.
//!
//! Scripts are untyped, so every builtin argument and return value is a
//! [`Value`]. The layer has three parts:
//!
//! - the tagged union itself plus [`dereference`], which strips the explicit
//!   optional wrapper ([`Value::Ref`]) before any type inspection,
//! - total coercions (`to_int`, `to_string`, ...) that never fail,
//! - user-constructible containers ([`Dict`], [`SDict`], [`Slice`]) whose
//!   construction *does* fail on structural mistakes.
//!
//! # Example
//!
//! ```
//! use ccrt::value::{self, Value};
//!
//! assert_eq!(value::to_int(&Value::from("42")), 42);
//! assert_eq!(value::to_int(&Value::from("abc")), 0);
//!
//! let boxed = Value::boxed(Value::from(7));
//! assert_eq!(value::dereference(&boxed), Some(&Value::Int(7)));
//! ```

mod coerce;
mod container;
mod duration;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

pub use coerce::{
    hex_to_decimal, in_fold, in_list, to_byte, to_duration, to_float, to_hex_int, to_int,
    to_rune, to_sha256, to_string,
};
pub use container::{
    build_list, build_map, build_string_map, Dict, MapKey, SDict, Slice, MAX_SLICE_LEN,
};
pub use duration::{format_duration, parse_duration};

/// Signed duration with nanosecond precision.
pub type Duration = chrono::Duration;

/// UTC point in time.
pub type Timestamp = DateTime<Utc>;

/// Host object exposed to scripts with behaviour of its own.
///
/// Objects are never unwrapped by [`dereference`] and compare by identity.
pub trait ScriptObject: fmt::Debug + Send + Sync {
    /// Short type name used by `kindOf` and error messages.
    fn type_name(&self) -> &str;

    /// Text form used when the object is printed or coerced to a string.
    fn display(&self) -> String;
}

/// A dynamically typed script value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Signed duration.
    Duration(Duration),
    /// Point in time.
    Timestamp(Timestamp),
    /// Ordered list.
    List(Slice),
    /// Map with arbitrary comparable keys.
    Map(Dict),
    /// Map with string keys.
    SMap(SDict),
    /// Optional/boxed wrapper; `None` is an empty layer.
    Ref(Option<Box<Value>>),
    /// Opaque host object.
    Object(Arc<dyn ScriptObject>),
}

impl Value {
    /// Wrap a value in one optional layer.
    pub fn boxed(value: Value) -> Self {
        Value::Ref(Some(Box::new(value)))
    }

    /// An empty optional layer.
    pub fn nil_ref() -> Self {
        Value::Ref(None)
    }

    /// Whether the value dereferences to nothing.
    pub fn is_nil(&self) -> bool {
        dereference(self).is_none()
    }

    /// Kind name of the value itself, without dereferencing.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "invalid",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float64",
            Value::Str(_) => "string",
            Value::Duration(_) => "duration",
            Value::Timestamp(_) => "time",
            Value::List(_) => "slice",
            Value::Map(_) | Value::SMap(_) => "map",
            Value::Ref(_) => "ptr",
            Value::Object(_) => "struct",
        }
    }

    /// Check if the value is truthy.
    pub fn is_truthy(&self) -> bool {
        match dereference(self) {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Int(n)) => *n != 0,
            Some(Value::Float(f)) => *f != 0.0,
            Some(Value::Str(s)) => !s.is_empty(),
            Some(Value::Duration(d)) => !d.is_zero(),
            Some(Value::List(l)) => !l.is_empty(),
            Some(Value::Map(m)) => !m.is_empty(),
            Some(Value::SMap(m)) => !m.is_empty(),
            Some(_) => true,
        }
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match dereference(self) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Borrow the boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match dereference(self) {
            Some(Value::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

/// Walk through optional layers down to a concrete value.
///
/// Returns `None` if any layer is empty (or the value is `Null`). Objects are
/// returned as they are.
pub fn dereference(value: &Value) -> Option<&Value> {
    let mut current = value;
    loop {
        match current {
            Value::Null | Value::Ref(None) => return None,
            Value::Ref(Some(inner)) => current = inner,
            other => return Some(other),
        }
    }
}

/// Kind name of a value, optionally after dereferencing it.
///
/// With `indirect`, a value that dereferences to nothing is `"invalid"`.
pub fn kind_of(value: &Value, indirect: bool) -> &'static str {
    if !indirect {
        return value.kind();
    }
    match dereference(value) {
        Some(inner) => inner.kind(),
        None => "invalid",
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::SMap(a), Value::SMap(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// `2006-01-02 15:04:05.5 +0000 UTC`, with trailing zeros of the fraction dropped.
fn format_timestamp(t: &Timestamp) -> String {
    let mut out = t.format("%Y-%m-%d %H:%M:%S").to_string();
    let frac = format!("{:09}", t.timestamp_subsec_nanos() % 1_000_000_000);
    let frac = frac.trim_end_matches('0');
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out.push_str(" +0000 UTC");
    out
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null | Value::Ref(None) => write!(f, "<nil>"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => f.write_str(&coerce::format_float(*x)),
            Value::Str(s) => f.write_str(s),
            Value::Duration(d) => f.write_str(&format_duration(*d)),
            Value::Timestamp(t) => f.write_str(&format_timestamp(t)),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("map[")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("]")
            }
            Value::SMap(map) => {
                f.write_str("map[")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{k}:{v}")?;
                }
                f.write_str("]")
            }
            Value::Ref(Some(inner)) => write!(f, "{inner}"),
            Value::Object(obj) => f.write_str(&obj.display()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Null | Value::Ref(None) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Duration(d) => serializer.serialize_i64(coerce::duration_nanos(*d)),
            Value::Timestamp(t) => serializer.serialize_str(&t.to_rfc3339()),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items.iter() {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(&k.to_string(), v)?;
                }
                out.end()
            }
            Value::SMap(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map.iter() {
                    out.serialize_entry(k, v)?;
                }
                out.end()
            }
            Value::Ref(Some(inner)) => inner.serialize(serializer),
            Value::Object(obj) => serializer.serialize_str(&obj.display()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self {
        Value::Duration(d)
    }
}

impl From<Timestamp> for Value {
    fn from(t: Timestamp) -> Self {
        Value::Timestamp(t)
    }
}

impl From<Slice> for Value {
    fn from(s: Slice) -> Self {
        Value::List(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(Slice::from(items))
    }
}

impl From<Dict> for Value {
    fn from(d: Dict) -> Self {
        Value::Map(d)
    }
}

impl From<SDict> for Value {
    fn from(d: SDict) -> Self {
        Value::SMap(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Value::boxed(v.into()),
            None => Value::Ref(None),
        }
    }
}
