//! Name-keyed table of builtin functions.
//!
//! The macro engine looks builtins up by name and calls them with the
//! current [`ExecutionContext`] and the already-evaluated arguments. Each
//! builtin consults the quota governor itself before doing anything with a
//! cost.
//!
//! # Example
//!
//! ```ignore
//! let table = BuiltinTable::standard();
//! let out = table.call(&mut ctx, "toInt", &[Value::from("42")])?;
//! assert_eq!(out, Value::Int(42));
//! ```

mod effects;
mod general;
mod patterns;

use std::collections::HashMap;

use tracing::trace;

use crate::context::ExecutionContext;
use crate::value::{self, Value};
use crate::{Result, RuntimeError};

/// Signature shared by every builtin.
pub type BuiltinFn = fn(&mut ExecutionContext, &[Value]) -> Result<Value>;

/// Builtins by name.
#[derive(Clone, Default)]
pub struct BuiltinTable {
    funcs: HashMap<&'static str, BuiltinFn>,
}

impl BuiltinTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table holding every builtin this crate provides.
    pub fn standard() -> Self {
        let mut table = Self::new();
        general::register(&mut table);
        patterns::register(&mut table);
        effects::register(&mut table);
        table
    }

    /// Add or replace a builtin.
    pub fn register(&mut self, name: &'static str, func: BuiltinFn) {
        self.funcs.insert(name, func);
    }

    pub fn get(&self, name: &str) -> Option<BuiltinFn> {
        self.funcs.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.funcs.contains_key(name)
    }

    /// Call a builtin by name.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::NotFound`] for unknown names, otherwise
    /// whatever the builtin returns.
    pub fn call(&self, ctx: &mut ExecutionContext, name: &str, args: &[Value]) -> Result<Value> {
        let func = self
            .get(name)
            .ok_or_else(|| RuntimeError::NotFound(format!("function {name:?}")))?;
        trace!(name, args = args.len(), "calling builtin");
        func(ctx, args)
    }

    /// Registered names in alphabetical order.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.funcs.keys().copied().collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.funcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.funcs.is_empty()
    }
}

impl std::fmt::Debug for BuiltinTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinTable")
            .field("names", &self.names())
            .finish()
    }
}

static NULL: Value = Value::Null;

/// Argument `i`, or nil if it was not passed.
fn arg(args: &[Value], i: usize) -> &Value {
    args.get(i).unwrap_or(&NULL)
}

/// Argument `i` if it was passed and is not nil.
fn opt_arg(args: &[Value], i: usize) -> Option<&Value> {
    args.get(i).filter(|v| !v.is_nil())
}

fn require_args(name: &str, args: &[Value], min: usize) -> Result<()> {
    if args.len() < min {
        return Err(RuntimeError::Validation(format!(
            "{name}: expected at least {min} arguments, got {}",
            args.len()
        )));
    }
    Ok(())
}

/// Read a platform id (user, role, message) from a number or numeric string.
fn id_arg(name: &str, value: &Value) -> Result<u64> {
    u64::try_from(value::to_int(value))
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| RuntimeError::Validation(format!("{name}: invalid id {value}")))
}
