//! Per-execution cache of compiled regular expressions.
//!
//! A script may use at most a fixed number of distinct patterns; repeated
//! use of the same pattern is free. The helpers at the bottom implement the
//! `re*` builtins on top of a compiled pattern.

use std::collections::HashMap;

use regex::Regex;
use tracing::{trace, warn};

use crate::value::Value;
use crate::{Result, RuntimeError};

/// Default number of distinct patterns per execution.
pub const DEFAULT_CAPACITY: usize = 20;

/// Maximum matches returned by `reFindAll`.
pub const MAX_FIND_ALL: usize = 1000;

/// Maximum matches returned by `reFindAllSubmatches`.
pub const MAX_FIND_ALL_SUBMATCHES: usize = 100;

/// Maximum pieces returned by `reSplit`.
pub const MAX_SPLIT: usize = 500;

/// Bounded map from pattern source to compiled pattern.
#[derive(Debug)]
pub struct RegexCache {
    capacity: usize,
    patterns: HashMap<String, Regex>,
}

impl RegexCache {
    /// Create an empty cache holding at most `capacity` patterns.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            patterns: HashMap::new(),
        }
    }

    /// Return the compiled pattern, compiling and caching it on a miss.
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::Quota`] if the cache is full; checked before compiling
    /// - [`RuntimeError::Regex`] if the pattern is invalid; nothing is cached
    pub fn compile(&mut self, pattern: &str) -> Result<Regex> {
        if let Some(re) = self.patterns.get(pattern) {
            return Ok(re.clone());
        }

        if self.patterns.len() >= self.capacity {
            warn!(capacity = self.capacity, "regex cache full");
            return Err(RuntimeError::Quota(
                "too many unique regular expressions (regex cache full)".to_string(),
            ));
        }

        trace!(pattern, "regex cache miss");
        let re = Regex::new(pattern)?;
        self.patterns.insert(pattern.to_string(), re.clone());
        Ok(re)
    }

    /// Number of cached patterns.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether nothing has been compiled yet.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Clamp a script-supplied count: negative or too large means `max`.
fn clamp_count(n: Option<i64>, max: usize) -> usize {
    match n {
        Some(n) if n >= 0 => (n as usize).min(max),
        _ => max,
    }
}

/// Leftmost match, or `""`.
pub fn find(re: &Regex, text: &str) -> String {
    re.find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// All matches, at most `n` (capped at [`MAX_FIND_ALL`]).
pub fn find_all(re: &Regex, text: &str, n: Option<i64>) -> Vec<Value> {
    re.find_iter(text)
        .take(clamp_count(n, MAX_FIND_ALL))
        .map(|m| Value::from(m.as_str()))
        .collect()
}

/// Capture groups of every match, at most `n` (capped at
/// [`MAX_FIND_ALL_SUBMATCHES`]). Unmatched groups are `""`.
pub fn find_all_submatches(re: &Regex, text: &str, n: Option<i64>) -> Vec<Value> {
    re.captures_iter(text)
        .take(clamp_count(n, MAX_FIND_ALL_SUBMATCHES))
        .map(|caps| Value::from(captures_to_values(&caps)))
        .collect()
}

fn captures_to_values(caps: &regex::Captures<'_>) -> Vec<Value> {
    caps.iter()
        .map(|m| Value::from(m.map(|m| m.as_str()).unwrap_or_default()))
        .collect()
}

/// Replace every match; `$1`/`${name}` in the replacement expand.
pub fn replace(re: &Regex, text: &str, replacement: &str) -> String {
    re.replace_all(text, replacement).into_owned()
}

/// Split around matches, at most `n` pieces (capped at [`MAX_SPLIT`]).
pub fn split(re: &Regex, text: &str, n: Option<i64>) -> Vec<Value> {
    let limit = clamp_count(n, MAX_SPLIT);
    if limit == 0 {
        return Vec::new();
    }
    re.splitn(text, limit).map(Value::from).collect()
}
