//! Per-execution call, API and sleep budgets.
//!
//! Every budget-sensitive builtin consults the governor before acting. The
//! counters only ever grow; a fresh governor is created for each execution
//! and dropped with it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::LimitsConfig;
use crate::{Result, RuntimeError};

/// Ledger key of the shared API budget.
pub const GENERIC_API_KEY: &str = "api_call";

/// Blocking wait used by [`QuotaGovernor::try_sleep`].
pub type Sleeper = Box<dyn Fn(Duration) + Send + Sync>;

/// Budget ledger for one execution.
pub struct QuotaGovernor {
    counters: HashMap<String, u32>,
    premium: bool,
    generic_api_max: u32,
    max_sleep_secs: u64,
    slept_secs: u64,
    sleeper: Sleeper,
}

impl QuotaGovernor {
    /// Create a governor with the given limits.
    ///
    /// `premium` selects the higher ceiling of tiered quotas.
    pub fn new(limits: &LimitsConfig, premium: bool) -> Self {
        Self {
            counters: HashMap::new(),
            premium,
            generic_api_max: limits.generic_api_calls,
            max_sleep_secs: limits.max_sleep_secs,
            slept_secs: 0,
            sleeper: Box::new(std::thread::sleep),
        }
    }

    /// Replace the blocking primitive.
    pub fn with_sleeper(mut self, sleeper: Sleeper) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Whether the tenant has the premium tier.
    pub fn is_premium(&self) -> bool {
        self.premium
    }

    /// Count one call under `key`.
    ///
    /// Returns `true` once the count after incrementing exceeds `max`.
    pub fn check_and_increment(&mut self, key: &str, max: u32) -> bool {
        let count = self.counters.entry(key.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        let exceeded = *count > max;
        if exceeded {
            warn!(key, count = *count, max, "call quota exceeded");
        }
        exceeded
    }

    /// Like [`check_and_increment`](Self::check_and_increment), with the
    /// ceiling chosen by tenant tier.
    pub fn check_and_increment_tiered(&mut self, key: &str, free_max: u32, premium_max: u32) -> bool {
        let max = if self.premium { premium_max } else { free_max };
        self.check_and_increment(key, max)
    }

    /// Count one call against the shared API budget.
    pub fn check_generic_api_budget(&mut self) -> bool {
        let max = self.generic_api_max;
        self.check_and_increment(GENERIC_API_KEY, max)
    }

    /// Block for `seconds` if the sleep budget allows it.
    ///
    /// Returns `true` (without sleeping or charging the budget) when
    /// `seconds < 1` or the combined total would exceed the cap.
    pub fn try_sleep(&mut self, seconds: i64) -> bool {
        if seconds < 1 {
            return true;
        }
        let seconds = seconds as u64;
        if self.slept_secs.saturating_add(seconds) > self.max_sleep_secs {
            warn!(
                requested = seconds,
                slept = self.slept_secs,
                max = self.max_sleep_secs,
                "sleep budget exceeded"
            );
            return true;
        }

        self.slept_secs += seconds;
        debug!(seconds, total = self.slept_secs, "sleeping");
        (self.sleeper)(Duration::from_secs(seconds));
        false
    }

    /// Total seconds slept so far.
    pub fn slept_secs(&self) -> u64 {
        self.slept_secs
    }

    /// Current count for a key.
    pub fn count(&self, key: &str) -> u32 {
        self.counters.get(key).copied().unwrap_or(0)
    }

    /// Snapshot of every counter, ordered by key.
    pub fn counters(&self) -> BTreeMap<String, u32> {
        self.counters
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// [`check_and_increment`](Self::check_and_increment) as a `Result`.
    pub fn ensure(&mut self, key: &str, max: u32) -> Result<()> {
        if self.check_and_increment(key, max) {
            return Err(RuntimeError::too_many_calls());
        }
        Ok(())
    }

    /// [`check_and_increment_tiered`](Self::check_and_increment_tiered) as a `Result`.
    pub fn ensure_tiered(&mut self, key: &str, free_max: u32, premium_max: u32) -> Result<()> {
        if self.check_and_increment_tiered(key, free_max, premium_max) {
            return Err(RuntimeError::too_many_calls());
        }
        Ok(())
    }

    /// [`check_generic_api_budget`](Self::check_generic_api_budget) as a `Result`.
    pub fn ensure_generic_api(&mut self) -> Result<()> {
        if self.check_generic_api_budget() {
            return Err(RuntimeError::too_many_api_calls());
        }
        Ok(())
    }

    /// [`try_sleep`](Self::try_sleep) as a `Result`.
    pub fn ensure_sleep(&mut self, seconds: i64) -> Result<()> {
        if self.try_sleep(seconds) {
            return Err(RuntimeError::Quota(format!(
                "can sleep for max {} seconds combined",
                self.max_sleep_secs
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for QuotaGovernor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotaGovernor")
            .field("counters", &self.counters)
            .field("premium", &self.premium)
            .field("generic_api_max", &self.generic_api_max)
            .field("slept_secs", &self.slept_secs)
            .field("max_sleep_secs", &self.max_sleep_secs)
            .finish_non_exhaustive()
    }
}
