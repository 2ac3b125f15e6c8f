//! Configuration module for CCRT.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, RuntimeError};

/// Per-execution resource limits.
///
/// Every execution context copies these at construction; nothing reads the
/// config again while a script runs.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of distinct compiled patterns per execution.
    #[serde(default = "default_regex_cache_capacity")]
    pub regex_cache_capacity: usize,
    /// Maximum combined seconds a script may sleep.
    #[serde(default = "default_max_sleep_secs")]
    pub max_sleep_secs: u64,
    /// Maximum number of nested template invocations per execution.
    #[serde(default = "default_max_nested_calls")]
    pub max_nested_calls: u32,
    /// Shared ceiling for builtins that may touch the platform API.
    #[serde(default = "default_generic_api_calls")]
    pub generic_api_calls: u32,
    /// Deepest map nesting accepted for nested template arguments.
    #[serde(default = "default_max_recursion_depth")]
    pub max_recursion_depth: usize,
    /// Upper bound for the response auto-delete delay.
    #[serde(default = "default_max_delete_delay_secs")]
    pub max_delete_delay_secs: u64,
}

fn default_regex_cache_capacity() -> usize {
    crate::regex_cache::DEFAULT_CAPACITY
}

fn default_max_sleep_secs() -> u64 {
    60
}

fn default_max_nested_calls() -> u32 {
    3
}

fn default_generic_api_calls() -> u32 {
    100
}

fn default_max_recursion_depth() -> usize {
    crate::safety::DEFAULT_MAX_DEPTH
}

fn default_max_delete_delay_secs() -> u64 {
    86400
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            regex_cache_capacity: default_regex_cache_capacity(),
            max_sleep_secs: default_max_sleep_secs(),
            max_nested_calls: default_max_nested_calls(),
            generic_api_calls: default_generic_api_calls(),
            max_recursion_depth: default_max_recursion_depth(),
            max_delete_delay_secs: default_max_delete_delay_secs(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file. Empty means console only.
    #[serde(default)]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: String::new(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(RuntimeError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| RuntimeError::Config(format!("parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CCRT_LOG_LEVEL`: Override the log level
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("CCRT_LOG_LEVEL") {
            if !level.is_empty() {
                self.logging.level = level;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Every limit must be non-zero; a zero limit would make the matching
    /// builtin unusable.
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        let checks: [(&str, bool); 6] = [
            ("regex_cache_capacity", limits.regex_cache_capacity == 0),
            ("max_sleep_secs", limits.max_sleep_secs == 0),
            ("max_nested_calls", limits.max_nested_calls == 0),
            ("generic_api_calls", limits.generic_api_calls == 0),
            ("max_recursion_depth", limits.max_recursion_depth == 0),
            ("max_delete_delay_secs", limits.max_delete_delay_secs == 0),
        ];
        if let Some((name, _)) = checks.iter().find(|(_, zero)| *zero) {
            return Err(RuntimeError::Config(format!(
                "limits.{name} must be greater than zero"
            )));
        }
        Ok(())
    }
}
