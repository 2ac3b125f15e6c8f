//! Error types for CCRT.

use thiserror::Error;

/// Common error type for script execution.
///
/// Scalar coercions never produce one of these; everything else that can go
/// wrong while a builtin runs does.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// A per-execution budget was exhausted.
    ///
    /// The message is shown to the script author verbatim.
    #[error("{0}")]
    Quota(String),

    /// Structural mistake in the arguments a script passed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Arguments passed to a nested invocation embed the execution data.
    #[error("unsafe template arguments: {0}")]
    UnsafeArgs(String),

    /// Nested invocation attempted from an already nested frame.
    #[error("cannot nest further: {0}")]
    NestingLimit(String),

    /// Named resource (template, channel, role, member) not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Pattern failed to compile.
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Error reported by an external collaborator (delivery, state, scheduler).
    #[error("{0}")]
    Collaborator(String),

    /// Error produced by the macro engine while rendering a body.
    #[error("template error: {0}")]
    Template(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    /// Generic "too many calls" quota error.
    pub fn too_many_calls() -> Self {
        RuntimeError::Quota("too many calls to this function".to_string())
    }

    /// Shared API budget exhausted.
    pub fn too_many_api_calls() -> Self {
        RuntimeError::Quota("too many potential api calls in this execution".to_string())
    }

    /// Whether this error came from a budget check.
    pub fn is_quota(&self) -> bool {
        matches!(self, RuntimeError::Quota(_))
    }
}

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
