use thiserror::Error;

/// Error taxonomy for the core. Violations are never represented here —
/// a `Violation` is the normal product of a successful `validate` call, not
/// a failure. Only the handful of cases spec'd as host-facing errors live
/// in this enum.
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Strict-mode grammar failure. Lenient mode never raises this; it
    /// demotes the failure to a LOW violation and keeps going.
    #[error("SQL parse error: {0}")]
    ParseFailure(String),

    /// Invalid option in a `CoreConfig` (unknown pattern, non-numeric
    /// threshold, ...). Raised eagerly during construction, never from
    /// `validate`.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The host called `validate` with empty or whitespace-only SQL.
    #[error("SQL text must not be empty")]
    EmptySql,

    /// A checker's hook panicked or returned an internal error. Never
    /// escapes `validate` — the orchestrator catches this at the checker
    /// boundary and records a synthetic LOW violation instead.
    #[error("checker '{checker_id}' failed internally: {message}")]
    CheckerInternal { checker_id: String, message: String },
}

pub type Result<T> = std::result::Result<T, CoreError>;
