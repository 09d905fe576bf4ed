//! Error types shared across the library

use thiserror::Error;

/// Errors raised by the timer authority and its side effects.
///
/// None of these are fatal to the daemon: persistence and rule failures are
/// logged and the countdown keeps running.
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rule quota exceeded: {requested} rules requested, limit is {limit}")]
    RuleQuota { requested: usize, limit: usize },
    #[error("invalid duration: {0}")]
    InvalidDuration(String),
    #[error("notification failed: {0}")]
    Notification(String),
    #[error("failed to lock {0}")]
    LockPoisoned(&'static str),
    /// A store switched into failure mode, see `MemoryStore::set_failing`
    #[error("{0} unavailable")]
    Unavailable(&'static str),
}

pub type Result<T> = std::result::Result<T, GuardError>;
