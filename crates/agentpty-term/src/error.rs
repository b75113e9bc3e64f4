//! Error types for agentpty-term

use thiserror::Error;

/// Terminal session error type
#[derive(Debug, Error)]
pub enum Error {
    /// The PTY or the child process could not be started
    #[error("spawn failed: {0}")]
    SpawnFailure(String),

    /// A wait primitive reached its deadline before its condition held
    #[error("{operation} timed out after {after_ms}ms")]
    Timeout {
        /// Which wait timed out (`wait_for`, `wait_for_any`, `wait_for_inactivity`)
        operation: &'static str,
        /// The configured timeout in milliseconds
        after_ms: u64,
    },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` for [`Error::Timeout`].
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
