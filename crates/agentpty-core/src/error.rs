//! Error types for agentpty-core

use thiserror::Error;

/// Agent integration error type
#[derive(Debug, Error)]
pub enum Error {
    /// Terminal layer failure (spawn, wait timeout, I/O)
    #[error(transparent)]
    Term(#[from] agentpty_term::Error),

    /// The agent CLI reports no logged-in account
    #[error("Not logged in to {program}. Please run `{program} login` first.")]
    NotLoggedIn {
        /// Agent executable
        program: String,
    },

    /// Login or version preflight failed
    #[error("{program} setup error: {source}")]
    Setup {
        /// Agent executable
        program: String,
        /// What went wrong
        #[source]
        source: Box<Error>,
    },

    /// A one-shot invocation exited unsuccessfully
    #[error("{program} exited with code {}: {output}", exit_label(.code))]
    CommandFailed {
        /// Agent executable
        program: String,
        /// Exit code; `None` when killed by a signal
        code: Option<i32>,
        /// stderr, or stdout when stderr was empty
        output: String,
    },

    /// No structured result could be extracted from the agent output
    #[error("no structured result in agent output: {0}")]
    ProtocolMismatch(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_string(), |c| c.to_string())
}

impl Error {
    /// Returns `true` when the underlying failure is a wait timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Term(e) => e.is_timeout(),
            Self::Setup { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
