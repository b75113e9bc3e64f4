//! agentpty-core - Agent CLI integration
//!
//! Builds on `agentpty-term` to drive a terminal coding agent:
//! - agent: launch command model and startup heuristics
//! - preflight: login and version check, remembered per process
//! - runner: one-shot process execution
//! - prompt: structured result extraction from `--print` output
//! - client: the non-interactive [`AgentClient`] used by the HTTP API
//! - session: the interactive [`AgentSession`] facade

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod client;
pub mod error;
pub mod preflight;
pub mod prompt;
pub mod runner;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::{AgentCommand, AgentSessionOptions, Resume, COMPATIBLE_VERSION, DEFAULT_PROGRAM};
pub use client::{AgentClient, CliAgent, PromptOptions};
pub use error::{Error, Result};
pub use preflight::PreflightGate;
pub use prompt::extract_reply;
pub use runner::{ProcessRunner, RunOutput, RunRequest, TokioRunner};
pub use session::AgentSession;
