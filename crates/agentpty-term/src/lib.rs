//! agentpty-term - Terminal session automation
//!
//! This crate drives interactive programs through a pseudo-terminal:
//! - ansi: ANSI escape filtering
//! - output: raw and plain output accumulation
//! - monitor: event stream and wait primitives (pattern, any-of, inactivity)
//! - pty: spawner abstraction and the `pty-process` backend
//! - session: keystrokes, startup bootstrap and send-and-wait-for-reply
//! - registry: process-wide set of live sessions for shutdown cleanup

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod ansi;
pub mod error;
pub mod monitor;
pub mod output;
pub mod pty;
pub mod registry;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use ansi::strip_ansi_escapes;
pub use error::{Error, Result};
pub use monitor::{DataSubscription, OutputMonitor, Pattern, SessionEvent};
pub use output::OutputAccumulator;
pub use pty::{NativePtySpawner, PtyEvent, PtyHandle, PtySpawner, SpawnRequest, SpawnedPty};
pub use registry::SessionRegistry;
pub use session::{
    ListSelection, ReplyOptions, SessionState, StartupScript, TerminalSession,
    DEFAULT_REPLY_INACTIVITY, DEFAULT_REPLY_TIMEOUT,
};
