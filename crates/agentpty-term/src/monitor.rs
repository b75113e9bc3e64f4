//! Output monitor: accumulated output, the session event stream and the
//! wait primitives built on both.
//!
//! Every wait reacts to `SessionEvent`s and also re-checks on a timer, so a
//! lagged or missed notification only delays a match by one poll period.

use crate::error::{Error, Result};
use crate::output::OutputAccumulator;
use regex::Regex;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{Instant, MissedTickBehavior};

/// Capacity of the per-session event channel.
const EVENT_CAPACITY: usize = 1024;

/// Fallback re-check period for pattern waits.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Upper bound on the inactivity check cadence.
pub const MAX_INACTIVITY_CADENCE: Duration = Duration::from_millis(250);

/// Events published by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A raw chunk arrived from the PTY (already appended to the buffers).
    Output(String),
    /// The child process exited on its own.
    Exited {
        /// Exit code, when the platform reports one
        code: Option<i32>,
    },
}

/// Something to look for in the plain output.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Substring match
    Literal(String),
    /// Regular expression match
    Regex(Regex),
}

impl Pattern {
    /// Whether the pattern occurs anywhere in `haystack`.
    #[must_use]
    pub fn is_match(&self, haystack: &str) -> bool {
        match self {
            Self::Literal(needle) => haystack.contains(needle.as_str()),
            Self::Regex(re) => re.is_match(haystack),
        }
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Self::Regex(re)
    }
}

/// Shared output state of one session.
///
/// Cloning is cheap; clones observe the same buffers and event stream.
#[derive(Clone)]
pub struct OutputMonitor {
    output: Arc<Mutex<OutputAccumulator>>,
    events: broadcast::Sender<SessionEvent>,
}

impl Default for OutputMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputMonitor {
    /// Create a monitor with empty buffers.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            output: Arc::new(Mutex::new(OutputAccumulator::new())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, OutputAccumulator> {
        self.output.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append a raw chunk and notify subscribers.
    ///
    /// The buffers are updated before the notification goes out, so a
    /// listener woken by it always sees the new data.
    pub fn append(&self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.lock().append_raw(chunk);
        // No receivers is fine.
        let _ = self.events.send(SessionEvent::Output(chunk.to_string()));
    }

    /// Announce that the child process exited.
    pub fn publish_exit(&self, code: Option<i32>) {
        let _ = self.events.send(SessionEvent::Exited { code });
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Subscribe to future raw chunks only.
    #[must_use]
    pub fn data(&self) -> DataSubscription {
        DataSubscription {
            events: self.subscribe(),
        }
    }

    /// Full raw output.
    #[must_use]
    pub fn raw_buffer(&self) -> String {
        self.lock().raw_buffer().to_string()
    }

    /// Full ANSI-free output.
    #[must_use]
    pub fn plain_buffer(&self) -> String {
        self.lock().plain_buffer().to_string()
    }

    /// Length of the plain output in bytes; use as an offset for [`Self::plain_slice`].
    #[must_use]
    pub fn plain_len(&self) -> usize {
        self.lock().plain_len()
    }

    /// Plain output produced after `from`.
    #[must_use]
    pub fn plain_slice(&self, from: usize) -> String {
        self.lock().plain_slice(from).to_string()
    }

    /// Run `f` against the plain buffer without copying it.
    pub fn with_plain<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(self.lock().plain_buffer())
    }

    /// Wait until `pattern` occurs in the plain output.
    pub async fn wait_for(&self, pattern: impl Into<Pattern>, timeout: Duration) -> Result<()> {
        let pattern = pattern.into();
        self.wait_until("wait_for", timeout, |plain| {
            pattern.is_match(plain).then_some(())
        })
        .await
    }

    /// Wait until any of `patterns` occurs; returns the lowest matching index.
    ///
    /// An empty slice never matches and ends in a timeout.
    pub async fn wait_for_any(&self, patterns: &[Pattern], timeout: Duration) -> Result<usize> {
        self.wait_until("wait_for_any", timeout, |plain| {
            patterns.iter().position(|p| p.is_match(plain))
        })
        .await
    }

    /// Shared loop behind the pattern waits.
    ///
    /// The subscription is taken before the first check so nothing appended
    /// between the check and the first `recv` goes unnoticed.
    async fn wait_until<T>(
        &self,
        operation: &'static str,
        timeout: Duration,
        mut check: impl FnMut(&str) -> Option<T>,
    ) -> Result<T> {
        let mut events = self.subscribe();
        if let Some(found) = self.with_plain(&mut check) {
            return Ok(found);
        }

        let start = Instant::now();
        let deadline = start.checked_add(timeout);
        let mut poll = tokio::time::interval_at(start + POLL_INTERVAL, POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut listening = true;

        loop {
            tokio::select! {
                event = events.recv(), if listening => {
                    if let Err(RecvError::Closed) = event {
                        listening = false;
                    }
                }
                _ = poll.tick() => {}
                () = sleep_until(deadline) => {
                    return self
                        .with_plain(&mut check)
                        .ok_or_else(|| timeout_error(operation, timeout));
                }
            }

            if let Some(found) = self.with_plain(&mut check) {
                return Ok(found);
            }
        }
    }

    /// Wait until no output has arrived for `quiet`.
    ///
    /// The quiet period is measured from the call if nothing arrives. The
    /// absolute `timeout` still applies to a source that never goes quiet.
    pub async fn wait_for_inactivity(&self, quiet: Duration, timeout: Duration) -> Result<()> {
        if quiet.is_zero() {
            return Ok(());
        }
        let mut events = self.subscribe();

        let start = Instant::now();
        let deadline = start.checked_add(timeout);
        let cadence = quiet
            .min(MAX_INACTIVITY_CADENCE)
            .max(Duration::from_millis(1));
        let mut ticks = tokio::time::interval_at(start + cadence, cadence);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_data = start;
        let mut listening = true;

        loop {
            // Output that is already queued must reset the quiet period
            // before a due tick gets to look at it.
            tokio::select! {
                biased;
                event = events.recv(), if listening => match event {
                    Ok(SessionEvent::Output(_)) | Err(RecvError::Lagged(_)) => {
                        last_data = Instant::now();
                    }
                    Ok(SessionEvent::Exited { .. }) => {}
                    Err(RecvError::Closed) => listening = false,
                },
                _ = ticks.tick() => {
                    if last_data.elapsed() >= quiet {
                        return Ok(());
                    }
                }
                () = sleep_until(deadline) => {
                    return Err(timeout_error("wait_for_inactivity", timeout));
                }
            }
        }
    }
}

/// Raw chunks as they arrive. Dropping it unsubscribes.
pub struct DataSubscription {
    events: broadcast::Receiver<SessionEvent>,
}

impl DataSubscription {
    /// Next raw chunk, or `None` once the session is gone.
    ///
    /// Chunks missed because the subscriber fell behind are skipped.
    pub async fn recv(&mut self) -> Option<String> {
        loop {
            match self.events.recv().await {
                Ok(SessionEvent::Output(chunk)) => return Some(chunk),
                Ok(SessionEvent::Exited { .. }) => return None,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Data subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

fn sleep_until(deadline: Option<Instant>) -> impl Future<Output = ()> {
    async move {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

fn timeout_error(operation: &'static str, timeout: Duration) -> Error {
    Error::Timeout {
        operation,
        after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}
