//! In-memory PTY for tests
//!
//! `ScriptedPty` stands in for a real terminal: tests push output into it,
//! inspect what the session wrote, and can script replies that fire when
//! a given input arrives.

use crate::error::{Error, Result};
use crate::pty::{PtyEvent, PtyHandle, PtySpawner, SpawnRequest, SpawnedPty};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

/// A scripted stand-in for a spawned terminal process.
///
/// Acts as both the spawner and the handle. Clones share state.
#[derive(Clone)]
pub struct ScriptedPty {
    events: mpsc::UnboundedSender<PtyEvent>,
    receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<PtyEvent>>>>,
    state: Arc<Mutex<ScriptState>>,
}

#[derive(Default)]
struct ScriptState {
    writes: Vec<String>,
    input: String,
    kills: usize,
    exited: bool,
    replies: Vec<ScriptedReply>,
    request: Option<SpawnRequest>,
}

struct ScriptedReply {
    trigger: String,
    delay: Duration,
    chunks: Vec<String>,
    fired: bool,
}

impl Default for ScriptedPty {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedPty {
    /// Create a terminal with no output.
    #[must_use]
    pub fn new() -> Self {
        let (events, receiver) = mpsc::unbounded_channel();
        Self {
            events,
            receiver: Arc::new(Mutex::new(Some(receiver))),
            state: Arc::new(Mutex::new(ScriptState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// This terminal as a handle.
    #[must_use]
    pub fn handle(&self) -> Arc<dyn PtyHandle> {
        Arc::new(self.clone())
    }

    /// Emit output as if the process printed it.
    pub fn emit(&self, chunk: impl Into<String>) {
        let _ = self.events.send(PtyEvent::Data(chunk.into()));
    }

    /// Make the process exit on its own.
    pub fn exit(&self, code: Option<i32>) {
        let mut state = self.lock();
        if !state.exited {
            state.exited = true;
            let _ = self.events.send(PtyEvent::Exit(code));
        }
    }

    /// Once the accumulated input contains `trigger`, emit `chunks` after `delay`.
    ///
    /// Each reply fires at most once.
    pub fn respond_to<I, S>(&self, trigger: impl Into<String>, delay: Duration, chunks: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock().replies.push(ScriptedReply {
            trigger: trigger.into(),
            delay,
            chunks: chunks.into_iter().map(Into::into).collect(),
            fired: false,
        });
    }

    /// Every write, in order.
    #[must_use]
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    /// All input concatenated.
    #[must_use]
    pub fn written(&self) -> String {
        self.lock().input.clone()
    }

    /// How many times `kill` was called.
    #[must_use]
    pub fn kill_count(&self) -> usize {
        self.lock().kills
    }

    /// The request this terminal was spawned with.
    #[must_use]
    pub fn spawned_request(&self) -> Option<SpawnRequest> {
        self.lock().request.clone()
    }

    fn deliver(&self, delay: Duration, chunks: Vec<String>) {
        let events = self.events.clone();
        let send_all = move || {
            for chunk in chunks {
                let _ = events.send(PtyEvent::Data(chunk));
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    send_all();
                });
            }
            Err(_) => send_all(),
        }
    }
}

impl PtyHandle for ScriptedPty {
    fn write(&self, data: &str) -> io::Result<()> {
        let due: Vec<(Duration, Vec<String>)> = {
            let mut state = self.lock();
            if state.exited {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "process exited"));
            }
            state.writes.push(data.to_string());
            state.input.push_str(data);

            let ScriptState { input, replies, .. } = &mut *state;
            replies
                .iter_mut()
                .filter(|reply| !reply.fired && input.contains(&reply.trigger))
                .map(|reply| {
                    reply.fired = true;
                    (reply.delay, reply.chunks.clone())
                })
                .collect()
        };

        for (delay, chunks) in due {
            self.deliver(delay, chunks);
        }
        Ok(())
    }

    fn kill(&self) -> io::Result<()> {
        let mut state = self.lock();
        state.kills += 1;
        if !state.exited {
            state.exited = true;
            let _ = self.events.send(PtyEvent::Exit(None));
        }
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        None
    }
}

impl PtySpawner for ScriptedPty {
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedPty> {
        let events = self
            .receiver
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(|| Error::SpawnFailure("scripted terminal already spawned".to_string()))?;
        self.lock().request = Some(request.clone());
        Ok(SpawnedPty {
            handle: self.handle(),
            events,
        })
    }
}

/// A spawner whose every spawn fails.
#[derive(Debug, Clone)]
pub struct FailingSpawner {
    message: String,
}

impl FailingSpawner {
    /// Fail with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl PtySpawner for FailingSpawner {
    fn spawn(&self, _request: &SpawnRequest) -> Result<SpawnedPty> {
        Err(Error::SpawnFailure(self.message.clone()))
    }
}
