//! Terminal session
//!
//! A `TerminalSession` owns one PTY process. A background pump feeds the
//! process output into an [`OutputMonitor`]; the session adds keystroke
//! helpers, startup bootstrapping and the send-and-wait-for-reply exchange
//! on top of it.
//!
//! Lifecycle: `Starting → (Selecting) → Ready → Closed`. Once closed, every
//! keystroke call is a silent no-op.

use crate::error::Result;
use crate::monitor::{DataSubscription, OutputMonitor, Pattern, SessionEvent};
use crate::pty::{PtyEvent, PtyHandle, PtySpawner, SpawnRequest};
use crate::registry::SessionRegistry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;


const KEY_ENTER: &str = "\r";
const KEY_ESCAPE: &str = "\x1b";
const KEY_UP: &str = "\x1b[A";
const KEY_DOWN: &str = "\x1b[B";

/// Default quiet period that ends a reply.
pub const DEFAULT_REPLY_INACTIVITY: Duration = Duration::from_millis(1500);
/// Default upper bound on waiting for a reply.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(60);

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Spawned, waiting for the startup banner
    Starting,
    /// Picking an entry from the startup list
    Selecting,
    /// Accepting input
    Ready,
    /// Disposed or exited
    Closed,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Selecting => write!(f, "selecting"),
            Self::Ready => write!(f, "ready"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Best-effort waits run right after spawning.
#[derive(Debug, Clone, Default)]
pub struct StartupScript {
    /// Any of these in the output means the program has drawn its UI.
    pub banner: Vec<Pattern>,
    /// How long to look for the banner.
    pub banner_timeout: Duration,
    /// Pick an entry from a list shown at startup.
    pub selection: Option<ListSelection>,
}

/// Choose the `index`-th entry of a startup list.
#[derive(Debug, Clone)]
pub struct ListSelection {
    /// Zero-based entry; `index` down-arrows are sent before enter.
    pub index: usize,
    /// Any of these means the selection took effect.
    pub signals: Vec<Pattern>,
    /// How long to look for the signals.
    pub timeout: Duration,
}

/// Timing for [`TerminalSession::send_message_and_wait_for_reply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyOptions {
    /// Quiet period that marks the reply as complete
    pub inactivity: Duration,
    /// Absolute limit on the wait
    pub timeout: Duration,
}

impl Default for ReplyOptions {
    fn default() -> Self {
        Self {
            inactivity: DEFAULT_REPLY_INACTIVITY,
            timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }
}

struct Shared {
    closed: AtomicBool,
    disposed: AtomicBool,
    state: Mutex<SessionState>,
}

impl Shared {
    fn set_state(&self, next: SessionState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if *state != SessionState::Closed {
            *state = next;
        }
    }

    fn mark_closed(&self) -> bool {
        self.set_state(SessionState::Closed);
        self.closed.swap(true, Ordering::SeqCst)
    }
}

/// A live PTY process plus everything it has printed.
pub struct TerminalSession {
    id: Uuid,
    handle: Arc<dyn PtyHandle>,
    monitor: OutputMonitor,
    shared: Arc<Shared>,
    registry: SessionRegistry,
}

impl TerminalSession {
    /// Spawn and register in the process-wide registry.
    pub fn spawn(spawner: &dyn PtySpawner, request: &SpawnRequest) -> Result<Self> {
        Self::spawn_with_registry(spawner, request, SessionRegistry::global().clone())
    }

    /// Spawn and register in `registry`.
    ///
    /// Must be called inside a Tokio runtime.
    pub fn spawn_with_registry(
        spawner: &dyn PtySpawner,
        request: &SpawnRequest,
        registry: SessionRegistry,
    ) -> Result<Self> {
        let spawned = spawner.spawn(request)?;
        let id = Uuid::new_v4();
        let monitor = OutputMonitor::new();
        let shared = Arc::new(Shared {
            closed: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            state: Mutex::new(SessionState::Starting),
        });

        registry.insert(id, spawned.handle.clone());
        tokio::spawn(pump(
            id,
            spawned.events,
            monitor.clone(),
            shared.clone(),
            registry.clone(),
        ));

        info!(
            session_id = %id,
            program = %request.program,
            pid = ?spawned.handle.pid(),
            "Terminal session started"
        );

        Ok(Self {
            id,
            handle: spawned.handle,
            monitor,
            shared,
            registry,
        })
    }

    /// Spawn, then run the startup script.
    pub async fn start(
        spawner: &dyn PtySpawner,
        request: &SpawnRequest,
        script: &StartupScript,
    ) -> Result<Self> {
        let session = Self::spawn(spawner, request)?;
        session.bootstrap(script).await;
        Ok(session)
    }

    /// Wait for the banner, then make the list selection if one is asked for.
    ///
    /// Every wait here is best effort: a timeout is logged and ignored.
    pub async fn bootstrap(&self, script: &StartupScript) {
        if !script.banner.is_empty() {
            if let Err(e) = self.wait_for_any(&script.banner, script.banner_timeout).await {
                debug!(session_id = %self.id, error = %e, "Startup banner not seen");
            }
        }

        if let Some(selection) = &script.selection {
            self.shared.set_state(SessionState::Selecting);
            if selection.index > 0 {
                self.down(selection.index);
            }
            self.enter();
            if !selection.signals.is_empty() {
                if let Err(e) = self.wait_for_any(&selection.signals, selection.timeout).await {
                    debug!(session_id = %self.id, error = %e, "Selection signal not seen");
                }
            }
        }

        self.shared.set_state(SessionState::Ready);
    }

    /// Session id, also the registry key.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// OS process id of the child, when known.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.handle.pid()
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Whether the session was disposed or its process exited.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// The output monitor backing this session.
    #[must_use]
    pub fn monitor(&self) -> &OutputMonitor {
        &self.monitor
    }

    /// Full raw output.
    #[must_use]
    pub fn raw_buffer(&self) -> String {
        self.monitor.raw_buffer()
    }

    /// Full ANSI-free output.
    #[must_use]
    pub fn plain_buffer(&self) -> String {
        self.monitor.plain_buffer()
    }

    /// Length of the plain output, usable as a slice offset.
    #[must_use]
    pub fn plain_len(&self) -> usize {
        self.monitor.plain_len()
    }

    /// Plain output after `from`.
    #[must_use]
    pub fn plain_slice(&self, from: usize) -> String {
        self.monitor.plain_slice(from)
    }

    /// Output and exit events from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.monitor.subscribe()
    }

    /// Raw chunks from now on.
    #[must_use]
    pub fn on_data(&self) -> DataSubscription {
        self.monitor.data()
    }

    /// Write `data` verbatim. No-op once closed.
    pub fn write(&self, data: &str) {
        if self.is_closed() {
            return;
        }
        if let Err(e) = self.handle.write(data) {
            warn!(session_id = %self.id, error = %e, "Failed to write to terminal");
        }
    }

    /// Type text without pressing enter.
    pub fn type_text(&self, text: &str) {
        self.write(text);
    }

    /// Press enter.
    pub fn enter(&self) {
        self.write(KEY_ENTER);
    }

    /// Press escape.
    pub fn escape(&self) {
        self.write(KEY_ESCAPE);
    }

    /// Press the up arrow `n` times.
    pub fn up(&self, n: usize) {
        for _ in 0..n {
            self.write(KEY_UP);
        }
    }

    /// Press the down arrow `n` times.
    pub fn down(&self, n: usize) {
        for _ in 0..n {
            self.write(KEY_DOWN);
        }
    }

    /// Ask the program to exit: `q` then enter.
    pub fn quit(&self) {
        self.write("q");
        self.enter();
    }

    /// Wait until `pattern` appears in the plain output.
    pub async fn wait_for(&self, pattern: impl Into<Pattern>, timeout: Duration) -> Result<()> {
        self.monitor.wait_for(pattern, timeout).await
    }

    /// Wait until any pattern appears; returns the lowest matching index.
    pub async fn wait_for_any(&self, patterns: &[Pattern], timeout: Duration) -> Result<usize> {
        self.monitor.wait_for_any(patterns, timeout).await
    }

    /// Wait until output has been quiet for `quiet`.
    pub async fn wait_for_inactivity(&self, quiet: Duration, timeout: Duration) -> Result<()> {
        self.monitor.wait_for_inactivity(quiet, timeout).await
    }

    /// Type `text`, press enter and return what the program printed until
    /// it went quiet.
    ///
    /// A reply with an internal pause longer than `options.inactivity` comes
    /// back truncated without an error. A wait timeout is returned as is.
    pub async fn send_message_and_wait_for_reply(
        &self,
        text: &str,
        options: ReplyOptions,
    ) -> Result<String> {
        let start = self.plain_len();
        self.type_text(text);
        self.enter();
        self.wait_for_inactivity(options.inactivity, options.timeout)
            .await?;
        Ok(self.plain_slice(start).trim().to_string())
    }

    /// Terminate the process and close the session. Safe to call repeatedly.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let already_closed = self.shared.mark_closed();
        self.registry.remove(&self.id);

        if already_closed {
            debug!(session_id = %self.id, "Session already closed by process exit");
            return;
        }
        match self.handle.kill() {
            Ok(()) => info!(session_id = %self.id, "Terminal session disposed"),
            Err(e) => warn!(session_id = %self.id, error = %e, "Failed to kill terminal process"),
        }
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn pump(
    id: Uuid,
    mut events: mpsc::UnboundedReceiver<PtyEvent>,
    monitor: OutputMonitor,
    shared: Arc<Shared>,
    registry: SessionRegistry,
) {
    while let Some(event) = events.recv().await {
        match event {
            PtyEvent::Data(chunk) => monitor.append(&chunk),
            PtyEvent::Exit(code) => {
                shared.mark_closed();
                registry.remove(&id);
                info!(session_id = %id, code = ?code, "Terminal process exited");
                monitor.publish_exit(code);
            }
        }
    }
}
