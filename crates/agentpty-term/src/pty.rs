//! PTY spawning
//!
//! `PtySpawner` is the seam between sessions and real processes. The native
//! backend allocates a pseudo-terminal with `pty-process`, runs the child on
//! it and turns its output into a stream of [`PtyEvent`]s.

use crate::error::{Error, Result};
use pty_process::Pty;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default terminal width.
pub const DEFAULT_COLS: u16 = 120;
/// Default terminal height.
pub const DEFAULT_ROWS: u16 = 30;

/// How long output may keep draining after the child has exited.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// How often the waiter checks whether the child has exited.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

const READ_BUFFER_SIZE: usize = 4096;

/// What to run and how to size its terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    /// Executable, resolved through `PATH`
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Terminal columns
    pub cols: u16,
    /// Terminal rows
    pub rows: u16,
    /// Working directory; inherits the caller's when `None`
    pub cwd: Option<PathBuf>,
    /// Variables added on top of the inherited environment
    pub env: Vec<(String, String)>,
}

impl SpawnRequest {
    /// Run `program` with no arguments on a default-sized terminal.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
            cwd: None,
            env: Vec::new(),
        }
    }

    /// Append arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the terminal size.
    #[must_use]
    pub fn size(mut self, cols: u16, rows: u16) -> Self {
        self.cols = cols;
        self.rows = rows;
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add an environment variable.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Output and lifecycle notifications from a spawned process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PtyEvent {
    /// Decoded output
    Data(String),
    /// The process ended
    Exit(Option<i32>),
}

/// Control side of a spawned process.
pub trait PtyHandle: Send + Sync {
    /// Send input to the process.
    fn write(&self, data: &str) -> io::Result<()>;

    /// Terminate the process. The signal is sent before this returns.
    fn kill(&self) -> io::Result<()>;

    /// OS process id, when known.
    fn pid(&self) -> Option<u32> {
        None
    }
}

/// A started process: its handle and its event stream.
///
/// The stream ends after [`PtyEvent::Exit`] once all output has drained.
pub struct SpawnedPty {
    /// Control handle
    pub handle: Arc<dyn PtyHandle>,
    /// Output and exit events
    pub events: mpsc::UnboundedReceiver<PtyEvent>,
}

/// Starts processes attached to a terminal.
pub trait PtySpawner: Send + Sync {
    /// Spawn the requested process. Must be called inside a Tokio runtime.
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedPty>;
}

/// Spawner backed by a real pseudo-terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativePtySpawner;

impl PtySpawner for NativePtySpawner {
    fn spawn(&self, request: &SpawnRequest) -> Result<SpawnedPty> {
        let (pty, pts) = pty_process::open()
            .map_err(|e| Error::SpawnFailure(format!("failed to open PTY: {}", e)))?;
        pty.resize(pty_process::Size::new(request.rows, request.cols))
            .map_err(|e| Error::SpawnFailure(format!("failed to size PTY: {}", e)))?;

        // Builder pattern: each method consumes self
        let mut cmd = pty_process::Command::new(&request.program).args(&request.args);
        for (key, value) in &request.env {
            cmd = cmd.env(key, value);
        }
        if let Some(dir) = &request.cwd {
            cmd = cmd.current_dir(dir);
        }

        let child = cmd
            .spawn(pts)
            .map_err(|e| Error::SpawnFailure(format!("failed to spawn {}: {}", request.program, e)))?;
        let pid = child.id();
        debug!(program = %request.program, pid = ?pid, cols = request.cols, rows = request.rows, "PTY process spawned");

        let (reader, writer) = tokio::io::split(pty);
        let (event_tx, events) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let child = Arc::new(Mutex::new(child));
        let killed = CancellationToken::new();
        let done = CancellationToken::new();

        let read_task = tokio::spawn(read_loop(reader, event_tx.clone()));
        tokio::spawn(write_loop(writer, input_rx, done.clone()));
        tokio::spawn(wait_loop(
            child.clone(),
            read_task,
            killed.clone(),
            done,
            event_tx,
        ));

        Ok(SpawnedPty {
            handle: Arc::new(NativePtyHandle {
                input: input_tx,
                child,
                killed,
                pid,
            }),
            events,
        })
    }
}

struct NativePtyHandle {
    input: mpsc::UnboundedSender<String>,
    child: Arc<Mutex<tokio::process::Child>>,
    /// Wakes the waiter after a kill.
    killed: CancellationToken,
    pid: Option<u32>,
}

impl PtyHandle for NativePtyHandle {
    fn write(&self, data: &str) -> io::Result<()> {
        self.input
            .send(data.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "PTY writer has stopped"))
    }

    fn kill(&self) -> io::Result<()> {
        let result = {
            let mut child = self.child.lock().unwrap_or_else(|e| e.into_inner());
            match child.try_wait() {
                // Already reaped
                Ok(Some(_)) => Ok(()),
                Ok(None) | Err(_) => child.start_kill(),
            }
        };
        self.killed.cancel();
        result
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}

async fn read_loop(mut reader: ReadHalf<Pty>, events: mpsc::UnboundedSender<PtyEvent>) {
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut pending = Vec::new();
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                let text = take_utf8(&mut pending);
                if !text.is_empty() && events.send(PtyEvent::Data(text)).is_err() {
                    return;
                }
            }
            // EIO once the last slave descriptor closes
            Err(e) => {
                debug!(error = %e, "PTY read ended");
                break;
            }
        }
    }
    if !pending.is_empty() {
        let _ = events.send(PtyEvent::Data(String::from_utf8_lossy(&pending).into_owned()));
    }
}

async fn write_loop(
    mut writer: WriteHalf<Pty>,
    mut input: mpsc::UnboundedReceiver<String>,
    done: CancellationToken,
) {
    loop {
        let data = tokio::select! {
            data = input.recv() => match data {
                Some(data) => data,
                None => break,
            },
            () = done.cancelled() => break,
        };
        if let Err(e) = writer.write_all(data.as_bytes()).await {
            debug!(error = %e, "PTY write failed");
            break;
        }
        if let Err(e) = writer.flush().await {
            debug!(error = %e, "PTY flush failed");
            break;
        }
    }
}

async fn wait_loop(
    child: Arc<Mutex<tokio::process::Child>>,
    mut read_task: JoinHandle<()>,
    killed: CancellationToken,
    done: CancellationToken,
    events: mpsc::UnboundedSender<PtyEvent>,
) {
    let mut woken = false;
    let status = loop {
        // The lock is never held across an await.
        let polled = child.lock().unwrap_or_else(|e| e.into_inner()).try_wait();
        match polled {
            Ok(Some(status)) => break Ok(status),
            Ok(None) => {}
            Err(e) => break Err(e),
        }
        tokio::select! {
            () = killed.cancelled(), if !woken => woken = true,
            () = tokio::time::sleep(EXIT_POLL_INTERVAL) => {}
        }
    };

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(error = %e, "Failed to collect PTY process status");
            None
        }
    };

    // Let buffered output through, but do not wait on a grandchild that
    // still holds the terminal open.
    if tokio::time::timeout(DRAIN_GRACE, &mut read_task).await.is_err() {
        read_task.abort();
    }
    done.cancel();

    debug!(code = ?code, "PTY process exited");
    let _ = events.send(PtyEvent::Exit(code));
}

/// Decode the valid UTF-8 in `pending`, keeping a trailing partial
/// character for the next read. Invalid bytes become U+FFFD.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let mut out = String::new();
    loop {
        match std::str::from_utf8(pending) {
            Ok(text) => {
                out.push_str(text);
                pending.clear();
                return out;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    None => {
                        pending.drain(..valid);
                        return out;
                    }
                    Some(len) => {
                        out.push(char::REPLACEMENT_CHARACTER);
                        pending.drain(..valid + len);
                    }
                }
            }
        }
    }
}
