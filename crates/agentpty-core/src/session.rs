//! Interactive agent session
//!
//! `AgentSession` wraps a [`TerminalSession`] running the agent TUI. Starting
//! one runs the login/version preflight first; afterwards it is a thin
//! pass-through with chat-oriented names.

use crate::agent::{AgentCommand, AgentSessionOptions, Resume};
use crate::error::Result;
use crate::preflight::{self, PreflightGate};
use crate::runner::{ProcessRunner, TokioRunner};
use agentpty_term::{
    DataSubscription, NativePtySpawner, PtySpawner, SessionEvent, TerminalSession,
};
use std::time::Duration;
use tokio::sync::broadcast;

/// A running interactive agent.
pub struct AgentSession {
    inner: TerminalSession,
    command: AgentCommand,
}

impl AgentSession {
    /// Preflight, then launch the agent TUI on a real terminal.
    pub async fn start(command: &AgentCommand, options: &AgentSessionOptions) -> Result<Self> {
        Self::start_with(
            command,
            options,
            &TokioRunner,
            &PreflightGate::global(),
            &NativePtySpawner,
        )
        .await
    }

    /// Open the chat list and pick entry `index`.
    pub async fn start_from_list(
        command: &AgentCommand,
        index: usize,
        options: &AgentSessionOptions,
    ) -> Result<Self> {
        let options = AgentSessionOptions {
            start_in_list: true,
            list_selection_index: index,
            ..options.clone()
        };
        Self::start(command, &options).await
    }

    /// Resume the most recent chat.
    pub async fn resume_latest(
        command: &AgentCommand,
        options: &AgentSessionOptions,
    ) -> Result<Self> {
        let options = AgentSessionOptions {
            resume: Some(Resume::Latest),
            ..options.clone()
        };
        Self::start(command, &options).await
    }

    /// Resume the chat with id `chat_id`.
    pub async fn resume_by_id(
        command: &AgentCommand,
        chat_id: &str,
        options: &AgentSessionOptions,
    ) -> Result<Self> {
        let options = AgentSessionOptions {
            resume: Some(Resume::Chat(chat_id.to_string())),
            ..options.clone()
        };
        Self::start(command, &options).await
    }

    /// Start with explicit collaborators.
    pub async fn start_with(
        command: &AgentCommand,
        options: &AgentSessionOptions,
        runner: &dyn ProcessRunner,
        gate: &PreflightGate,
        spawner: &dyn PtySpawner,
    ) -> Result<Self> {
        preflight::ensure_ready(runner, &command.program, &command.compatible_version, gate)
            .await?;
        let inner = command.start_terminal(spawner, options).await?;
        Ok(Self {
            inner,
            command: command.clone(),
        })
    }

    /// The underlying terminal session.
    #[must_use]
    pub fn terminal(&self) -> &TerminalSession {
        &self.inner
    }

    /// Raw chunks as the agent prints them.
    #[must_use]
    pub fn on_data(&self) -> DataSubscription {
        self.inner.on_data()
    }

    /// Output and exit events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.subscribe()
    }

    /// Send a chat message and return the reply.
    pub async fn send(&self, prompt: &str) -> Result<String> {
        let reply = self
            .inner
            .send_message_and_wait_for_reply(prompt, self.command.reply)
            .await?;
        Ok(reply)
    }

    /// Wait until the agent has been quiet for `inactivity`, however long that takes.
    pub async fn wait_until_done(&self, inactivity: Duration) -> Result<()> {
        self.inner
            .wait_for_inactivity(inactivity, Duration::MAX)
            .await?;
        Ok(())
    }

    /// Type without pressing enter.
    pub fn type_text(&self, text: &str) {
        self.inner.type_text(text);
    }

    /// Press enter.
    pub fn enter(&self) {
        self.inner.enter();
    }

    /// Press escape.
    pub fn escape(&self) {
        self.inner.escape();
    }

    /// Press the up arrow `n` times.
    pub fn up(&self, n: usize) {
        self.inner.up(n);
    }

    /// Press the down arrow `n` times.
    pub fn down(&self, n: usize) {
        self.inner.down(n);
    }

    /// Ask the agent to quit, then dispose of the terminal.
    pub fn close(&self) {
        self.inner.quit();
        self.inner.dispose();
    }

    /// Whether the session has ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Full ANSI-free transcript.
    #[must_use]
    pub fn plain_buffer(&self) -> String {
        self.inner.plain_buffer()
    }

    /// Full raw transcript.
    #[must_use]
    pub fn raw_buffer(&self) -> String {
        self.inner.raw_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::runner::RunOutput;
    use crate::testing::ScriptedRunner;
    use agentpty_term::testing::ScriptedPty;
    use tokio::time::Instant;

    fn ready_runner() -> ScriptedRunner {
        let runner = ScriptedRunner::new();
        runner.on(&["status"], RunOutput::new(Some(0), "Logged in as dev@example.com", ""));
        runner.on(&["--version"], RunOutput::new(Some(0), "2025.08.08-f57cb59", ""));
        runner
    }

    async fn start(pty: &ScriptedPty, options: &AgentSessionOptions) -> Result<AgentSession> {
        AgentSession::start_with(
            &AgentCommand::default(),
            options,
            &ready_runner(),
            &PreflightGate::new(),
            pty,
        )
        .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_returns_reply() {
        let pty = ScriptedPty::new();
        pty.emit("\x1b[1mCursor Agent\x1b[0m\r\n> ");
        pty.respond_to(
            "ping\r",
            Duration::from_millis(300),
            ["ping\r\n", "\x1b[32mpong\x1b[0m\r\n"],
        );

        let session = start(&pty, &AgentSessionOptions::default()).await.unwrap();
        let reply = session.send("ping").await.unwrap();

        assert!(reply.ends_with("pong"));
        assert!(!reply.contains('\x1b'));
        assert!(session.plain_buffer().contains("Cursor Agent"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_preflight_spawns_nothing() {
        let pty = ScriptedPty::new();
        let runner = ScriptedRunner::new();
        runner.on(&["status"], RunOutput::new(Some(0), "Not logged in", ""));

        let result = AgentSession::start_with(
            &AgentCommand::default(),
            &AgentSessionOptions::default(),
            &runner,
            &PreflightGate::new(),
            &pty,
        )
        .await;

        assert!(matches!(result, Err(Error::Setup { .. })));
        assert!(pty.spawned_request().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_start_selects_entry() {
        let pty = ScriptedPty::new();
        pty.emit("↑/↓ navigate chats · Enter: select · q/ESC: exit\r\n");
        pty.respond_to("\r", Duration::from_millis(100), ["Cursor Agent · model gpt-5\r\n"]);
        let options = AgentSessionOptions {
            start_in_list: true,
            list_selection_index: 1,
            ..Default::default()
        };

        let session = start(&pty, &options).await.unwrap();

        let request = pty.spawned_request().unwrap();
        assert_eq!(request.args, vec!["-lc", "cursor-agent ls"]);
        assert_eq!(pty.written(), "\x1b[B\r");
        assert!(!session.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_keystrokes_pass_through() {
        let pty = ScriptedPty::new();
        pty.emit("Cursor Agent\r\n");
        let session = start(&pty, &AgentSessionOptions::default()).await.unwrap();

        session.type_text("draft");
        session.up(2);
        session.down(1);
        session.escape();
        session.enter();

        assert_eq!(pty.written(), "draft\x1b[A\x1b[A\x1b[B\x1b\r");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_done_returns_after_quiet_period() {
        let pty = ScriptedPty::new();
        pty.emit("Cursor Agent\r\n");
        let session = start(&pty, &AgentSessionOptions::default()).await.unwrap();

        let printer = pty.clone();
        tokio::spawn(async move {
            for i in 0..5 {
                tokio::time::sleep(Duration::from_millis(200)).await;
                printer.emit(format!("step {i}\r\n"));
            }
        });

        let started = Instant::now();
        session
            .wait_until_done(Duration::from_millis(500))
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert!(session.plain_buffer().contains("step 4"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_quits_and_disposes() {
        let pty = ScriptedPty::new();
        pty.emit("Cursor Agent\r\n");
        let session = start(&pty, &AgentSessionOptions::default()).await.unwrap();

        session.close();
        session.close();

        assert_eq!(pty.written(), "q\r");
        assert_eq!(pty.kill_count(), 1);
        assert!(session.is_closed());
    }
}
