//! One-shot agent client
//!
//! [`AgentClient`] is what the HTTP layer talks to. [`CliAgent`] implements
//! it by running the agent CLI in `--print` mode.

use crate::agent::AgentCommand;
use crate::error::{Error, Result};
use crate::preflight::{self, PreflightGate};
use crate::prompt::extract_reply;
use crate::runner::{ProcessRunner, RunRequest, TokioRunner};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Options for a single prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptOptions {
    /// Model override
    pub model: Option<String>,
    /// Working directory for the agent
    pub path: Option<PathBuf>,
}

/// Non-interactive access to an agent.
#[async_trait::async_trait]
pub trait AgentClient: Send + Sync {
    /// Agent CLI version string.
    async fn version(&self) -> Result<String>;

    /// Send one prompt and return the answer text.
    async fn prompt(&self, text: &str, options: &PromptOptions) -> Result<String>;
}

/// [`AgentClient`] backed by the agent CLI.
pub struct CliAgent {
    command: AgentCommand,
    runner: Arc<dyn ProcessRunner>,
    gate: PreflightGate,
}

impl CliAgent {
    /// Use real processes and the process-wide preflight gate.
    #[must_use]
    pub fn new(command: AgentCommand) -> Self {
        Self::with_runner(command, Arc::new(TokioRunner), PreflightGate::global())
    }

    /// Use a custom runner and gate.
    #[must_use]
    pub fn with_runner(
        command: AgentCommand,
        runner: Arc<dyn ProcessRunner>,
        gate: PreflightGate,
    ) -> Self {
        Self {
            command,
            runner,
            gate,
        }
    }

    /// The command this client runs.
    #[must_use]
    pub fn command(&self) -> &AgentCommand {
        &self.command
    }
}

#[async_trait::async_trait]
impl AgentClient for CliAgent {
    async fn version(&self) -> Result<String> {
        preflight::version(self.runner.as_ref(), &self.command.program).await
    }

    async fn prompt(&self, text: &str, options: &PromptOptions) -> Result<String> {
        let program = &self.command.program;
        preflight::ensure_ready(
            self.runner.as_ref(),
            program,
            &self.command.compatible_version,
            &self.gate,
        )
        .await?;

        let start = Instant::now();
        info!(
            program = %program,
            model = ?options.model,
            cwd = ?options.path,
            prompt_len = text.len(),
            "Sending prompt"
        );

        let request = RunRequest::new(program.as_str())
            .args(self.command.print_args(options.model.as_deref()))
            .cwd(options.path.clone())
            .stdin(text);
        let output = self.runner.run(request).await?;

        if !output.success() {
            warn!(
                program = %program,
                exit_code = ?output.exit_code,
                stderr_len = output.stderr.len(),
                "Agent exited with non-zero status"
            );
            return Err(Error::CommandFailed {
                program: program.clone(),
                code: output.exit_code,
                output: output.failure_output().to_string(),
            });
        }

        let reply = extract_reply(&output.stdout);
        info!(
            program = %program,
            reply_len = reply.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Prompt completed"
        );
        Ok(reply)
    }
}
