//! One-shot process execution
//!
//! Non-interactive invocations of the agent CLI (`status`, `--version`,
//! `--print`) go through a [`ProcessRunner`] so tests can script them.

use crate::error::Result;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// A command to run to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunRequest {
    /// Executable, resolved through `PATH`
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory
    pub cwd: Option<PathBuf>,
    /// Extra environment variables
    pub env: Vec<(String, String)>,
    /// Written to stdin, which is then closed
    pub stdin: Option<String>,
}

impl RunRequest {
    /// Run `program` without arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
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

    /// Set the working directory.
    #[must_use]
    pub fn cwd(mut self, dir: Option<PathBuf>) -> Self {
        self.cwd = dir;
        self
    }

    /// Feed `input` on stdin.
    #[must_use]
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutput {
    /// Exit code; `None` when terminated by a signal
    pub exit_code: Option<i32>,
    /// Captured stdout
    pub stdout: String,
    /// Captured stderr
    pub stderr: String,
}

impl RunOutput {
    /// Build an output record.
    pub fn new(exit_code: Option<i32>, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Exit code zero.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout and stderr joined by a newline.
    #[must_use]
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// stderr when non-empty, otherwise stdout.
    #[must_use]
    pub fn failure_output(&self) -> &str {
        if self.stderr.is_empty() {
            &self.stdout
        } else {
            &self.stderr
        }
    }
}

/// Runs commands to completion.
#[async_trait::async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `request` and capture its output. A non-zero exit is not an error.
    async fn run(&self, request: RunRequest) -> Result<RunOutput>;
}

/// Runner backed by `tokio::process`.
///
/// The child is killed if the returned future is dropped before it exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioRunner;

#[async_trait::async_trait]
impl ProcessRunner for TokioRunner {
    async fn run(&self, request: RunRequest) -> Result<RunOutput> {
        let mut cmd = tokio::process::Command::new(&request.program);
        cmd.args(&request.args)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(if request.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &request.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            agentpty_term::Error::SpawnFailure(format!("failed to run {}: {}", request.program, e))
        })?;
        debug!(program = %request.program, args = ?request.args, pid = ?child.id(), "Process started");

        // Feed stdin on its own task so a chatty child cannot deadlock us.
        if let (Some(input), Some(mut stdin)) = (request.stdin, child.stdin.take()) {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    debug!(error = %e, "Failed to write process stdin");
                }
            });
        }

        let output = child.wait_with_output().await?;
        let result = RunOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(
            program = %request.program,
            exit_code = ?result.exit_code,
            stdout_len = result.stdout.len(),
            stderr_len = result.stderr.len(),
            "Process finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_output_prefers_stderr() {
        assert_eq!(RunOutput::new(Some(1), "out", "err").failure_output(), "err");
        assert_eq!(RunOutput::new(Some(1), "out", "").failure_output(), "out");
        assert!(RunOutput::new(Some(0), "", "").success());
        assert!(!RunOutput::new(None, "", "").success());
    }

    #[test]
    fn test_request_builder() {
        let request = RunRequest::new("cursor-agent")
            .args(["--print", "--force"])
            .cwd(Some(PathBuf::from("/work")))
            .stdin("hello");

        assert_eq!(request.program, "cursor-agent");
        assert_eq!(request.args, vec!["--print", "--force"]);
        assert_eq!(request.cwd, Some(PathBuf::from("/work")));
        assert_eq!(request.stdin.as_deref(), Some("hello"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_runner_captures_streams_and_stdin() {
        let output = TokioRunner
            .run(
                RunRequest::new("sh")
                    .args(["-c", "cat; echo oops >&2; exit 3"])
                    .stdin("from stdin"),
            )
            .await
            .unwrap();

        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "from stdin");
        assert_eq!(output.stderr, "oops\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_tokio_runner_uses_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let output = TokioRunner
            .run(
                RunRequest::new("sh")
                    .args(["-c", "pwd -P"])
                    .cwd(Some(dir.path().to_path_buf())),
            )
            .await
            .unwrap();

        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(output.stdout.trim(), expected.to_string_lossy());
    }

    #[tokio::test]
    async fn test_tokio_runner_reports_missing_program() {
        let err = TokioRunner
            .run(RunRequest::new("/nonexistent/agentpty-runner-test"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Term(agentpty_term::Error::SpawnFailure(_))
        ));
    }
}
