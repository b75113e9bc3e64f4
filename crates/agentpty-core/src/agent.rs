//! Agent command model
//!
//! Describes how the agent CLI is launched: the interactive command line
//! run through a login shell, the one-shot `--print` invocation, and the
//! startup heuristics used to tell when its UI is up.

use agentpty_term::{
    ListSelection, Pattern, PtySpawner, ReplyOptions, SpawnRequest, StartupScript, TerminalSession,
};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::info;

use crate::error::Result;

/// Default agent executable.
pub const DEFAULT_PROGRAM: &str = "cursor-agent";

/// Shell the interactive command line runs under (`<shell> -lc <line>`).
pub const DEFAULT_SHELL: &str = "bash";

/// Agent release the integration was verified against.
pub const COMPATIBLE_VERSION: &str = "2025.08.08-f57cb59";

/// Terminal type advertised to the agent.
pub const DEFAULT_TERM: &str = "xterm-256color";

/// How long each startup heuristic waits.
pub const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(8);

static BANNER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Cursor Agent").expect("BANNER_REGEX is a compile-time constant"));

static LIST_HINT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)navigate .* Enter: select .* q/ESC: exit")
        .expect("LIST_HINT_REGEX is a compile-time constant")
});

static MODEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)model").expect("MODEL_REGEX is a compile-time constant"));

static ASSISTANT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)assistant").expect("ASSISTANT_REGEX is a compile-time constant")
});

/// Which previous chat to resume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resume {
    /// The most recent chat (`--resume`)
    Latest,
    /// A specific chat (`--resume <id>`)
    Chat(String),
}

/// Per-session launch options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentSessionOptions {
    /// Working directory for the agent
    pub path: Option<PathBuf>,
    /// Model override
    pub model: Option<String>,
    /// Resume a previous chat; ignored when starting in the list view
    pub resume: Option<Resume>,
    /// Start in the chat list (`<program> ls`) and pick an entry
    pub start_in_list: bool,
    /// Zero-based list entry to pick
    pub list_selection_index: usize,
}

/// How to launch and talk to the agent CLI.
#[derive(Debug, Clone)]
pub struct AgentCommand {
    /// Agent executable
    pub program: String,
    /// Login shell wrapping the interactive command line
    pub shell: String,
    /// Terminal columns
    pub cols: u16,
    /// Terminal rows
    pub rows: u16,
    /// `TERM` value
    pub term: String,
    /// Limit for each startup heuristic wait
    pub startup_timeout: Duration,
    /// Version that passes the preflight check without a warning
    pub compatible_version: String,
    /// Reply detection used by [`crate::AgentSession::send`]
    pub reply: ReplyOptions,
}

impl Default for AgentCommand {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            shell: DEFAULT_SHELL.to_string(),
            cols: agentpty_term::pty::DEFAULT_COLS,
            rows: agentpty_term::pty::DEFAULT_ROWS,
            term: DEFAULT_TERM.to_string(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            compatible_version: COMPATIBLE_VERSION.to_string(),
            reply: ReplyOptions::default(),
        }
    }
}

impl AgentCommand {
    /// Arguments for an interactive session.
    #[must_use]
    pub fn interactive_args(&self, options: &AgentSessionOptions) -> Vec<String> {
        if options.start_in_list {
            return vec!["ls".to_string()];
        }

        let mut args = vec!["--force".to_string()];
        if let Some(model) = &options.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        match &options.resume {
            Some(Resume::Chat(id)) if !id.is_empty() => {
                args.push("--resume".to_string());
                args.push(id.clone());
            }
            Some(_) => args.push("--resume".to_string()),
            None => {}
        }
        args
    }

    /// The shell command line for an interactive session.
    #[must_use]
    pub fn command_line(&self, options: &AgentSessionOptions) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.interactive_args(options).iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// PTY spawn request for an interactive session.
    #[must_use]
    pub fn spawn_request(&self, options: &AgentSessionOptions) -> SpawnRequest {
        let request = SpawnRequest::new(&self.shell)
            .args(["-lc".to_string(), self.command_line(options)])
            .size(self.cols, self.rows)
            .env("TERM", &self.term);
        match &options.path {
            Some(path) => request.cwd(path),
            None => request,
        }
    }

    /// Startup heuristics for an interactive session.
    #[must_use]
    pub fn startup_script(&self, options: &AgentSessionOptions) -> StartupScript {
        let selection = options.start_in_list.then(|| ListSelection {
            index: options.list_selection_index,
            signals: vec![
                Pattern::Regex(BANNER_REGEX.clone()),
                Pattern::Regex(MODEL_REGEX.clone()),
                Pattern::Regex(ASSISTANT_REGEX.clone()),
            ],
            timeout: self.startup_timeout,
        });

        StartupScript {
            banner: vec![
                Pattern::Regex(BANNER_REGEX.clone()),
                Pattern::Regex(LIST_HINT_REGEX.clone()),
            ],
            banner_timeout: self.startup_timeout,
            selection,
        }
    }

    /// Arguments for a one-shot prompt; the prompt itself goes on stdin.
    #[must_use]
    pub fn print_args(&self, model: Option<&str>) -> Vec<String> {
        let mut args = vec!["--print".to_string(), "--force".to_string()];
        if let Some(model) = model {
            args.push("--model".to_string());
            args.push(model.to_string());
        }
        args
    }

    /// Spawn an interactive terminal session and run its startup heuristics.
    ///
    /// No login or version check happens here; see [`crate::AgentSession`].
    pub async fn start_terminal(
        &self,
        spawner: &dyn PtySpawner,
        options: &AgentSessionOptions,
    ) -> Result<TerminalSession> {
        let request = self.spawn_request(options);
        info!(
            command = %self.command_line(options),
            cwd = ?options.path,
            list = options.start_in_list,
            "Starting agent session"
        );
        let session =
            TerminalSession::start(spawner, &request, &self.startup_script(options)).await?;
        Ok(session)
    }
}

/// Quote `arg` for a POSIX shell when it contains anything but safe characters.
#[must_use]
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./=:,@+%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interactive_args() {
        let command = AgentCommand::default();
        let options = AgentSessionOptions::default();

        assert_eq!(command.interactive_args(&options), vec!["--force"]);
        assert_eq!(command.command_line(&options), "cursor-agent --force");
    }

    #[test]
    fn test_model_and_resume_args() {
        let command = AgentCommand::default();

        let latest = AgentSessionOptions {
            model: Some("gpt-5".to_string()),
            resume: Some(Resume::Latest),
            ..Default::default()
        };
        assert_eq!(
            command.interactive_args(&latest),
            vec!["--force", "--model", "gpt-5", "--resume"]
        );

        let by_id = AgentSessionOptions {
            resume: Some(Resume::Chat("chat-42".to_string())),
            ..Default::default()
        };
        assert_eq!(
            command.interactive_args(&by_id),
            vec!["--force", "--resume", "chat-42"]
        );

        let empty_id = AgentSessionOptions {
            resume: Some(Resume::Chat(String::new())),
            ..Default::default()
        };
        assert_eq!(command.interactive_args(&empty_id), vec!["--force", "--resume"]);
    }

    #[test]
    fn test_list_mode_ignores_other_flags() {
        let command = AgentCommand::default();
        let options = AgentSessionOptions {
            model: Some("gpt-5".to_string()),
            resume: Some(Resume::Latest),
            start_in_list: true,
            list_selection_index: 3,
            ..Default::default()
        };

        assert_eq!(command.command_line(&options), "cursor-agent ls");
        let script = command.startup_script(&options);
        let selection = script.selection.unwrap();
        assert_eq!(selection.index, 3);
        assert_eq!(selection.signals.len(), 3);
        assert_eq!(selection.timeout, DEFAULT_STARTUP_TIMEOUT);
    }

    #[test]
    fn test_command_line_quotes_arguments() {
        let command = AgentCommand::default();
        let options = AgentSessionOptions {
            model: Some("my model's best".to_string()),
            ..Default::default()
        };

        assert_eq!(
            command.command_line(&options),
            r"cursor-agent --force --model 'my model'\''s best'"
        );
    }

    #[test]
    fn test_spawn_request() {
        let command = AgentCommand::default();
        let options = AgentSessionOptions {
            path: Some(PathBuf::from("/repo")),
            ..Default::default()
        };

        let request = command.spawn_request(&options);
        assert_eq!(request.program, "bash");
        assert_eq!(request.args, vec!["-lc", "cursor-agent --force"]);
        assert_eq!((request.cols, request.rows), (120, 30));
        assert_eq!(request.cwd, Some(PathBuf::from("/repo")));
        assert!(request
            .env
            .contains(&("TERM".to_string(), "xterm-256color".to_string())));
    }

    #[test]
    fn test_banner_patterns() {
        let script = AgentCommand::default().startup_script(&AgentSessionOptions::default());

        assert!(script.selection.is_none());
        assert!(script.banner[0].is_match("welcome to CURSOR AGENT"));
        assert!(script.banner[1].is_match("↑/↓ navigate chats · Enter: select · q/ESC: exit"));
        assert!(!script.banner[1].is_match("Enter: select"));
    }

    #[test]
    fn test_print_args() {
        let command = AgentCommand::default();
        assert_eq!(command.print_args(None), vec!["--print", "--force"]);
        assert_eq!(
            command.print_args(Some("sonnet-4")),
            vec!["--print", "--force", "--model", "sonnet-4"]
        );
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("plain-arg_1.0"), "plain-arg_1.0");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
    }
}
