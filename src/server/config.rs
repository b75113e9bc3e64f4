//! Server configuration types

use agentpty_core::AgentCommand;
use agentpty_term::ReplyOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

impl AppConfig {
    /// Launch settings for the agent CLI.
    pub fn agent_command(&self) -> AgentCommand {
        AgentCommand {
            program: self.agent.command.clone(),
            shell: self.agent.shell.clone(),
            cols: self.session.cols,
            rows: self.session.rows,
            term: self.session.term.clone(),
            startup_timeout: Duration::from_millis(self.session.startup_timeout_ms),
            compatible_version: self.agent.compatible_version.clone(),
            reply: ReplyOptions {
                inactivity: Duration::from_millis(self.session.reply_inactivity_ms),
                timeout: Duration::from_millis(self.session.reply_timeout_ms),
            },
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Answer preflight requests and add permissive CORS headers
    #[serde(default = "default_true")]
    pub cors: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: true,
        }
    }
}

/// Agent CLI settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_shell")]
    pub shell: String,
    /// Model used when a request does not name one
    #[serde(default)]
    pub model: Option<String>,
    /// Working directory used when a request does not name one
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default = "default_compatible_version")]
    pub compatible_version: String,
}

fn default_command() -> String {
    agentpty_core::DEFAULT_PROGRAM.to_string()
}

fn default_shell() -> String {
    agentpty_core::agent::DEFAULT_SHELL.to_string()
}

fn default_compatible_version() -> String {
    agentpty_core::COMPATIBLE_VERSION.to_string()
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            shell: default_shell(),
            model: None,
            cwd: None,
            compatible_version: default_compatible_version(),
        }
    }
}

/// Terminal and reply-detection settings for interactive sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_cols")]
    pub cols: u16,
    #[serde(default = "default_rows")]
    pub rows: u16,
    #[serde(default = "default_term")]
    pub term: String,
    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
    #[serde(default = "default_reply_inactivity_ms")]
    pub reply_inactivity_ms: u64,
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

fn default_cols() -> u16 {
    agentpty_term::pty::DEFAULT_COLS
}
fn default_rows() -> u16 {
    agentpty_term::pty::DEFAULT_ROWS
}
fn default_term() -> String {
    agentpty_core::agent::DEFAULT_TERM.to_string()
}
fn default_startup_timeout_ms() -> u64 {
    8000
}
fn default_reply_inactivity_ms() -> u64 {
    1500
}
fn default_reply_timeout_ms() -> u64 {
    60_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cols: default_cols(),
            rows: default_rows(),
            term: default_term(),
            startup_timeout_ms: default_startup_timeout_ms(),
            reply_inactivity_ms: default_reply_inactivity_ms(),
            reply_timeout_ms: default_reply_timeout_ms(),
        }
    }
}
