//! Interactive chat
//!
//! Starts an agent session and relays stdin lines through it until EOF or
//! `/quit`.

use crate::server::config::AppConfig;
use agentpty_core::{AgentSession, AgentSessionOptions, Resume};
use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

const QUIT_COMMAND: &str = "/quit";

#[derive(Args, Debug, Default)]
pub struct ChatArgs {
    /// Model to use
    #[arg(long)]
    pub model: Option<String>,
    /// Working directory for the agent
    #[arg(long)]
    pub path: Option<PathBuf>,
    /// Resume the latest chat, or the chat with the given id
    #[arg(long, num_args = 0..=1, value_name = "CHAT_ID")]
    pub resume: Option<Option<String>>,
    /// Open the chat list and pick this entry (zero-based)
    #[arg(long, value_name = "INDEX", conflicts_with = "resume")]
    pub select: Option<usize>,
}

impl ChatArgs {
    /// Session options, falling back to the configured model and directory.
    pub fn session_options(&self, config: &AppConfig) -> AgentSessionOptions {
        AgentSessionOptions {
            path: self.path.clone().or_else(|| config.agent.cwd.clone()),
            model: self.model.clone().or_else(|| config.agent.model.clone()),
            resume: self.resume.as_ref().map(|id| match id {
                Some(id) => Resume::Chat(id.clone()),
                None => Resume::Latest,
            }),
            start_in_list: self.select.is_some(),
            list_selection_index: self.select.unwrap_or(0),
        }
    }
}

/// Run an interactive chat on stdin/stdout.
pub async fn run(config: &AppConfig, args: ChatArgs) -> Result<()> {
    let command = config.agent_command();
    let session = AgentSession::start(&command, &args.session_options(config))
        .await
        .context("Failed to start agent session")?;

    println!("Connected to {}. Type {} to leave.", command.program, QUIT_COMMAND);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == QUIT_COMMAND {
            break;
        }
        if session.is_closed() {
            warn!("Agent session ended");
            break;
        }

        match session.send(line).await {
            Ok(reply) => println!("{}", reply),
            Err(e) => eprintln!("error: {}", e),
        }
    }

    session.close();
    Ok(())
}
