//! CLI module for agentpty
//!
//! Provides commands:
//! - `serve`: run the HTTP API
//! - `prompt`: one-shot prompt from the command line
//! - `version`: agent CLI version
//! - `chat`: interactive chat over a terminal session

use crate::server::config::AppConfig;
use agentpty_core::{AgentClient, CliAgent, PromptOptions};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tokio::io::AsyncReadExt;

pub mod chat;

/// agentpty CLI
#[derive(Parser, Debug)]
#[command(name = "agentpty")]
#[command(about = "Drive interactive terminal AI agents over a PTY")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Send one prompt and print the answer
    Prompt(PromptArgs),
    /// Print the agent CLI version
    Version,
    /// Chat with the agent through an interactive terminal session
    Chat(chat::ChatArgs),
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,
    /// Port to listen on
    #[arg(long, short)]
    pub port: Option<u16>,
    /// Do not send CORS headers
    #[arg(long)]
    pub no_cors: bool,
    /// Default model for requests that name none
    #[arg(long)]
    pub model: Option<String>,
    /// Default working directory for requests that name none
    #[arg(long)]
    pub path: Option<PathBuf>,
}

impl ServeArgs {
    /// Layer the flags over the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.no_cors {
            config.server.cors = false;
        }
        if let Some(model) = &self.model {
            config.agent.model = Some(model.clone());
        }
        if let Some(path) = &self.path {
            config.agent.cwd = Some(path.clone());
        }
    }
}

#[derive(Args, Debug)]
pub struct PromptArgs {
    /// Prompt text; read from stdin when omitted
    pub text: Vec<String>,
    /// Model to use
    #[arg(long)]
    pub model: Option<String>,
    /// Working directory for the agent
    #[arg(long)]
    pub path: Option<PathBuf>,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    let mut config = crate::server::load_config()?;
    match command {
        Commands::Serve(args) => {
            args.apply(&mut config);
            crate::server::run(config).await
        }
        Commands::Prompt(args) => prompt(&config, args).await,
        Commands::Version => {
            let agent = CliAgent::new(config.agent_command());
            println!("{}", agent.version().await?);
            Ok(())
        }
        Commands::Chat(args) => chat::run(&config, args).await,
    }
}

async fn prompt(config: &AppConfig, args: PromptArgs) -> Result<()> {
    let text = if args.text.is_empty() {
        let mut input = String::new();
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .context("Failed to read prompt from stdin")?;
        input
    } else {
        args.text.join(" ")
    };
    if text.trim().is_empty() {
        anyhow::bail!("Missing prompt text");
    }

    let options = PromptOptions {
        model: args.model.or_else(|| config.agent.model.clone()),
        path: args.path.or_else(|| config.agent.cwd.clone()),
    };
    let agent = CliAgent::new(config.agent_command());
    println!("{}", agent.prompt(&text, &options).await?);
    Ok(())
}
