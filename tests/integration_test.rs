//! Integration tests for agentpty
//!
//! These run the built binary against a fake agent CLI and exercise the
//! library crates together:
//! - agentpty-core: command model, preflight, one-shot prompts
//! - agentpty-term: terminal sessions over a scripted PTY

#![cfg(unix)]

use agentpty_core::testing::ScriptedRunner;
use agentpty_core::{
    AgentCommand, AgentSession, AgentSessionOptions, PreflightGate, Resume, RunOutput,
};
use agentpty_term::testing::ScriptedPty;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use tempfile::TempDir;

const FAKE_AGENT: &str = r#"#!/bin/sh
case "$1" in
  status) echo "Logged in as dev@example.com" ;;
  --version) echo "2025.08.08-f57cb59" ;;
  --print)
    prompt=$(cat)
    printf 'loading...\n{"type":"result","result":"you said: %s"}\n' "$prompt"
    ;;
  *) exit 2 ;;
esac
"#;

fn install_fake_agent(dir: &Path) -> String {
    let path = dir.join("fake-agent");
    std::fs::write(&path, FAKE_AGENT).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path.to_string_lossy().into_owned()
}

fn agentpty(dir: &TempDir) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_agentpty"));
    command
        .current_dir(dir.path())
        .env("AGENTPTY_AGENT__COMMAND", install_fake_agent(dir.path()))
        .env("RUST_LOG", "off");
    command
}

// ============================================================================
// Binary
// ============================================================================

#[test]
fn test_version_command() {
    let dir = TempDir::new().unwrap();
    let output = agentpty(&dir).arg("version").output().unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "2025.08.08-f57cb59");
}

#[test]
fn test_prompt_command() {
    let dir = TempDir::new().unwrap();
    let output = agentpty(&dir).args(["prompt", "hello"]).output().unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "you said: hello");
}

#[test]
fn test_help_without_subcommand() {
    let dir = TempDir::new().unwrap();
    let output = agentpty(&dir).output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("serve"));
}

// ============================================================================
// Agent session over a scripted terminal
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_resumed_session_round_trip() {
    let runner = ScriptedRunner::new();
    runner.on(&["status"], RunOutput::new(Some(0), "Logged in", ""));
    runner.on(&["--version"], RunOutput::new(Some(0), "2025.09.01-0000000", ""));

    let pty = ScriptedPty::new();
    pty.emit("\x1b[?25l\x1b[1mCursor Agent\x1b[0m\r\n");
    pty.respond_to(
        "summarize\r",
        Duration::from_millis(500),
        ["\x1b[2K\rWorking...", "\x1b[2K\rDone: three files changed\r\n"],
    );

    let command = AgentCommand::default();
    let options = AgentSessionOptions {
        resume: Some(Resume::Chat("chat-7".to_string())),
        ..Default::default()
    };
    let session =
        AgentSession::start_with(&command, &options, &runner, &PreflightGate::new(), &pty)
            .await
            .unwrap();

    let request = pty.spawned_request().unwrap();
    assert_eq!(request.args[1], "cursor-agent --force --resume chat-7");

    let reply = session.send("summarize").await.unwrap();
    assert!(reply.ends_with("Done: three files changed"), "reply: {reply:?}");

    session.close();
    assert_eq!(pty.kill_count(), 1);
}
