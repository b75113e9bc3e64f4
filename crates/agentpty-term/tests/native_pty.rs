//! Smoke tests against a real pseudo-terminal.

#![cfg(unix)]

use agentpty_term::{
    NativePtySpawner, ReplyOptions, SessionEvent, SessionRegistry, SpawnRequest, TerminalSession,
};
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(10);

fn shell(script: &str) -> SpawnRequest {
    SpawnRequest::new("/bin/sh").args(["-c", script])
}

#[tokio::test]
async fn test_shell_round_trip() {
    let registry = SessionRegistry::new();
    let session = TerminalSession::spawn_with_registry(
        &NativePtySpawner,
        &shell("echo pty-ready; exec cat"),
        registry.clone(),
    )
    .unwrap();
    assert!(session.pid().is_some());

    session.wait_for("pty-ready", WAIT).await.unwrap();
    let reply = session
        .send_message_and_wait_for_reply(
            "hello",
            ReplyOptions {
                inactivity: Duration::from_millis(300),
                timeout: WAIT,
            },
        )
        .await
        .unwrap();
    assert!(reply.contains("hello"), "reply: {reply:?}");

    session.dispose();
    assert!(session.is_closed());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_exit_is_published() {
    let registry = SessionRegistry::new();
    let session = TerminalSession::spawn_with_registry(
        &NativePtySpawner,
        &shell("printf '\\033[31mbye\\033[0m\\n'; exit 3"),
        registry.clone(),
    )
    .unwrap();
    let mut events = session.subscribe();

    let code = tokio::time::timeout(WAIT, async {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Exited { code }) => break code,
                Ok(SessionEvent::Output(_)) => {}
                Err(e) => panic!("event stream ended: {e}"),
            }
        }
    })
    .await
    .unwrap();

    assert_eq!(code, Some(3));
    assert!(session.plain_buffer().contains("bye"));
    assert!(session.raw_buffer().contains("\x1b[31m"));
    assert!(session.is_closed());
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_size_and_environment_are_applied() {
    let request = shell("stty size; echo \"marker=$AGENTPTY_MARKER\"; sleep 5")
        .size(100, 40)
        .env("AGENTPTY_MARKER", "from-test");
    let session =
        TerminalSession::spawn_with_registry(&NativePtySpawner, &request, SessionRegistry::new())
            .unwrap();

    session.wait_for("marker=from-test", WAIT).await.unwrap();
    assert!(session.plain_buffer().contains("40 100"));
}

#[tokio::test]
async fn test_missing_program_fails_to_spawn() {
    let result = TerminalSession::spawn_with_registry(
        &NativePtySpawner,
        &SpawnRequest::new("/nonexistent/agentpty-test-binary"),
        SessionRegistry::new(),
    );

    assert!(matches!(result, Err(agentpty_term::Error::SpawnFailure(_))));
}

/// Whether `pid` still runs. A zombie has already died.
#[cfg(target_os = "linux")]
fn is_running(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => {
            let state = stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.trim_start().chars().next());
            !matches!(state, Some('Z' | 'X'))
        }
        Err(_) => false,
    }
}

#[cfg(target_os = "linux")]
#[test]
fn test_terminate_all_kills_before_runtime_shutdown() {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let registry = SessionRegistry::new();

    let session = rt.block_on(async {
        let session = TerminalSession::spawn_with_registry(
            &NativePtySpawner,
            &shell("trap '' HUP TERM; echo trapped; while :; do sleep 1; done"),
            registry.clone(),
        )
        .unwrap();
        session.wait_for("trapped", WAIT).await.unwrap();
        session
    });
    let pid = session.pid().unwrap();

    assert_eq!(registry.terminate_all(), 1);
    drop(rt);

    let mut running = is_running(pid);
    for _ in 0..50 {
        if !running {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
        running = is_running(pid);
    }
    assert!(!running, "pid {pid} survived terminate_all");
    drop(session);
}
