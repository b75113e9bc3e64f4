//! Test doubles for the agent layer

use crate::client::{AgentClient, PromptOptions};
use crate::error::{Error, Result};
use crate::runner::{ProcessRunner, RunOutput, RunRequest};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum Scripted {
    Output(RunOutput),
    SpawnFailure(String),
}

/// A runner that answers from a script keyed by argument prefix.
///
/// The most recently added matching entry wins. Every request is recorded.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    script: Arc<Mutex<Vec<(Vec<String>, Arc<Scripted>)>>>,
    calls: Arc<Mutex<Vec<RunRequest>>>,
}

impl ScriptedRunner {
    /// Create a runner with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&self, args: &[&str], entry: Scripted) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((args.iter().map(|a| (*a).to_string()).collect(), Arc::new(entry)));
    }

    /// Answer requests whose arguments start with `args`.
    pub fn on(&self, args: &[&str], output: RunOutput) {
        self.add(args, Scripted::Output(output));
    }

    /// Fail to start requests whose arguments start with `args`.
    pub fn fail_spawn(&self, args: &[&str], message: &str) {
        self.add(args, Scripted::SpawnFailure(message.to_string()));
    }

    /// Every request received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<RunRequest> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of requests whose arguments start with `args`.
    #[must_use]
    pub fn count(&self, args: &[&str]) -> usize {
        self.calls()
            .iter()
            .filter(|call| starts_with(&call.args, args))
            .count()
    }
}

fn starts_with<S: AsRef<str>>(args: &[String], prefix: &[S]) -> bool {
    args.len() >= prefix.len() && args.iter().zip(prefix).all(|(a, p)| a == p.as_ref())
}

#[async_trait::async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn run(&self, request: RunRequest) -> Result<RunOutput> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let entry = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .rev()
            .find(|(prefix, _)| starts_with(&request.args, prefix.as_slice()))
            .map(|(_, entry)| entry.clone());

        match entry.as_deref() {
            Some(Scripted::Output(output)) => Ok(output.clone()),
            Some(Scripted::SpawnFailure(message)) => {
                Err(agentpty_term::Error::SpawnFailure(message.clone()).into())
            }
            None => Err(agentpty_term::Error::SpawnFailure(format!(
                "no scripted response for {} {}",
                request.program,
                request.args.join(" ")
            ))
            .into()),
        }
    }
}

/// An [`AgentClient`] with queued replies, for exercising callers.
#[derive(Clone, Default)]
pub struct MockAgent {
    version: Arc<Mutex<Option<String>>>,
    replies: Arc<Mutex<VecDeque<std::result::Result<String, String>>>>,
    prompts: Arc<Mutex<Vec<(String, PromptOptions)>>>,
}

impl MockAgent {
    /// Create a mock reporting version `"mock"` and echoing prompts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `version` from [`AgentClient::version`].
    #[must_use]
    pub fn with_version(self, version: &str) -> Self {
        *self.version.lock().unwrap_or_else(|e| e.into_inner()) = Some(version.to_string());
        self
    }

    /// Queue a successful reply.
    pub fn add_reply(&self, reply: &str) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Ok(reply.to_string()));
    }

    /// Queue a failure; it surfaces as a failed command.
    pub fn add_failure(&self, message: &str) {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(Err(message.to_string()));
    }

    /// Prompts received, with their options.
    #[must_use]
    pub fn prompts(&self) -> Vec<(String, PromptOptions)> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait::async_trait]
impl AgentClient for MockAgent {
    async fn version(&self) -> Result<String> {
        Ok(self
            .version
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(|| "mock".to_string()))
    }

    async fn prompt(&self, text: &str, options: &PromptOptions) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((text.to_string(), options.clone()));

        let next = self
            .replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(Error::CommandFailed {
                program: "mock-agent".to_string(),
                code: Some(1),
                output: message,
            }),
            None => Ok(format!("echo: {text}")),
        }
    }
}
