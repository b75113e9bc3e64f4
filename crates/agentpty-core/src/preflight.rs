//! Login and version preflight
//!
//! Before the first session or prompt the agent CLI must report a logged-in
//! account. Its version is compared against the one this crate was tested
//! with; a mismatch only warns. A passed check is remembered by a
//! [`PreflightGate`], which is process-wide by default.

use crate::error::{Error, Result};
use crate::runner::{ProcessRunner, RunRequest};
use agentpty_term::strip_ansi_escapes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

/// Marker `<program> status` prints for a logged-in account.
const LOGGED_IN_MARKER: &str = "Logged in";

static GLOBAL_GATE: LazyLock<PreflightGate> = LazyLock::new(PreflightGate::new);

/// Remembers a successful preflight.
#[derive(Debug, Clone, Default)]
pub struct PreflightGate {
    passed: Arc<AtomicBool>,
}

impl PreflightGate {
    /// A fresh gate that has not passed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The gate shared by the whole process.
    #[must_use]
    pub fn global() -> PreflightGate {
        GLOBAL_GATE.clone()
    }

    /// Whether a preflight has succeeded through this gate.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.passed.load(Ordering::SeqCst)
    }
}

/// Run the preflight unless `gate` has already passed.
///
/// Failures are wrapped in [`Error::Setup`] and are not remembered, so the
/// next call checks again.
pub async fn ensure_ready(
    runner: &dyn ProcessRunner,
    program: &str,
    compatible_version: &str,
    gate: &PreflightGate,
) -> Result<()> {
    if gate.is_passed() {
        return Ok(());
    }

    check(runner, program, compatible_version)
        .await
        .map_err(|e| Error::Setup {
            program: program.to_string(),
            source: Box::new(e),
        })?;

    gate.passed.store(true, Ordering::SeqCst);
    debug!(program, "Agent preflight passed");
    Ok(())
}

async fn check(runner: &dyn ProcessRunner, program: &str, compatible_version: &str) -> Result<()> {
    let status = runner.run(RunRequest::new(program).args(["status"])).await?;
    if !status.combined().contains(LOGGED_IN_MARKER) {
        return Err(Error::NotLoggedIn {
            program: program.to_string(),
        });
    }

    let current = version(runner, program).await?;
    if current != compatible_version {
        warn!(
            tested = %short_version(compatible_version),
            current = %short_version(&current),
            "{} version differs from the tested release; behaviour may not match",
            program
        );
    }
    Ok(())
}

/// `<program> --version`, with escapes stripped and whitespace trimmed.
pub async fn version(runner: &dyn ProcessRunner, program: &str) -> Result<String> {
    let output = runner.run(RunRequest::new(program).args(["--version"])).await?;
    if !output.success() {
        return Err(Error::CommandFailed {
            program: program.to_string(),
            code: output.exit_code,
            output: output.failure_output().to_string(),
        });
    }
    Ok(strip_ansi_escapes(&output.stdout).trim().to_string())
}

/// First eight characters, enough to tell release dates apart.
fn short_version(version: &str) -> String {
    let short: String = version.chars().take(8).collect();
    format!("{}...", short)
}
