//! Periodic command runner
//!
//! Re-runs a shell command on a fixed interval, each run bounded by a
//! timeout. A failed, timed-out or unspawnable run is logged and the loop
//! carries on; only cancellation ends it.
//!
//! On unix each run leads its own process group, so a timeout or
//! cancellation also stops whatever the command started in the background.

use chrono::Local;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const DEFAULT_COMMAND: &str = "cargo run --release";
pub const DEFAULT_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10 * 60;

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Shell command line, run through `sh -c` (`cmd /C` on Windows)
    pub command: String,
    pub dir: PathBuf,
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            dir: PathBuf::from("."),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// How a single run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exit code; `None` when the child was killed by a signal
    Exited(Option<i32>),
    TimedOut,
    SpawnFailed(String),
    Cancelled,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Exited(Some(0)))
    }
}

fn shell(command: &str) -> Command {
    let mut cmd = if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C");
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c");
        cmd
    };
    cmd.arg(command);
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

/// Kill the child together with everything in its process group
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // A negative pid addresses the group the child leads
        let group = format!("-{pid}");
        match Command::new("kill").args(["-KILL", "--", &group]).status().await {
            Ok(status) if !status.success() => warn!(pgid = pid, "kill reported failure for process group"),
            Err(e) => warn!(pgid = pid, error = %e, "Failed to signal process group"),
            Ok(_) => {},
        }
    }

    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill command");
    }
}

/// Run the command once. The child is killed on timeout or cancellation.
pub async fn run_once(options: &RunnerOptions, cancel: &CancellationToken) -> RunOutcome {
    info!(command = %options.command, dir = %options.dir.display(), "Starting run");
    let started = Instant::now();

    let mut child = match shell(&options.command)
        .current_dir(&options.dir)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            error!(command = %options.command, error = %e, "Failed to spawn command");
            return RunOutcome::SpawnFailed(e.to_string());
        },
    };

    let outcome = tokio::select! {
        status = child.wait() => match status {
            Ok(status) => RunOutcome::Exited(status.code()),
            Err(e) => {
                error!(error = %e, "Failed to wait for command");
                RunOutcome::SpawnFailed(e.to_string())
            },
        },
        _ = tokio::time::sleep(options.timeout) => RunOutcome::TimedOut,
        _ = cancel.cancelled() => RunOutcome::Cancelled,
    };

    if matches!(outcome, RunOutcome::TimedOut | RunOutcome::Cancelled) {
        terminate(&mut child).await;
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &outcome {
        RunOutcome::Exited(Some(0)) => info!(elapsed_ms, "Run finished"),
        RunOutcome::Exited(code) => warn!(elapsed_ms, code = ?code, "Run exited with failure"),
        RunOutcome::TimedOut => {
            warn!(timeout_secs = options.timeout.as_secs(), "Run timed out and was killed")
        },
        RunOutcome::Cancelled => info!(elapsed_ms, "Run cancelled"),
        RunOutcome::SpawnFailed(_) => {},
    }

    outcome
}

/// Run every `interval` until cancelled, or a single cycle with `once`.
///
/// Returns the number of runs started.
pub async fn run_periodically(options: &RunnerOptions, once: bool, cancel: &CancellationToken) -> u64 {
    let mut runs = 0;

    loop {
        let outcome = run_once(options, cancel).await;
        runs += 1;

        if once || outcome == RunOutcome::Cancelled {
            break;
        }

        let next = chrono::Duration::from_std(options.interval)
            .ok()
            .and_then(|d| Local::now().checked_add_signed(d));
        if let Some(next) = next {
            info!(next_run = %next.format("%Y-%m-%d %H:%M:%S"), "Waiting for next run");
        }

        tokio::select! {
            _ = tokio::time::sleep(options.interval) => {},
            _ = cancel.cancelled() => break,
        }
    }

    info!(runs, "Runner stopped");
    runs
}
