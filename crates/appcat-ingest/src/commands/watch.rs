//! `appcat-ingest watch` command implementation

use crate::error::{CliError, Result};
use crate::runner::{run_periodically, RunnerOptions};
use tokio_util::sync::CancellationToken;

pub async fn run(options: RunnerOptions, once: bool, cancel: &CancellationToken) -> Result<()> {
    if options.interval.is_zero() && !once {
        return Err(CliError::usage("--interval-secs must be greater than 0"));
    }
    if options.timeout.is_zero() {
        return Err(CliError::usage("--timeout-secs must be greater than 0"));
    }
    if !options.dir.is_dir() {
        return Err(CliError::usage(format!(
            "working directory '{}' does not exist",
            options.dir.display()
        )));
    }

    println!(
        "Running '{}' every {}s (timeout {}s). Press Ctrl+C to stop.",
        options.command,
        options.interval.as_secs(),
        options.timeout.as_secs()
    );
    let runs = run_periodically(&options, once, cancel).await;
    println!("Stopped after {runs} run(s).");
    Ok(())
}
