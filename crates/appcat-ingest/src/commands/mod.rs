//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod guess;
pub mod import;
pub mod sql;
pub mod watch;

use crate::api::CatalogClient;
use crate::config::IngestConfig;
use crate::error::{CliError, Result};
use crate::extract::Extractor;
use crate::pipeline::{Driver, DriverOptions, Mode, RunReport, RunState};
use crate::progress;
use crate::ServiceArgs;
use anyhow::Context;
use colored::Colorize;
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Settings shared by every pipeline command
#[derive(Debug, Clone)]
pub struct RunContext {
    pub service: ServiceArgs,
    pub dry_run: bool,
    pub quiet: bool,
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn config(&self) -> Result<IngestConfig> {
        self.service.resolve()
    }

    /// Driver wired to the catalog service
    pub fn driver(&self, config: &IngestConfig, extractor: Extractor, mode: Mode, progress: ProgressBar) -> Result<Driver> {
        let client = Arc::new(CatalogClient::new(config)?);
        let options = DriverOptions::from_config(config, mode).dry_run(self.dry_run);
        Ok(Driver::new(extractor, client.clone(), client, options)
            .with_progress(progress)
            .with_cancellation(self.cancel.clone()))
    }

    /// Read and parse `file` (or stdin) on a blocking thread
    ///
    /// Returns [`CliError::Interrupted`] as soon as the run is cancelled,
    /// even while the reader is still blocked on stdin.
    pub async fn read_input<T, F>(&self, file: Option<&Path>, parse: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Box<dyn BufRead + Send>) -> appcat_common::Result<T> + Send + 'static,
    {
        let reader = open_input(file)?;
        let spinner = progress::for_input("Reading input...", self.quiet);
        let reading = tokio::task::spawn_blocking(move || parse(reader));

        let parsed = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CliError::Interrupted),
            joined = reading => match joined.context("input reader stopped unexpectedly") {
                Ok(parsed) => parsed.map_err(CliError::from),
                Err(e) => Err(e.into()),
            },
        };
        spinner.finish_and_clear();
        parsed
    }
}

/// Open `file`, or stdin when no file is given
pub fn open_input(file: Option<&Path>) -> Result<Box<dyn BufRead + Send>> {
    match file {
        Some(path) => {
            let file = File::open(path).map_err(|_| CliError::Input(path.display().to_string()))?;
            Ok(Box::new(BufReader::new(file)))
        },
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

/// Print dry-run records and the final tally
pub fn print_report(report: &RunReport) {
    for record in &report.planned {
        match serde_json::to_string(record) {
            Ok(json) => println!("{} {json}", "would submit".yellow()),
            Err(_) => println!("{} {}", "would submit".yellow(), record.pkg_name),
        }
    }

    let tally = &report.tally;
    let heading = match report.state {
        RunState::Completed => "Run completed".green().bold(),
        RunState::Interrupted => "Run interrupted".yellow().bold(),
    };

    println!();
    println!("{heading}");
    println!("  Processed:  {}", tally.processed);
    println!("  Found:      {}", tally.found);
    println!("  Not found:  {}", tally.not_found);
    println!("  Skipped:    {}", tally.skipped);
    println!("  Unresolved: {}", tally.unresolved);
    println!("  Submitted:  {}", tally.submitted);
    println!("  Failed:     {}", tally.failed);

    if !tally.found_ids.is_empty() {
        println!();
        println!("{}", "Found:".cyan().bold());
        for id in &tally.found_ids {
            println!("  {}", id.green());
        }
    }
    if !tally.unresolved_ids.is_empty() {
        println!();
        println!("{}", "Unresolved (lookup kept failing):".cyan().bold());
        for id in &tally.unresolved_ids {
            println!("  {id}");
        }
    }
    if !tally.failed_ids.is_empty() {
        println!();
        println!("{}", "Failed submissions:".red().bold());
        for id in &tally.failed_ids {
            println!("  {}", id.red());
        }
    }
    if report.state == RunState::Interrupted {
        println!();
        println!("Resume offset: {}", report.resume_offset);
    }
}
