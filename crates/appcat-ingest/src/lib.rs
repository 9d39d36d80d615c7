//! appcat ingestion library
//!
//! Discovers and registers application identifiers with an app-catalog
//! service.
//!
//! # Overview
//!
//! - **Guessing**: enumerate candidate identifiers from a numeric pattern
//!   (`appcat-ingest guess`) or around known identifiers
//!   (`appcat-ingest guess-near`), confirm each against the lookup endpoint
//!   and submit the hits
//! - **Importing**: extract identifiers, listing dates and contributors
//!   from spreadsheet exports (`import-csv`) or link lists
//!   (`import-lines`) and submit them
//! - **SQL**: render one statement per CSV row from a template (`sql`)
//! - **Scheduling**: re-run a command on a fixed interval (`watch`)
//!
//! # Example
//!
//! ```no_run
//! use appcat_ingest::api::CatalogClient;
//! use appcat_ingest::config::IngestConfig;
//! use appcat_ingest::enumerate::{BruteForce, IdPattern};
//! use appcat_ingest::extract::{CsvColumns, Extractor};
//! use appcat_ingest::pipeline::{Driver, DriverOptions, Mode};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let client = Arc::new(CatalogClient::new(&config)?);
//!     let driver = Driver::new(
//!         Extractor::new(CsvColumns::default())?,
//!         client.clone(),
//!         client,
//!         DriverOptions::from_config(&config, Mode::Resolve),
//!     );
//!
//!     let sweep = BruteForce::new(IdPattern::new("com.appbyme.app", ".hm"), 7000, 8000);
//!     let report = driver.run(sweep.sources(), 7000).await;
//!     println!("found {} identifiers", report.tally.found);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod checkpoint;
pub mod commands;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod extract;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod runner;
pub mod sql;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Args, Parser, Subcommand};
use config::IngestConfig;
use std::path::PathBuf;

/// appcat-ingest - discover and register app-catalog identifiers
#[derive(Parser, Debug)]
#[command(name = "appcat-ingest")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Extract and resolve, but print records instead of submitting them
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Hide the progress bar
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Catalog service settings; each flag overrides its `APPCAT_*` variable
#[derive(Args, Debug, Clone, Default)]
pub struct ServiceArgs {
    /// Catalog service base URL
    #[arg(long, env = "APPCAT_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Resource segment of the lookup endpoint
    #[arg(long, env = "APPCAT_LOOKUP_RESOURCE", global = true)]
    pub resource: Option<String>,

    /// Attribution for records that name no contributor
    #[arg(long, env = "APPCAT_DEFAULT_USER", global = true)]
    pub user: Option<String>,

    /// Maximum items in flight
    #[arg(long, env = "APPCAT_CONCURRENCY", global = true)]
    pub concurrency: Option<usize>,

    /// Minimum delay between two requests, in milliseconds
    #[arg(long, env = "APPCAT_MIN_INTERVAL_MS", global = true)]
    pub min_interval_ms: Option<u64>,

    /// Retries for transient lookup errors
    #[arg(long, env = "APPCAT_MAX_RETRIES", global = true)]
    pub max_retries: Option<u32>,
}

impl ServiceArgs {
    /// Environment configuration with command-line overrides applied
    pub fn resolve(&self) -> Result<IngestConfig> {
        let mut config = IngestConfig::from_env()?;

        if let Some(url) = &self.api_url {
            config.api_url = url.clone();
        }
        if let Some(resource) = &self.resource {
            config.lookup_resource = resource.clone();
        }
        if let Some(user) = &self.user {
            config.default_user = user.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
        if let Some(ms) = self.min_interval_ms {
            config.min_interval_ms = ms;
        }
        if let Some(retries) = self.max_retries {
            config.max_retries = retries;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sweep a numeric range of candidate identifiers
    Guess {
        /// Text before the number
        #[arg(long)]
        prefix: String,

        /// Text after the number
        #[arg(long, default_value = "")]
        suffix: String,

        /// First number (inclusive)
        #[arg(long)]
        start: u64,

        /// Last number (exclusive)
        #[arg(long)]
        end: u64,

        /// Zero-pad the number to this many digits (0 = no padding)
        #[arg(long, default_value_t = 0)]
        width: usize,

        /// Resume from and record progress in this file
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },

    /// Probe numeric neighbours of known identifiers
    GuessNear {
        /// Known identifiers, one per line (defaults to stdin)
        file: Option<PathBuf>,

        /// How far to look on either side of each known number
        #[arg(long, default_value_t = enumerate::DEFAULT_RADIUS)]
        radius: u64,

        /// Only use known identifiers starting with this text
        #[arg(long)]
        prefix_filter: Option<String>,
    },

    /// Import a spreadsheet export
    ImportCsv {
        /// CSV file (defaults to stdin)
        file: Option<PathBuf>,

        /// Column holding the listing link
        #[arg(long, default_value = extract::DEFAULT_LINK_COLUMN)]
        link_column: String,

        /// Column holding the listing date
        #[arg(long, default_value = extract::DEFAULT_DATE_COLUMN)]
        date_column: String,

        /// Column holding the free-text note
        #[arg(long, default_value = extract::DEFAULT_NOTE_COLUMN)]
        note_column: String,

        /// Confirm each identifier with the lookup endpoint first
        #[arg(long)]
        verify: bool,
    },

    /// Import links or bare identifiers, one per line
    ImportLines {
        /// Text file (defaults to stdin)
        file: Option<PathBuf>,

        /// Confirm each identifier with the lookup endpoint first
        #[arg(long)]
        verify: bool,
    },

    /// Render SQL statements from CSV rows
    Sql {
        /// CSV file (defaults to stdin)
        file: Option<PathBuf>,

        /// Template file with {column} placeholders
        #[arg(long)]
        template: Option<PathBuf>,

        /// Output file
        #[arg(short, long, default_value = sql::DEFAULT_OUTPUT)]
        output: PathBuf,
    },

    /// Re-run a command on a fixed interval
    Watch {
        /// Shell command to run
        #[arg(long, default_value = runner::DEFAULT_COMMAND)]
        command: String,

        /// Working directory for the command
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Seconds between runs
        #[arg(long, default_value_t = runner::DEFAULT_INTERVAL_SECS)]
        interval_secs: u64,

        /// Seconds before a run is killed
        #[arg(long, default_value_t = runner::DEFAULT_TIMEOUT_SECS)]
        timeout_secs: u64,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_guess() {
        let cli = Cli::try_parse_from([
            "appcat-ingest",
            "guess",
            "--prefix",
            "C576588020785",
            "--start",
            "6366000",
            "--end",
            "6367000",
            "--width",
            "7",
            "--dry-run",
        ])
        .unwrap();

        assert!(cli.dry_run);
        match cli.command {
            Commands::Guess { prefix, suffix, start, end, width, checkpoint } => {
                assert_eq!(prefix, "C576588020785");
                assert_eq!(suffix, "");
                assert_eq!((start, end, width), (6366000, 6367000, 7));
                assert!(checkpoint.is_none());
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_import_csv_defaults() {
        let cli = Cli::try_parse_from(["appcat-ingest", "import-csv", "data.csv"]).unwrap();
        match cli.command {
            Commands::ImportCsv { file, link_column, verify, .. } => {
                assert_eq!(file, Some(PathBuf::from("data.csv")));
                assert_eq!(link_column, "访问链接");
                assert!(!verify);
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_service_flags_override() {
        let args = ServiceArgs {
            api_url: Some("http://catalog.test".to_string()),
            concurrency: Some(4),
            ..Default::default()
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.api_url, "http://catalog.test");
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_service_flags_are_validated() {
        let args = ServiceArgs {
            concurrency: Some(0),
            ..Default::default()
        };
        assert!(matches!(args.resolve(), Err(CliError::Config(_))));
    }
}
