//! appcat-ingest - main entry point

use appcat_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use appcat_ingest::commands::{self, RunContext};
use appcat_ingest::extract::CsvColumns;
use appcat_ingest::runner::RunnerOptions;
use appcat_ingest::{Cli, CliError, Commands};
use clap::Parser;
use std::process;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Console logs go to stderr; stdout carries SQL, dry-run records and the summary
    let defaults = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("appcat-ingest")
        .build();

    // LOG_* variables take precedence
    let log_config = match defaults.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: ignoring LOG_* settings: {e:#}");
            defaults
        },
    };

    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {e}");
            None
        },
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Interrupt received, finishing in-flight submissions. Press Ctrl+C again to abort.");
        on_signal.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Aborted.");
            process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    match execute_command(cli, cancel).await {
        Ok(()) => {},
        // A reader may still be blocked on stdin, so skip the runtime shutdown
        Err(CliError::Interrupted) => {
            eprintln!("{}", CliError::Interrupted);
            drop(_guard);
            process::exit(INTERRUPTED_EXIT_CODE);
        },
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            process::exit(1);
        },
    }
}

/// 128 + SIGINT, as shells report it
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Execute the CLI command
async fn execute_command(cli: Cli, cancel: CancellationToken) -> appcat_ingest::Result<()> {
    let ctx = RunContext {
        service: cli.service,
        dry_run: cli.dry_run,
        quiet: cli.quiet,
        cancel: cancel.clone(),
    };

    match cli.command {
        Commands::Guess {
            prefix,
            suffix,
            start,
            end,
            width,
            checkpoint,
        } => {
            let pattern = appcat_ingest::enumerate::IdPattern::new(prefix, suffix).with_width(width);
            commands::guess::run(&ctx, pattern, start, end, checkpoint).await
        },

        Commands::GuessNear {
            file,
            radius,
            prefix_filter,
        } => commands::guess::run_near(&ctx, file.as_deref(), radius, prefix_filter.as_deref()).await,

        Commands::ImportCsv {
            file,
            link_column,
            date_column,
            note_column,
            verify,
        } => {
            let columns = CsvColumns {
                link: link_column,
                listed_at: date_column,
                note: note_column,
            };
            commands::import::run_csv(&ctx, file.as_deref(), columns, verify).await
        },

        Commands::ImportLines { file, verify } => {
            commands::import::run_lines(&ctx, file.as_deref(), verify).await
        },

        Commands::Sql {
            file,
            template,
            output,
        } => commands::sql::run(&ctx, file.as_deref(), template.as_deref(), &output).await,

        Commands::Watch {
            command,
            dir,
            interval_secs,
            timeout_secs,
            once,
        } => {
            let options = RunnerOptions {
                command,
                dir,
                interval: Duration::from_secs(interval_secs),
                timeout: Duration::from_secs(timeout_secs),
            };
            commands::watch::run(options, once, &cancel).await
        },
    }
}
