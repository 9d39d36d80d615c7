//! Error types for the appcat-ingest CLI
//!
//! Every message ends with a hint on how to fix the problem.

use appcat_common::CatalogError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Fatal errors surfaced to the operator
#[derive(Error, Debug)]
pub enum CliError {
    /// Input file could not be opened
    #[error("Cannot read input '{0}'. Verify the file path exists, or pipe the data on stdin.")]
    Input(String),

    /// CSV header lacks a required column
    #[error("{0}. Pass the right column with --link-column, --date-column or --note-column.")]
    Columns(CatalogError),

    /// SQL template is unusable for this CSV
    #[error("{0}. Check the placeholders in --template against the CSV header.")]
    Template(CatalogError),

    /// Checkpoint file is unreadable
    #[error("Invalid checkpoint '{path}': {source}. Delete the file to start the sweep from the beginning.")]
    Checkpoint { path: String, source: CatalogError },

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check the APPCAT_* environment variables and command-line flags.")]
    Config(String),

    /// Range arguments are unusable
    #[error("Invalid arguments: {0}")]
    Usage(String),

    /// Any other library error
    #[error(transparent)]
    Catalog(CatalogError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// Run was cancelled before any work started
    #[error("Interrupted before the run started. Nothing was submitted.")]
    Interrupted,

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }
}

impl From<CatalogError> for CliError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::MissingColumn { .. } => Self::Columns(err),
            CatalogError::Template(_) => Self::Template(err),
            CatalogError::Config(msg) => Self::Config(msg),
            other => Self::Catalog(other),
        }
    }
}
