//! Error types shared by the appcat crates

use thiserror::Error;

/// Result type alias for appcat operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors that stop a pipeline pass outright.
///
/// Per-record problems (an unparseable link, a lookup miss, a rejected
/// submission) are never raised through this type; they travel as values
/// and end up in the run tally.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing column '{column}' in CSV header (found: {found})")]
    MissingColumn { column: String, found: String },

    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a template error
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }

    /// Create a missing column error from the header that was actually read
    pub fn missing_column<'a>(
        column: impl Into<String>,
        header: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self::MissingColumn {
            column: column.into(),
            found: header.into_iter().collect::<Vec<_>>().join(", "),
        }
    }
}
