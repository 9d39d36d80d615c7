//! appcat Common Library
//!
//! Shared error handling and logging for the appcat workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`CatalogError`] and the [`Result`] alias used by
//!   every fatal path of the ingestion pipeline
//! - **Logging**: centralized `tracing` subscriber setup in [`logging`]
//!
//! # Example
//!
//! ```no_run
//! use appcat_common::{CatalogError, Result};
//!
//! fn read_source(path: &str) -> Result<String> {
//!     let text = std::fs::read_to_string(path)?;
//!     if text.trim().is_empty() {
//!         return Err(CatalogError::config(format!("{path} is empty")));
//!     }
//!     Ok(text)
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CatalogError, Result};
