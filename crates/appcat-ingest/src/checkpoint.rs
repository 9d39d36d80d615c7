//! Resume state for brute-force guessing
//!
//! A checkpoint remembers the lowest offset of a pattern that has not been
//! completed, so an interrupted sweep continues where it stopped.

use crate::enumerate::IdPattern;
use appcat_common::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Checkpoint file contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    /// Pattern the offset belongs to
    pub pattern: IdPattern,

    /// First offset a resumed run must process
    pub next_offset: u64,

    /// When the checkpoint was last written
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(pattern: IdPattern, next_offset: u64) -> Self {
        Self {
            pattern,
            next_offset,
            updated_at: Utc::now(),
        }
    }

    /// Load checkpoint from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let checkpoint = serde_json::from_str(&content)?;
        Ok(checkpoint)
    }

    /// Save checkpoint to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Offset to resume `pattern` from, if `path` holds a checkpoint for it.
    ///
    /// A missing file means a fresh start. A checkpoint for another pattern
    /// is ignored and will be overwritten at the end of the run.
    pub fn resume_offset(path: impl AsRef<Path>, pattern: &IdPattern) -> Result<Option<u64>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let checkpoint = Self::load(path)?;
        if &checkpoint.pattern != pattern {
            warn!(
                path = %path.display(),
                saved = ?checkpoint.pattern,
                "Checkpoint belongs to another pattern, starting fresh"
            );
            return Ok(None);
        }

        info!(
            path = %path.display(),
            next_offset = checkpoint.next_offset,
            updated_at = %checkpoint.updated_at,
            "Resuming from checkpoint"
        );
        Ok(Some(checkpoint.next_offset))
    }
}
