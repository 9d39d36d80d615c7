//! Records flowing through the ingestion pipeline

use appcat_common::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A string key hypothesized to name a catalog entry.
///
/// Always non-empty and made only of ASCII letters, digits, `_` and `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CandidateIdentifier(String);

impl CandidateIdentifier {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        if is_identifier(&raw) {
            Ok(Self(raw))
        } else {
            Err(CatalogError::InvalidIdentifier(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CandidateIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CandidateIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

pub(crate) fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_identifier_char)
}

/// One unit of raw pipeline input, consumed once per pass
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionSource {
    /// A CSV row keyed by header name
    Row(HashMap<String, String>),
    /// A raw text line (link, bare identifier, or generated candidate)
    Line(String),
}

/// Normalized output of the extractor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub identifier: CandidateIdentifier,
    pub listed_at: Option<String>,
    pub contributor: Option<String>,
    pub note: Option<String>,
}

impl ExtractedRecord {
    pub fn bare(identifier: CandidateIdentifier) -> Self {
        Self {
            identifier,
            listed_at: None,
            contributor: None,
            note: None,
        }
    }
}

/// Outcome of resolving one identifier against the lookup authority
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResult {
    Found(serde_json::Value),
    NotFound,
    TransientError(String),
}

impl LookupResult {
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupResult::TransientError(_))
    }
}

/// Attribution attached to a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Body of `POST /api/submit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub pkg_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listed_at: Option<String>,
    pub comment: Comment,
}

impl SubmissionRecord {
    /// Build the submission for an extracted record.
    ///
    /// The extracted contributor wins over `default_user`; an empty note is
    /// omitted from the comment.
    pub fn from_extracted(record: &ExtractedRecord, default_user: &str) -> Self {
        Self {
            pkg_name: record.identifier.to_string(),
            listed_at: record.listed_at.clone(),
            comment: Comment {
                user: record
                    .contributor
                    .clone()
                    .unwrap_or_else(|| default_user.to_string()),
                note: record.note.clone().filter(|n| !n.trim().is_empty()),
            },
        }
    }
}

/// Result of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Ok,
    Failed(String),
}
