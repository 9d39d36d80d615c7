//! Field extraction from noisy listing data
//!
//! Turns a CSV row or a raw line into an [`ExtractedRecord`]. Only a
//! missing identifier invalidates a source; every other field degrades to
//! `None` and the submitter falls back to the default attribution.

use crate::model::{is_identifier, CandidateIdentifier, ExtractedRecord, ExtractionSource};
use appcat_common::{CatalogError, Result};
use chrono::{FixedOffset, NaiveDate};
use regex::Regex;

/// Marker preceding the identifier inside a listing link
pub const IDENTIFIER_MARKER: &str = "id=";

/// A note only names a contributor when it contains this token
pub const PROVIDED_MARKER: &str = "提供";

/// Input format of spreadsheet dates
pub const SOURCE_DATE_FORMAT: &str = "%Y/%m/%d";

/// UTC+8, the offset every listing date is pinned to
const LISTING_OFFSET_SECS: i32 = 8 * 3600;

/// Default CSV column names
pub const DEFAULT_LINK_COLUMN: &str = "访问链接";
pub const DEFAULT_DATE_COLUMN: &str = "上架时间";
pub const DEFAULT_NOTE_COLUMN: &str = "备注";

/// Which CSV columns hold which field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvColumns {
    pub link: String,
    pub listed_at: String,
    pub note: String,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            link: DEFAULT_LINK_COLUMN.to_string(),
            listed_at: DEFAULT_DATE_COLUMN.to_string(),
            note: DEFAULT_NOTE_COLUMN.to_string(),
        }
    }
}

impl CsvColumns {
    /// Only the link column is mandatory; date and note may be absent.
    pub fn validate_header<'a>(&self, header: impl IntoIterator<Item = &'a str> + Clone) -> Result<()> {
        if header.clone().into_iter().any(|h| h == self.link) {
            Ok(())
        } else {
            Err(CatalogError::missing_column(&self.link, header))
        }
    }
}

/// Compiled extraction rules
#[derive(Debug, Clone)]
pub struct Extractor {
    columns: CsvColumns,
    identifier: Regex,
    contributor: Regex,
    hex_suffix: Regex,
    relisted_suffix: Regex,
}

impl Extractor {
    pub fn new(columns: CsvColumns) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| CatalogError::Parse(format!("bad pattern {pattern}: {e}")))
        };

        Ok(Self {
            columns,
            identifier: compile(r"id=([A-Za-z0-9_.]+)")?,
            contributor: compile(r"(MeoW友|群友|酷友)\s(.*?)(?:\s提供|$|\s，)")?,
            hex_suffix: compile(r"[a-f0-9]{6}\*\*$")?,
            relisted_suffix: compile(r"重新上架$")?,
        })
    }

    /// Extract a record, or `None` when the source carries no identifier.
    pub fn extract(&self, source: &ExtractionSource) -> Option<ExtractedRecord> {
        match source {
            ExtractionSource::Row(row) => {
                let link = row.get(&self.columns.link)?;
                let identifier = self.identifier_from_link(link)?;
                let note = row
                    .get(&self.columns.note)
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty());
                let contributor = note
                    .as_deref()
                    .filter(|n| n.contains(PROVIDED_MARKER))
                    .and_then(|n| self.contributor(n));

                Some(ExtractedRecord {
                    identifier,
                    listed_at: row
                        .get(&self.columns.listed_at)
                        .and_then(|d| normalize_listed_at(d)),
                    contributor,
                    note,
                })
            },
            ExtractionSource::Line(line) => self.identifier_from_line(line).map(ExtractedRecord::bare),
        }
    }

    /// Identifier following the `id=` marker of a listing link
    pub fn identifier_from_link(&self, link: &str) -> Option<CandidateIdentifier> {
        let captures = self.identifier.captures(link)?;
        CandidateIdentifier::new(captures.get(1)?.as_str()).ok()
    }

    /// A line is either a link carrying `id=` or a bare identifier.
    pub fn identifier_from_line(&self, line: &str) -> Option<CandidateIdentifier> {
        let line = line.trim().trim_matches('"').trim();
        if line.contains(IDENTIFIER_MARKER) {
            self.identifier_from_link(line)
        } else if is_identifier(line) {
            CandidateIdentifier::new(line).ok()
        } else {
            None
        }
    }

    /// Contributor named in a free-text note, e.g. `群友 张三`.
    pub fn contributor(&self, note: &str) -> Option<String> {
        let captures = self.contributor.captures(note)?;
        let kind = captures.get(1)?.as_str();
        let name = captures.get(2)?.as_str().trim();
        let name = self.hex_suffix.replace(name, "");
        let name = self.relisted_suffix.replace(name.trim(), "");
        let name = name.trim();

        if name.is_empty() {
            None
        } else {
            Some(format!("{kind} {name}"))
        }
    }
}

/// Pin a `YYYY/MM/DD` date to noon UTC+8; pass anything else through.
pub fn normalize_listed_at(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let pinned = NaiveDate::parse_from_str(raw, SOURCE_DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(12, 0, 0))
        .zip(FixedOffset::east_opt(LISTING_OFFSET_SECS))
        .and_then(|(noon, offset)| noon.and_local_timezone(offset).single())
        .map(|at| at.format("%Y-%m-%d %H:%M:%S%z").to_string());

    Some(pinned.unwrap_or_else(|| raw.to_string()))
}
