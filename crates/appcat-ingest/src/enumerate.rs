//! Candidate enumeration
//!
//! Every enumerator is a plain [`Iterator`]: lazy, finite and restartable.
//! Items carry their offset in the batch so a driver that stops early can
//! report where to pick up again.

use crate::model::ExtractionSource;
use appcat_common::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::BufRead;
use std::ops::RangeInclusive;

/// How a numeric candidate is spelled: `prefix + n + suffix`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdPattern {
    pub prefix: String,
    #[serde(default)]
    pub suffix: String,
    /// Zero-pad `n` to this many digits (0 = no padding)
    #[serde(default)]
    pub width: usize,
}

impl IdPattern {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
            width: 0,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn render(&self, n: u64) -> String {
        format!("{}{:0width$}{}", self.prefix, n, self.suffix, width = self.width)
    }
}

/// Ascending enumeration of `pattern(n)` for `n` in `[start, end)`
#[derive(Debug, Clone)]
pub struct BruteForce {
    pattern: IdPattern,
    start: u64,
    end: u64,
    next: u64,
}

impl BruteForce {
    pub fn new(pattern: IdPattern, start: u64, end: u64) -> Self {
        Self {
            pattern,
            start,
            end,
            next: start,
        }
    }

    /// The same enumeration, positioned at `offset` (clamped into range)
    pub fn resume_from(mut self, offset: u64) -> Self {
        self.next = offset.clamp(self.start, self.end.max(self.start));
        self
    }

    /// Number that the next call to `next()` will render
    pub fn offset(&self) -> u64 {
        self.next
    }

    /// Items remaining from the current offset
    pub fn remaining(&self) -> u64 {
        self.end.saturating_sub(self.next)
    }

    /// Yield `(n, source)` pairs so the driver can track resume offsets.
    pub fn sources(self) -> impl Iterator<Item = (u64, ExtractionSource)> + Send {
        let pattern = self.pattern.clone();
        (self.next..self.end.max(self.next)).map(move |n| (n, ExtractionSource::Line(pattern.render(n))))
    }
}

impl Iterator for BruteForce {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.next >= self.end {
            return None;
        }
        let candidate = self.pattern.render(self.next);
        self.next += 1;
        Some(candidate)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

/// Split an identifier into its leading non-digit prefix and the digits
/// that follow, e.g. `C5765880207856366961` -> `("C", 5765880207856366961)`.
///
/// Anything after the last digit is dropped; identifiers without digits or
/// with a numeric part that overflows `u64` yield `None`.
pub fn split_numeric(identifier: &str) -> Option<(String, u64)> {
    let first = identifier.find(|c: char| c.is_ascii_digit())?;
    let last = identifier.rfind(|c: char| c.is_ascii_digit())?;
    let digits = &identifier[first..=last];
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits
        .parse()
        .ok()
        .map(|n| (identifier[..first].to_string(), n))
}

/// Default half-width of the window probed around a known identifier
pub const DEFAULT_RADIUS: u64 = 1000;

/// Merged numeric windows around already-known identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighborhood {
    ranges: BTreeMap<String, Vec<RangeInclusive<u64>>>,
}

impl Neighborhood {
    /// Expand every known identifier to `[n - radius, n + radius]` and merge
    /// overlapping or adjacent windows per prefix.
    pub fn around<'a>(known: impl IntoIterator<Item = &'a str>, radius: u64) -> Self {
        let mut by_prefix: BTreeMap<String, Vec<RangeInclusive<u64>>> = BTreeMap::new();
        for id in known {
            if let Some((prefix, n)) = split_numeric(id) {
                by_prefix
                    .entry(prefix)
                    .or_default()
                    .push(n.saturating_sub(radius)..=n.saturating_add(radius));
            }
        }

        let ranges = by_prefix
            .into_iter()
            .map(|(prefix, ranges)| (prefix, merge_ranges(ranges)))
            .collect();
        Self { ranges }
    }

    pub fn ranges(&self) -> impl Iterator<Item = (&str, &RangeInclusive<u64>)> {
        self.ranges
            .iter()
            .flat_map(|(prefix, ranges)| ranges.iter().map(move |r| (prefix.as_str(), r)))
    }

    /// Candidate count, saturating at `u64::MAX`
    pub fn len(&self) -> u64 {
        self.ranges()
            .map(|(_, r)| r.end().saturating_sub(*r.start()).saturating_add(1))
            .fold(0, u64::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Candidates in prefix order, ascending within each window.
    pub fn candidates(self) -> impl Iterator<Item = String> + Send {
        self.ranges.into_iter().flat_map(|(prefix, ranges)| {
            ranges
                .into_iter()
                .flat_map(move |r| {
                    let prefix = prefix.clone();
                    r.map(move |n| format!("{prefix}{n}"))
                })
        })
    }
}

fn merge_ranges(mut ranges: Vec<RangeInclusive<u64>>) -> Vec<RangeInclusive<u64>> {
    ranges.sort_by_key(|r| *r.start());
    let mut merged: Vec<RangeInclusive<u64>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if *range.start() <= last.end().saturating_add(1) => {
                if range.end() > last.end() {
                    *last = *last.start()..=*range.end();
                }
            },
            _ => merged.push(range),
        }
    }
    merged
}

/// Non-blank lines, trimmed, in input order
pub fn read_lines(reader: impl BufRead) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

/// Header-driven CSV rows, keyed by column name.
///
/// Reads the whole file up front so a malformed file fails before anything
/// is submitted. `required` columns must appear in the header.
pub fn read_rows(
    reader: impl std::io::Read,
    required: &[&str],
) -> Result<(Vec<String>, Vec<std::collections::HashMap<String, String>>)> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let header: Vec<String> = csv
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    for column in required {
        if !header.iter().any(|h| h == column) {
            return Err(CatalogError::missing_column(*column, header.iter().map(String::as_str)));
        }
    }

    let mut rows = Vec::new();
    for record in csv.records() {
        let record = record?;
        rows.push(
            header
                .iter()
                .cloned()
                .zip(record.iter().map(str::to_string))
                .collect(),
        );
    }
    Ok((header, rows))
}
