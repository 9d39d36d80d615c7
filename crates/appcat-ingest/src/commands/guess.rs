//! `appcat-ingest guess` and `appcat-ingest guess-near`
//!
//! Both enumerate candidates, confirm each with the lookup endpoint and
//! submit the hits.

use super::{print_report, RunContext};
use crate::checkpoint::Checkpoint;
use crate::enumerate::{read_lines, BruteForce, IdPattern, Neighborhood};
use crate::error::{CliError, Result};
use crate::extract::{CsvColumns, Extractor};
use crate::model::{CandidateIdentifier, ExtractionSource};
use crate::pipeline::Mode;
use crate::progress;
use std::path::{Path, PathBuf};
use tracing::info;

/// Sweep `prefix + n + suffix` for `n` in `[start, end)`
pub async fn run(
    ctx: &RunContext,
    pattern: IdPattern,
    start: u64,
    end: u64,
    checkpoint: Option<PathBuf>,
) -> Result<()> {
    if start < end {
        CandidateIdentifier::new(pattern.render(start))
            .map_err(|e| CliError::usage(format!("{e}; --prefix and --suffix may only use letters, digits, '_' and '.'")))?;
    }

    let config = ctx.config()?;

    let resume_at = match &checkpoint {
        Some(path) => Checkpoint::resume_offset(path, &pattern).map_err(|source| CliError::Checkpoint {
            path: path.display().to_string(),
            source,
        })?,
        None => None,
    };

    let sweep = BruteForce::new(pattern.clone(), start, end);
    let sweep = match resume_at {
        Some(offset) => sweep.resume_from(offset),
        None => sweep,
    };
    let first = sweep.offset();

    info!(
        prefix = %pattern.prefix,
        suffix = %pattern.suffix,
        start,
        end,
        first,
        remaining = sweep.remaining(),
        "Starting sweep"
    );

    let bar = progress::for_items(sweep.remaining(), "", ctx.quiet);
    let driver = ctx.driver(&config, Extractor::new(CsvColumns::default())?, Mode::Resolve, bar)?;
    let report = driver.run(sweep.sources(), first).await;

    if let Some(path) = &checkpoint {
        save_checkpoint(ctx, path, pattern, report.resume_offset)?;
    }

    print_report(&report);
    Ok(())
}

fn save_checkpoint(ctx: &RunContext, path: &Path, pattern: IdPattern, next_offset: u64) -> Result<()> {
    if ctx.dry_run {
        info!(path = %path.display(), next_offset, "Dry run, checkpoint left untouched");
        return Ok(());
    }

    Checkpoint::new(pattern, next_offset)
        .save(path)
        .map_err(|source| CliError::Checkpoint {
            path: path.display().to_string(),
            source,
        })?;
    info!(path = %path.display(), next_offset, "Checkpoint saved");
    Ok(())
}

/// Probe `[n - radius, n + radius]` around each known identifier
pub async fn run_near(
    ctx: &RunContext,
    file: Option<&Path>,
    radius: u64,
    prefix_filter: Option<&str>,
) -> Result<()> {
    let known = ctx.read_input(file, |reader| read_lines(reader)).await?;
    let known: Vec<&str> = known
        .iter()
        .map(|line| line.trim_matches('"'))
        .filter(|id| prefix_filter.map_or(true, |p| id.starts_with(p)))
        .collect();

    let neighborhood = Neighborhood::around(known.iter().copied(), radius);
    info!(
        known = known.len(),
        windows = neighborhood.ranges().count(),
        candidates = neighborhood.len(),
        radius,
        "Built neighbourhood"
    );
    for (prefix, range) in neighborhood.ranges() {
        info!(prefix, start = *range.start(), end = *range.end(), "Window");
    }

    let config = ctx.config()?;
    let bar = progress::for_items(neighborhood.len(), "", ctx.quiet);
    let driver = ctx.driver(&config, Extractor::new(CsvColumns::default())?, Mode::Resolve, bar)?;

    let items = neighborhood
        .candidates()
        .enumerate()
        .map(|(i, candidate)| (i as u64, ExtractionSource::Line(candidate)));
    let report = driver.run(items, 0).await;

    print_report(&report);
    Ok(())
}
