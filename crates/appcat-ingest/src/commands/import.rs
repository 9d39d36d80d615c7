//! `appcat-ingest import-csv` and `appcat-ingest import-lines`

use super::{print_report, RunContext};
use crate::enumerate::{read_lines, read_rows};
use crate::error::Result;
use crate::extract::{CsvColumns, Extractor};
use crate::model::ExtractionSource;
use crate::pipeline::Mode;
use crate::progress;
use std::path::Path;
use tracing::info;

fn mode(verify: bool) -> Mode {
    if verify {
        Mode::Resolve
    } else {
        Mode::Direct
    }
}

/// Import a spreadsheet export, one record per row
pub async fn run_csv(ctx: &RunContext, file: Option<&Path>, columns: CsvColumns, verify: bool) -> Result<()> {
    let (header, rows) = ctx.read_input(file, |reader| read_rows(reader, &[])).await?;
    columns.validate_header(header.iter().map(String::as_str))?;
    info!(rows = rows.len(), columns = header.len(), verify, "Read CSV input");

    let config = ctx.config()?;
    let bar = progress::for_items(rows.len() as u64, "", ctx.quiet);
    let driver = ctx.driver(&config, Extractor::new(columns)?, mode(verify), bar)?;

    let items = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| (i as u64, ExtractionSource::Row(row)));
    let report = driver.run(items, 0).await;

    print_report(&report);
    Ok(())
}

/// Import links or bare identifiers, one per line
pub async fn run_lines(ctx: &RunContext, file: Option<&Path>, verify: bool) -> Result<()> {
    let lines = ctx.read_input(file, |reader| read_lines(reader)).await?;
    info!(lines = lines.len(), verify, "Read line input");

    let config = ctx.config()?;
    let bar = progress::for_items(lines.len() as u64, "", ctx.quiet);
    let driver = ctx.driver(&config, Extractor::new(CsvColumns::default())?, mode(verify), bar)?;

    let items = lines
        .into_iter()
        .enumerate()
        .map(|(i, line)| (i as u64, ExtractionSource::Line(line)));
    let report = driver.run(items, 0).await;

    print_report(&report);
    Ok(())
}
