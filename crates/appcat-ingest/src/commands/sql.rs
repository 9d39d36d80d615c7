//! `appcat-ingest sql` command implementation
//!
//! Renders one statement per CSV row, writes them to the output file and
//! echoes them to stdout.

use super::RunContext;
use crate::enumerate::read_rows;
use crate::error::{CliError, Result};
use crate::sql::SqlTemplate;
use std::path::Path;
use tracing::info;

pub async fn run(ctx: &RunContext, file: Option<&Path>, template: Option<&Path>, output: &Path) -> Result<()> {
    let template = match template {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| CliError::usage(format!("cannot read template '{}': {e}", path.display())))?;
            SqlTemplate::new(source)?
        },
        None => SqlTemplate::builtin()?,
    };

    let (header, rows) = ctx.read_input(file, |reader| read_rows(reader, &[])).await?;
    let statements = template.render_all(&header, &rows)?;

    std::fs::write(output, &statements)?;
    print!("{statements}");
    info!(rows = rows.len(), output = %output.display(), "SQL written");
    Ok(())
}
