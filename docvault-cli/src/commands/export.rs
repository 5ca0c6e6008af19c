//! Export command implementation.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use docvault::BackupEngine;

use super::resolve_format;
use crate::progress::BarProgress;

/// Run the export command.
pub async fn run_export(
    engine: &BackupEngine,
    format: Option<&str>,
    output: Option<&Path>,
    no_progress: bool,
) -> Result<()> {
    let format = resolve_format(format, output)?;
    tracing::info!("Exporting {} collections as {}", engine.registry().len(), format);

    let progress = (!no_progress && output.is_some())
        .then(|| BarProgress::new(engine.registry().len()));

    let snapshot = engine
        .export_snapshot(progress.as_ref().map(BarProgress::as_dyn))
        .await
        .context("Export failed")?;
    let bytes = engine
        .encode(&snapshot, format)
        .context("Failed to encode snapshot")?;

    match output {
        Some(path) => {
            std::fs::write(path, &bytes)
                .with_context(|| format!("Cannot write output file {}", path.display()))?;

            let records: usize = snapshot.keys().map(|k| snapshot.record_count(k)).sum();
            println!();
            println!("Export complete: {}", path.display());
            println!("  Collections: {}", snapshot.len());
            println!("  Records:     {}", records);
            println!("  Size:        {} bytes ({})", bytes.len(), format.content_type());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).context("Failed to write to stdout")?;
            stdout.flush()?;
        }
    }

    Ok(())
}
