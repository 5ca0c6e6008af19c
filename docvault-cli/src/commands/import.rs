//! Import command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use docvault::{BackupEngine, ImportOutcome};

use super::read_snapshot;
use crate::progress::BarProgress;

/// Run the import command.
///
/// Skipped rows are reported, not treated as failure.
pub async fn run_import(
    engine: &BackupEngine,
    input: &Path,
    format: Option<&str>,
    report: Option<&Path>,
    no_progress: bool,
) -> Result<()> {
    let (format, snapshot) = read_snapshot(input, format)?;
    tracing::info!("Importing {} ({})", input.display(), format);

    for key in engine.unknown_keys(&snapshot) {
        println!("Ignoring collection '{}': not registered", key);
    }

    let progress = (!no_progress).then(|| BarProgress::new(engine.registry().len()));
    let outcome = engine
        .apply_import(&snapshot, progress.as_ref().map(BarProgress::as_dyn))
        .await;

    print_outcome(&outcome);

    if let Some(path) = report {
        let json = serde_json::to_vec_pretty(&outcome)?;
        std::fs::write(path, json)
            .with_context(|| format!("Cannot write report {}", path.display()))?;
        println!("Report written to {}", path.display());
    }

    Ok(())
}

fn print_outcome(outcome: &ImportOutcome) {
    println!();
    println!("{:<20} {:>10} {:>10}", "Collection", "Inserted", "Skipped");
    println!("{}", "-".repeat(42));
    for (key, counts) in outcome.iter() {
        println!("{:<20} {:>10} {:>10}", key, counts.inserted, counts.skipped);
        for error in &counts.errors {
            println!("    {}", error);
        }
        let unreported = counts.skipped.saturating_sub(counts.errors.len() as u64);
        if !counts.errors.is_empty() && unreported > 0 {
            println!("    ... {} more skipped", unreported);
        }
    }
    println!("{}", "-".repeat(42));
    println!(
        "{:<20} {:>10} {:>10}",
        "Total",
        outcome.total_inserted(),
        outcome.total_skipped()
    );
}
