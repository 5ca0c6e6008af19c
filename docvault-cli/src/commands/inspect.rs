use std::path::Path;

use anyhow::Result;
use docvault::BackupEngine;

use super::read_snapshot;

/// Decode a snapshot file and print what an import would see.
pub fn run_inspect(engine: &BackupEngine, input: &Path, format: Option<&str>) -> Result<()> {
    let (format, snapshot) = read_snapshot(input, format)?;
    let registry = engine.registry();

    println!();
    println!("Snapshot: {} ({}, {} collections)", input.display(), format, snapshot.len());
    println!("{}", "-".repeat(60));

    for key in registry.keys() {
        let note = match snapshot.get(key) {
            None => " (missing)",
            Some(value) if !value.is_array() => " (not a list, imports nothing)",
            Some(_) => "",
        };
        println!("  {:<20} {:>8} records{}", key, snapshot.record_count(key), note);
    }

    let unknown = engine.unknown_keys(&snapshot);
    if !unknown.is_empty() {
        println!();
        println!("Ignored on import (not registered):");
        for key in unknown {
            println!("  {:<20} {:>8} records", key, snapshot.record_count(key));
        }
    }

    Ok(())
}
