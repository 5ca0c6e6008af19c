pub mod collections;
pub mod export;
pub mod import;
pub mod init_config;
pub mod inspect;

pub use collections::run_collections;
pub use export::run_export;
pub use import::run_import;
pub use init_config::run_init_config;
pub use inspect::run_inspect;

use std::path::Path;

use anyhow::{Context, Result};
use docvault::Format;

/// Pick the snapshot format: explicit flag, else the file extension, else JSON.
pub(crate) fn resolve_format(explicit: Option<&str>, path: Option<&Path>) -> Result<Format> {
    match (explicit, path) {
        (Some(name), _) => Ok(name.parse()?),
        (None, Some(path)) => Format::from_path(path)
            .with_context(|| format!("Use --format to set the format of {}", path.display())),
        (None, None) => Ok(Format::Structured),
    }
}

/// Read and decode a snapshot file.
pub(crate) fn read_snapshot(
    input: &Path,
    format: Option<&str>,
) -> Result<(Format, docvault::Snapshot)> {
    let format = resolve_format(format, Some(input))?;
    let bytes = std::fs::read(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let snapshot = format
        .decode(&bytes)
        .with_context(|| format!("Failed to decode {} as {}", input.display(), format))?;
    Ok((format, snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_format() {
        assert_eq!(
            resolve_format(Some("excel"), Some(Path::new("x.json"))).unwrap(),
            Format::Tabular
        );
        assert_eq!(
            resolve_format(None, Some(Path::new("backup.xlsx"))).unwrap(),
            Format::Tabular
        );
        assert_eq!(resolve_format(None, None).unwrap(), Format::Structured);
        assert!(resolve_format(None, Some(Path::new("backup"))).is_err());
        assert!(resolve_format(Some("csv"), None).is_err());
    }

    #[test]
    fn test_read_snapshot_reports_malformed_input() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("broken.json");
        std::fs::write(&path, "[1, 2, 3]").unwrap();

        let err = read_snapshot(&path, None).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to decode"));
        assert!(message.contains("Malformed input"));
    }
}
