//! Snapshot export: read every registered collection into a [`Snapshot`].
//!
//! Fail-fast: the first read error aborts the export and no partial snapshot
//! is returned.

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::normalize::to_record;
use crate::progress::{BackupProgress, Phase};
use crate::registry::Registry;
use crate::snapshot::{Record, Snapshot};

/// Export every collection of the registry, in registry order.
///
/// # Arguments
/// * `registry` - Collections to export
/// * `progress` - Progress callback (optional)
pub async fn export_snapshot(
    registry: &Registry,
    progress: Option<&dyn BackupProgress>,
) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    let total = registry.len();
    let mut exported = 0usize;

    for (index, descriptor) in registry.iter().enumerate() {
        let key = descriptor.key();
        if let Some(p) = progress {
            p.on_collection_start(Phase::Export, index, total, key);
        }

        let projection = descriptor.projection();
        if !projection.is_empty() {
            debug!(collection = key, excluded = ?projection.excluded(), "Applying redaction");
        }

        let docs = descriptor
            .accessor()
            .find_all(&projection)
            .await
            .map_err(|source| Error::ReadFailure {
                collection: key.to_string(),
                source,
            })?;

        let records: Vec<Record> = docs.iter().map(to_record).collect();
        info!(collection = key, records = records.len(), "Exported collection");

        if let Some(p) = progress {
            p.on_collection_done(Phase::Export, key, records.len());
        }
        exported += records.len();
        snapshot.insert(key, records);
    }

    if let Some(p) = progress {
        p.on_complete(Phase::Export, exported);
    }

    Ok(snapshot)
}
