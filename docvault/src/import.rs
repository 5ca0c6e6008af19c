//! Snapshot import: re-create every record of a decoded snapshot as a new
//! document.
//!
//! Fail-soft: a rejected record is counted and reported, never propagated.
//! Collections are processed in registry order and records in snapshot order,
//! one store call at a time. There is no rollback, so records created before a
//! failure stay created, and running the same import twice duplicates every
//! record that no unique field protects.

use bson::Document;
use docvault_store::{ID_FIELD, REVISION_FIELD};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::progress::{BackupProgress, Phase};
use crate::registry::{CollectionDescriptor, Registry};
use crate::snapshot::{Record, Snapshot};

/// Error messages kept per collection; later failures are only counted.
pub const MAX_ERRORS_PER_COLLECTION: usize = 10;

/// Import counters for one collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOutcome {
    pub inserted: u64,
    pub skipped: u64,
    pub errors: Vec<String>,
}

impl CollectionOutcome {
    /// Count a rejected row; `row` is 1-based.
    fn record_failure(&mut self, row: usize, message: &str) {
        self.skipped += 1;
        if self.errors.len() < MAX_ERRORS_PER_COLLECTION {
            self.errors.push(format!("Row {}: {}", row, message));
        }
    }
}

/// Per-collection import report, in registry order.
///
/// Serializes as a JSON object keyed by collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    collections: Vec<(String, CollectionOutcome)>,
}

impl ImportOutcome {
    pub fn get(&self, key: &str) -> Option<&CollectionOutcome> {
        self.collections
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CollectionOutcome)> {
        self.collections.iter().map(|(k, o)| (k.as_str(), o))
    }

    pub fn total_inserted(&self) -> u64 {
        self.collections.iter().map(|(_, o)| o.inserted).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.collections.iter().map(|(_, o)| o.skipped).sum()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

impl Serialize for ImportOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.collections.len()))?;
        for (key, outcome) in &self.collections {
            map.serialize_entry(key, outcome)?;
        }
        map.end()
    }
}

/// Import settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Top-level fields removed from every record so the store mints fresh identity
    pub strip_fields: Vec<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            strip_fields: vec![ID_FIELD.to_string(), REVISION_FIELD.to_string()],
        }
    }
}

/// Apply a decoded snapshot to the store behind the registry.
///
/// Never fails: every problem is scoped to one record (counted as skipped) or
/// to one collection entry that is missing or not an array (zero records).
pub async fn apply_import(
    registry: &Registry,
    snapshot: &Snapshot,
    options: &ImportOptions,
    progress: Option<&dyn BackupProgress>,
) -> ImportOutcome {
    for key in snapshot.keys() {
        if !registry.contains(key) {
            warn!(collection = %key, "Ignoring collection not in registry");
        }
    }

    let mut outcome = ImportOutcome::default();
    let total = registry.len();
    let mut attempted = 0usize;

    for (index, descriptor) in registry.iter().enumerate() {
        let key = descriptor.key();
        if let Some(p) = progress {
            p.on_collection_start(Phase::Import, index, total, key);
        }

        let rows = snapshot.records(key);
        let result = import_collection(descriptor, rows, options).await;
        info!(
            collection = key,
            inserted = result.inserted,
            skipped = result.skipped,
            "Imported collection"
        );

        if let Some(p) = progress {
            p.on_collection_done(Phase::Import, key, rows.len());
        }
        attempted += rows.len();
        outcome.collections.push((key.to_string(), result));
    }

    if let Some(p) = progress {
        p.on_complete(Phase::Import, attempted);
    }

    outcome
}

async fn import_collection(
    descriptor: &CollectionDescriptor,
    rows: &[Value],
    options: &ImportOptions,
) -> CollectionOutcome {
    let mut outcome = CollectionOutcome::default();

    for (index, row) in rows.iter().enumerate() {
        let Value::Object(fields) = row else {
            outcome.skipped += 1;
            continue;
        };

        let result = match prepare_document(descriptor, fields, options) {
            Ok(doc) => descriptor
                .accessor()
                .create(doc)
                .await
                .map_err(|e| e.to_string()),
            Err(message) => Err(message),
        };

        match result {
            Ok(id) => {
                debug!(collection = descriptor.key(), row = index + 1, id = %id, "Created record");
                outcome.inserted += 1;
            }
            Err(message) => {
                debug!(collection = descriptor.key(), row = index + 1, error = %message, "Record rejected");
                outcome.record_failure(index + 1, &message);
            }
        }
    }

    outcome
}

/// Copy a row without its identity fields, convert it to a store document and
/// run the collection's import hook.
fn prepare_document(
    descriptor: &CollectionDescriptor,
    fields: &Record,
    options: &ImportOptions,
) -> Result<Document, String> {
    let copy: Record = fields
        .iter()
        .filter(|(name, _)| !options.strip_fields.contains(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();

    let mut doc = bson::to_document(&copy)
        .map_err(|e| format!("record cannot be stored: {}", e))?;
    descriptor.prepare(&mut doc);
    Ok(doc)
}
