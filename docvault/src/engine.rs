//! Backup engine facade.
//!
//! Bundles a registry with the import settings and exposes the four
//! operations a caller needs: export, encode, decode and import.

use std::sync::Arc;

use docvault_store::{open_store, DocumentStore};
use tracing::info;

use crate::codec::{self, Format};
use crate::config::Config;
use crate::error::Result;
use crate::export;
use crate::import::{self, ImportOptions, ImportOutcome};
use crate::progress::BackupProgress;
use crate::registry::Registry;
use crate::snapshot::Snapshot;

/// Export/import engine over one registry.
#[derive(Debug, Clone)]
pub struct BackupEngine {
    registry: Registry,
    options: ImportOptions,
}

impl BackupEngine {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            options: ImportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Build an engine over an already opened store.
    pub fn from_config(config: &Config, store: &dyn DocumentStore) -> Result<Self> {
        let registry = Registry::from_config(&config.backup, store)?;
        Ok(Self::new(registry).with_options(ImportOptions {
            strip_fields: config.backup.stripped_fields(),
        }))
    }

    /// Open the configured store and build an engine over it.
    pub async fn open(config: &Config) -> Result<(Self, Arc<dyn DocumentStore>)> {
        let store_config = config.store.to_store_config()?;
        let store = open_store(&store_config, config.backup.schemas()).await?;
        info!(
            backend = store.backend_name(),
            collections = config.backup.collections.len(),
            "Opened document store"
        );
        let engine = Self::from_config(config, store.as_ref())?;
        Ok((engine, store))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Read every registered collection into a snapshot.
    pub async fn export_snapshot(
        &self,
        progress: Option<&dyn BackupProgress>,
    ) -> Result<Snapshot> {
        export::export_snapshot(&self.registry, progress).await
    }

    pub fn encode(&self, snapshot: &Snapshot, format: Format) -> Result<Vec<u8>> {
        codec::encode(snapshot, format)
    }

    pub fn decode(&self, bytes: &[u8], format: Format) -> Result<Snapshot> {
        format.decode(bytes)
    }

    /// Apply a decoded snapshot; per-record failures end up in the outcome.
    pub async fn apply_import(
        &self,
        snapshot: &Snapshot,
        progress: Option<&dyn BackupProgress>,
    ) -> ImportOutcome {
        import::apply_import(&self.registry, snapshot, &self.options, progress).await
    }

    /// Snapshot keys the registry does not know and an import would ignore.
    pub fn unknown_keys<'a>(&self, snapshot: &'a Snapshot) -> Vec<&'a str> {
        snapshot
            .keys()
            .filter(|key| !self.registry.contains(key))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreSettings;
    use bson::doc;
    use serde_json::json;

    fn memory_config() -> Config {
        Config {
            store: StoreSettings {
                backend: "memory".to_string(),
                ..StoreSettings::default()
            },
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_open_builds_default_registry() {
        let (engine, store) = BackupEngine::open(&memory_config()).await.unwrap();
        assert_eq!(store.backend_name(), "memory");
        let keys: Vec<&str> = engine.registry().keys().collect();
        assert_eq!(keys[0], "roles");
        assert_eq!(keys[1], "users");
        assert_eq!(keys.len(), 9);
        assert_eq!(engine.options().strip_fields, vec!["_id", "__v"]);
    }

    #[tokio::test]
    async fn test_export_encode_decode_import() {
        let (engine, store) = BackupEngine::open(&memory_config()).await.unwrap();
        store
            .collection("roles")
            .unwrap()
            .create(doc! { "name": "admin" })
            .await
            .unwrap();

        let snapshot = engine.export_snapshot(None).await.unwrap();
        let bytes = engine.encode(&snapshot, Format::Structured).unwrap();
        let decoded = engine.decode(&bytes, Format::Structured).unwrap();
        assert_eq!(decoded, snapshot);

        let (mirror, mirror_store) = BackupEngine::open(&memory_config()).await.unwrap();
        let outcome = mirror.apply_import(&decoded, None).await;
        assert_eq!(outcome.get("roles").unwrap().inserted, 1);
        assert_eq!(
            mirror_store.collection("roles").unwrap().count().await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_keys() {
        let (engine, _store) = BackupEngine::open(&memory_config()).await.unwrap();
        let snapshot: Snapshot =
            serde_json::from_value(json!({"roles": [], "audit": [], "sessions": []})).unwrap();
        assert_eq!(engine.unknown_keys(&snapshot), vec!["audit", "sessions"]);
    }
}
