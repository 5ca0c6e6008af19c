//! Configuration management for docvault
//!
//! Default config location: ./docvault.toml (override with DOCVAULT_CONFIG)

mod collections;

pub use collections::{CollectionConfig, PlaceholderConfig, PLACEHOLDER_CREDENTIAL};

use docvault_store::{CollectionSchema, StoreConfig, ID_FIELD, REVISION_FIELD};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreSettings {
    /// "sqlite", "memory" or "mongodb"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// SQLite database file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// MongoDB connection string
    #[serde(default = "default_mongo_uri")]
    pub uri: String,
    /// MongoDB database name
    #[serde(default = "default_database")]
    pub database: String,
}

fn default_backend() -> String {
    "sqlite".to_string()
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".docvault")
}

fn default_store_path() -> PathBuf {
    default_data_dir().join("docvault.db")
}

fn default_mongo_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "admin_app".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_store_path(),
            uri: default_mongo_uri(),
            database: default_database(),
        }
    }
}

impl StoreSettings {
    /// Resolve the backend selection into a driver configuration.
    pub fn to_store_config(&self) -> Result<StoreConfig> {
        match self.backend.to_lowercase().as_str() {
            "memory" => Ok(StoreConfig::Memory),
            "sqlite" => Ok(StoreConfig::Sqlite {
                path: self.path.clone(),
            }),
            "mongodb" | "mongo" => Ok(StoreConfig::Mongo {
                uri: self.uri.clone(),
                database: self.database.clone(),
            }),
            other => Err(Error::Config(format!(
                "Unknown store backend '{}'. Use 'sqlite', 'memory' or 'mongodb'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackupConfig {
    /// Store identity field, removed from records before import
    #[serde(default = "default_identity_field")]
    pub identity_field: String,
    /// Store revision counter, removed from records before import
    #[serde(default = "default_revision_field")]
    pub revision_field: String,
    /// Collections in restore order
    #[serde(default = "collections::default_collections")]
    pub collections: Vec<CollectionConfig>,
}

fn default_identity_field() -> String {
    ID_FIELD.to_string()
}

fn default_revision_field() -> String {
    REVISION_FIELD.to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            identity_field: default_identity_field(),
            revision_field: default_revision_field(),
            collections: collections::default_collections(),
        }
    }
}

impl BackupConfig {
    /// Store schemas for every configured collection, in order.
    pub fn schemas(&self) -> Vec<CollectionSchema> {
        self.collections
            .iter()
            .map(|c| {
                CollectionSchema::new(c.store_name())
                    .with_required(c.required.iter().cloned())
                    .with_unique(c.unique.iter().cloned())
            })
            .collect()
    }

    /// Fields stripped from every record before it is created.
    pub fn stripped_fields(&self) -> Vec<String> {
        vec![self.identity_field.clone(), self.revision_field.clone()]
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_level")]
    pub level: String,
    /// Log output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_log_format(),
        }
    }
}

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| Error::Config("Cannot determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Config {
    /// Load config from a file; the file must exist.
    pub fn load(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.expand_paths()?;
        Ok(config)
    }

    /// Load config from a file, or fall back to defaults when it is absent.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            let mut config = Config::default();
            config.expand_paths()?;
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Expand ~ in all paths
    fn expand_paths(&mut self) -> Result<()> {
        self.store.path = expand_tilde(&self.store.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.backend, "sqlite");
        assert_eq!(config.backup.stripped_fields(), vec!["_id", "__v"]);
        assert_eq!(config.backup.collections[0].key, "roles");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[store]
backend = "memory"

[[backup.collections]]
key = "roles"
unique = ["name"]

[[backup.collections]]
key = "users"
redact = ["password"]
placeholder = { field = "password", value = "x" }
"#,
        )
        .unwrap();

        assert!(matches!(
            config.store.to_store_config().unwrap(),
            StoreConfig::Memory
        ));
        assert_eq!(config.backup.identity_field, "_id");
        assert_eq!(config.backup.collections.len(), 2);
        let users = &config.backup.collections[1];
        assert_eq!(users.placeholder.as_ref().unwrap().value, "x");

        let schemas = config.backup.schemas();
        assert_eq!(schemas[0].unique, vec!["name"]);
        assert_eq!(schemas[1].name, "users");
    }

    #[test]
    fn test_unknown_backend() {
        let settings = StoreSettings {
            backend: "postgres".to_string(),
            ..StoreSettings::default()
        };
        assert!(matches!(settings.to_store_config(), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf").join("docvault.toml");

        let mut config = Config::default();
        config.store.path = temp.path().join("store.db");
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.store.path, config.store.path);
        assert_eq!(loaded.backup.collections, config.backup.collections);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp = TempDir::new().unwrap();
        let config = Config::load_or_default(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config.backup.collections.len(), 9);
        assert!(!temp.path().join("absent.toml").exists());
    }

    #[test]
    fn test_expand_tilde() {
        let plain = expand_tilde(Path::new("/tmp/store.db")).unwrap();
        assert_eq!(plain, PathBuf::from("/tmp/store.db"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_tilde(Path::new("~/x.db")).unwrap(),
                home.join("x.db")
            );
        }
    }
}
