//! Document store drivers for docvault.
//!
//! This crate provides the `CollectionAccessor` trait the backup engine talks
//! to, plus the drivers behind it. A driver only has to read every document of
//! a collection and create new documents; anything else about the database is
//! out of the engine's sight.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │  Backup engine (export / import)          │
//! │                     │                     │
//! │                     ▼                     │
//! │         ┌──────────────────────┐          │
//! │         │ CollectionAccessor   │ ← trait  │
//! │         └──────────┬───────────┘          │
//! │        ┌───────────┼───────────┐          │
//! │        ▼           ▼           ▼          │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────┐   │
//! │  │  Memory  │ │  SQLite  │ │ MongoDB  │   │
//! │  └──────────┘ └──────────┘ └──────────┘   │
//! └───────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use docvault_store::{CollectionSchema, DocumentStore, Projection, SqliteStore};
//! use bson::doc;
//!
//! # async fn example() -> docvault_store::Result<()> {
//! let store = SqliteStore::open(
//!     "./data/docvault.db",
//!     [CollectionSchema::new("roles").with_unique(["name"])],
//! )?;
//!
//! let roles = store.collection("roles")?;
//! roles.create(doc! { "name": "admin" }).await?;
//! let all = roles.find_all(&Projection::all()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `mongodb` - Enable the MongoDB driver

mod error;
mod memory;
mod schema;
mod sqlite;
mod traits;

#[cfg(feature = "mongodb")]
mod mongo;

use std::path::PathBuf;
use std::sync::Arc;

pub use error::{Result, StoreError};
pub use memory::{MemoryCollection, MemoryStore};
pub use schema::CollectionSchema;
pub use sqlite::{SqliteCollection, SqliteStore};
pub use traits::{
    stamp_identity, CollectionAccessor, DocumentStore, Projection, ID_FIELD, REVISION_FIELD,
};

#[cfg(feature = "mongodb")]
pub use mongo::{MongoCollection, MongoStore};

// Re-export bson for convenience
pub use bson;

/// Store backend selection.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// In-process store, contents discarded on exit
    Memory,
    /// SQLite database file
    Sqlite {
        /// Database file path
        path: PathBuf,
    },
    /// MongoDB database
    Mongo {
        /// Connection string
        uri: String,
        /// Database name
        database: String,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Sqlite {
            path: PathBuf::from("./data/docvault.db"),
        }
    }
}

/// Open a document store from configuration.
///
/// `schemas` lists the collections the store defines, in order.
pub async fn open_store(
    config: &StoreConfig,
    schemas: Vec<CollectionSchema>,
) -> Result<Arc<dyn DocumentStore>> {
    match config {
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new(schemas))),
        StoreConfig::Sqlite { path } => Ok(Arc::new(SqliteStore::open(path, schemas)?)),
        #[cfg(feature = "mongodb")]
        StoreConfig::Mongo { uri, database } => {
            Ok(Arc::new(MongoStore::connect(uri, database, schemas).await?))
        }
        #[cfg(not(feature = "mongodb"))]
        StoreConfig::Mongo { .. } => Err(StoreError::Config(
            "MongoDB store requires the 'mongodb' feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store(&StoreConfig::Memory, vec![CollectionSchema::new("roles")])
            .await
            .unwrap();
        assert_eq!(store.backend_name(), "memory");
        assert_eq!(store.collection_names(), vec!["roles"]);
    }

    #[tokio::test]
    async fn test_open_sqlite_store() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = StoreConfig::Sqlite {
            path: temp.path().join("docvault.db"),
        };
        let store = open_store(&config, vec![CollectionSchema::new("roles")])
            .await
            .unwrap();
        assert_eq!(store.backend_name(), "sqlite");
        assert!(temp.path().join("docvault.db").exists());
    }

    #[cfg(not(feature = "mongodb"))]
    #[tokio::test]
    async fn test_mongo_requires_feature() {
        let config = StoreConfig::Mongo {
            uri: "mongodb://localhost:27017".to_string(),
            database: "app".to_string(),
        };
        let err = open_store(&config, Vec::new()).await.err().unwrap();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
