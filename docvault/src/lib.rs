//! Multi-collection backup and restore for document stores.
//!
//! `docvault` snapshots an ordered set of collections into a portable file
//! (JSON or an XLSX workbook) and re-ingests such a file later, one record at
//! a time, reporting per-collection insert/skip counts instead of failing.
//!
//! ```text
//! store ──► export ──► normalize ──► Snapshot ──► encode ──► bytes
//! bytes ──► decode ──► Snapshot ──► import ──► store (fresh identity)
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use docvault::{BackupEngine, Config, Format};
//!
//! # async fn example() -> docvault::Result<()> {
//! let config = Config::load_or_default("docvault.toml".as_ref())?;
//! let (engine, _store) = BackupEngine::open(&config).await?;
//!
//! let snapshot = engine.export_snapshot(None).await?;
//! let bytes = engine.encode(&snapshot, Format::Tabular)?;
//!
//! let decoded = engine.decode(&bytes, Format::Tabular)?;
//! let outcome = engine.apply_import(&decoded, None).await;
//! println!("inserted {}", outcome.total_inserted());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod import;
pub mod normalize;
pub mod progress;
pub mod registry;
pub mod snapshot;

pub use codec::Format;
pub use config::Config;
pub use engine::BackupEngine;
pub use error::{Error, Result};
pub use export::export_snapshot;
pub use import::{
    apply_import, CollectionOutcome, ImportOptions, ImportOutcome, MAX_ERRORS_PER_COLLECTION,
};
pub use normalize::{normalize, to_record};
pub use progress::{BackupProgress, NoopProgress, Phase};
pub use registry::{
    CollectionDescriptor, ExportHook, ImportHook, PlaceholderField, RedactFields, Registry,
    RegistryBuilder,
};
pub use snapshot::{Record, Snapshot};

pub use docvault_store as store;
