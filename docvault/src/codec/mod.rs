//! Snapshot codecs.
//!
//! Supports two formats:
//! - **Structured**: pretty-printed JSON, lossless for snapshot values
//! - **Tabular**: XLSX workbook, one sheet per collection, lossy (every value
//!   comes back as text, number or boolean)

pub mod json;
pub mod xlsx;

use std::path::Path;

use crate::error::{Error, Result};
use crate::snapshot::Snapshot;

/// Snapshot file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// JSON object of collection arrays
    Structured,
    /// XLSX workbook, one sheet per collection
    Tabular,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Structured => write!(f, "json"),
            Format::Tabular => write!(f, "xlsx"),
        }
    }
}

impl std::str::FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" | "structured" => Ok(Format::Structured),
            "xlsx" | "tabular" | "excel" | "spreadsheet" => Ok(Format::Tabular),
            _ => Err(Error::UnsupportedFormat(format!(
                "'{}'. Use 'json' or 'xlsx'",
                s
            ))),
        }
    }
}

impl Format {
    /// MIME type for download responses.
    pub fn content_type(&self) -> &'static str {
        match self {
            Format::Structured => "application/json",
            Format::Tabular => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            Format::Structured => "json",
            Format::Tabular => "xlsx",
        }
    }

    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!("cannot infer format of {}", path.display()))
            })?;
        ext.parse()
    }

    pub fn encode(&self, snapshot: &Snapshot) -> Result<Vec<u8>> {
        match self {
            Format::Structured => json::encode(snapshot),
            Format::Tabular => xlsx::encode(snapshot),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Snapshot> {
        match self {
            Format::Structured => json::decode(bytes),
            Format::Tabular => xlsx::decode(bytes),
        }
    }
}

/// Encode a snapshot in the given format.
pub fn encode(snapshot: &Snapshot, format: Format) -> Result<Vec<u8>> {
    format.encode(snapshot)
}

/// Decode bytes declared to be in `format` (e.g. "json", "xlsx").
///
/// An unknown format name fails with `UnsupportedFormat` before the bytes
/// are looked at.
pub fn decode(bytes: &[u8], format: &str) -> Result<Snapshot> {
    let format: Format = format.parse()?;
    format.decode(bytes)
}
