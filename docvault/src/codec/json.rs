//! Structured (JSON) snapshot codec.
//!
//! Format: one top-level object whose keys are collection keys and whose
//! values are arrays of record objects, pretty-printed. No envelope, no
//! checksum.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::snapshot::Snapshot;

/// Encode a snapshot as pretty-printed JSON, collections in snapshot order.
pub fn encode(snapshot: &Snapshot) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(snapshot)
        .map_err(|e| Error::Encode(format!("JSON serialization failed: {}", e)))
}

/// Decode JSON bytes into a snapshot. The top-level value must be an object.
pub fn decode(bytes: &[u8]) -> Result<Snapshot> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::MalformedInput(format!("invalid JSON: {}", e)))?;

    match value {
        Value::Object(map) => Ok(Snapshot::from(map)),
        Value::Null => Err(Error::MalformedInput(
            "top-level value is null, expected an object".to_string(),
        )),
        Value::Array(_) => Err(Error::MalformedInput(
            "top-level value is an array, expected an object".to_string(),
        )),
        _ => Err(Error::MalformedInput(
            "top-level value is a scalar, expected an object".to_string(),
        )),
    }
}
