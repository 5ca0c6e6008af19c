//! Value normalization for export.
//!
//! Store values carry types the output formats cannot express (dates, object
//! ids). `normalize` rewrites those into plain strings, recursing through
//! arrays and embedded documents, and leaves every other value alone. It is
//! pure, total and idempotent.

use bson::{Bson, Document};
use chrono::SecondsFormat;

use crate::snapshot::Record;

/// Normalize a single value.
///
/// - dates become ISO-8601 strings with millisecond precision (`...T12:00:00.000Z`)
/// - object ids become their 24-character hex form
/// - arrays and documents are normalized element-wise, order preserved
/// - anything else is returned unchanged
pub fn normalize(value: &Bson) -> Bson {
    match value {
        Bson::DateTime(dt) => Bson::String(iso_string(*dt)),
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::Array(items) => Bson::Array(items.iter().map(normalize).collect()),
        Bson::Document(doc) => Bson::Document(normalize_document(doc)),
        other => other.clone(),
    }
}

/// Normalize every field of a document, keeping field order.
pub fn normalize_document(doc: &Document) -> Document {
    doc.iter()
        .map(|(key, value)| (key.clone(), normalize(value)))
        .collect()
}

/// Normalize a store document and convert it to a snapshot record.
///
/// Scalars that survive normalization but have no JSON counterpart (binary,
/// decimal, timestamps) are written in relaxed extended-JSON form.
pub fn to_record(doc: &Document) -> Record {
    doc.iter()
        .map(|(key, value)| (key.clone(), normalize(value).into_relaxed_extjson()))
        .collect()
}

fn iso_string(dt: bson::DateTime) -> String {
    dt.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)
}
