//! Snapshot: the interchange shape shared by export, both codecs and import.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A normalized record: field name to JSON value, in field order.
pub type Record = Map<String, Value>;

/// Mapping from collection key to its list of records.
///
/// Keys keep insertion order, so a snapshot built by the exporter lists
/// collections in registry order and encodes them that way. A decoded
/// snapshot may hold arbitrary JSON under any key; readers go through
/// [`Snapshot::records`], which tolerates missing and non-array entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(Map<String, Value>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the records of a collection, replacing any previous entry.
    pub fn insert(&mut self, key: impl Into<String>, records: Vec<Record>) {
        let rows = records.into_iter().map(Value::Object).collect();
        self.0.insert(key.into(), Value::Array(rows));
    }

    /// Raw entry for a collection key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Rows of a collection. Missing or non-array entries yield no rows.
    pub fn records(&self, key: &str) -> &[Value] {
        match self.0.get(key) {
            Some(Value::Array(rows)) => rows,
            _ => &[],
        }
    }

    /// Number of rows stored under a key (0 when missing or not an array).
    pub fn record_count(&self, key: &str) -> usize {
        self.records(key).len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Collection keys with their rows, in snapshot order.
    pub fn collections(&self) -> impl Iterator<Item = (&String, &[Value])> {
        self.0.iter().map(|(key, value)| {
            let rows: &[Value] = match value {
                Value::Array(rows) => rows,
                _ => &[],
            };
            (key, rows)
        })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Snapshot {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("users", vec![record(json!({"email": "a@example.com"}))]);
        snapshot.insert("roles", Vec::new());
        snapshot.insert("posts", vec![record(json!({"title": "x"}))]);

        let keys: Vec<&String> = snapshot.keys().collect();
        assert_eq!(keys, vec!["users", "roles", "posts"]);
        assert_eq!(snapshot.record_count("users"), 1);
        assert_eq!(snapshot.record_count("roles"), 0);
    }

    #[test]
    fn test_records_tolerates_bad_shapes() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "users": {"not": "an array"},
            "roles": null,
            "posts": [1, {"title": "x"}],
        }))
        .unwrap();

        assert!(snapshot.records("users").is_empty());
        assert!(snapshot.records("roles").is_empty());
        assert!(snapshot.records("missing").is_empty());
        assert_eq!(snapshot.records("posts").len(), 2);
        assert!(snapshot.contains("roles"));
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let mut snapshot = Snapshot::new();
        snapshot.insert("roles", vec![record(json!({"name": "admin"}))]);
        assert_eq!(
            serde_json::to_value(&snapshot).unwrap(),
            json!({"roles": [{"name": "admin"}]})
        );
    }
}
