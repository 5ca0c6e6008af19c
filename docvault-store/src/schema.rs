//! Per-collection constraints enforced on create.

use bson::{Bson, Document};

use crate::error::{Result, StoreError};
use crate::traits::ID_FIELD;

/// Constraint set for one collection.
///
/// This is the only schema knowledge a driver has: which fields must be
/// present and which must hold distinct values. Field shapes are never checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSchema {
    pub name: String,
    pub required: Vec<String>,
    pub unique: Vec<String>,
}

impl CollectionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: Vec::new(),
            unique: Vec::new(),
        }
    }

    pub fn with_required<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_unique<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Check that every required field is present, non-null and, for
    /// strings, non-empty.
    pub fn check_required(&self, doc: &Document) -> Result<()> {
        for field in &self.required {
            let present = match doc.get(field) {
                None | Some(Bson::Null) => false,
                Some(Bson::String(s)) => !s.is_empty(),
                Some(_) => true,
            };
            if !present {
                return Err(StoreError::MissingField {
                    collection: self.name.clone(),
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }

    /// Unique-index entries for a document: `(field, canonical value)` for
    /// `_id` and every unique field holding a non-null value.
    pub fn unique_entries(&self, doc: &Document) -> Vec<(String, String)> {
        std::iter::once(ID_FIELD)
            .chain(self.unique.iter().map(String::as_str))
            .filter_map(|field| match doc.get(field) {
                None | Some(Bson::Null) => None,
                Some(value) => Some((field.to_string(), canonical_value(value))),
            })
            .collect()
    }

    pub(crate) fn duplicate(&self, field: &str, value: &str) -> StoreError {
        StoreError::Duplicate {
            collection: self.name.clone(),
            field: field.to_string(),
            value: value.to_string(),
        }
    }
}

/// Stable text form of a value, used as the unique-index key.
pub(crate) fn canonical_value(value: &Bson) -> String {
    value.clone().into_relaxed_extjson().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn users() -> CollectionSchema {
        CollectionSchema::new("users")
            .with_required(["email", "password"])
            .with_unique(["email"])
    }

    #[test]
    fn test_check_required() {
        let schema = users();
        assert!(schema
            .check_required(&doc! { "email": "a@example.com", "password": "h" })
            .is_ok());

        let err = schema
            .check_required(&doc! { "email": "a@example.com" })
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingField { ref field, .. } if field == "password"));

        let err = schema
            .check_required(&doc! { "email": "", "password": "h" })
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingField { ref field, .. } if field == "email"));

        let err = schema
            .check_required(&doc! { "email": Bson::Null, "password": "h" })
            .unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_unique_entries() {
        let schema = users();
        let entries = schema.unique_entries(&doc! { "_id": 7, "email": "a@example.com" });
        assert_eq!(
            entries,
            vec![
                ("_id".to_string(), "7".to_string()),
                ("email".to_string(), "\"a@example.com\"".to_string()),
            ]
        );

        let entries = schema.unique_entries(&doc! { "email": Bson::Null });
        assert!(entries.is_empty());
    }
}
