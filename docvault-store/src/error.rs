//! Store error types.

use std::io;
use thiserror::Error;

/// Document store operation errors.
///
/// The `Display` text of every variant is what an import report shows for a
/// rejected row, so messages name the collection and the offending field.
#[derive(Error, Debug)]
pub enum StoreError {
    /// I/O error while opening or writing the store
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Collection is not known to the store
    #[error("Collection not found: {0}")]
    NotFound(String),

    /// A required field is absent, null or empty
    #[error("Validation failed for {collection}: `{field}` is required")]
    MissingField { collection: String, field: String },

    /// A unique field already holds this value
    #[error("Duplicate key in {collection}: `{field}` = {value}")]
    Duplicate {
        collection: String,
        field: String,
        value: String,
    },

    /// SQLite driver error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Document could not be encoded to BSON
    #[error("BSON encode error: {0}")]
    BsonEncode(#[from] bson::ser::Error),

    /// Stored bytes could not be decoded as BSON
    #[error("BSON decode error: {0}")]
    BsonDecode(#[from] bson::de::Error),

    /// MongoDB driver error
    #[cfg(feature = "mongodb")]
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic backend failure
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Check if this is a "collection not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Check if the store rejected the document on a constraint
    /// (required or unique field) rather than failing to run.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            StoreError::MissingField { .. } | StoreError::Duplicate { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = StoreError::NotFound("users".to_string());
        assert!(err.is_not_found());
        assert!(!err.is_constraint_violation());
    }

    #[test]
    fn test_error_display() {
        let err = StoreError::MissingField {
            collection: "users".to_string(),
            field: "email".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Validation failed for users: `email` is required"
        );
        assert!(err.is_constraint_violation());

        let err = StoreError::Duplicate {
            collection: "roles".to_string(),
            field: "name".to_string(),
            value: "\"admin\"".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate key in roles: `name` = \"admin\"");
    }
}
