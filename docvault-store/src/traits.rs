//! Core store trait definitions.
//!
//! The `CollectionAccessor` trait is the whole surface the backup engine needs
//! from a document database: read every document of one collection, and
//! create a new document. `DocumentStore` hands out accessors by name.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};

use crate::error::Result;

/// Field holding the store-assigned identity of a document.
pub const ID_FIELD: &str = "_id";

/// Field holding the object mapper's internal revision counter.
pub const REVISION_FIELD: &str = "__v";

/// Top-level fields to leave out of a find-all result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    exclude: Vec<String>,
}

impl Projection {
    /// Projection that returns every field.
    pub fn all() -> Self {
        Self::default()
    }

    /// Exclude a top-level field from results.
    pub fn exclude(mut self, field: impl Into<String>) -> Self {
        let field = field.into();
        if !self.exclude.contains(&field) {
            self.exclude.push(field);
        }
        self
    }

    pub fn excludes(&self, field: &str) -> bool {
        self.exclude.iter().any(|f| f == field)
    }

    pub fn excluded(&self) -> &[String] {
        &self.exclude
    }

    pub fn is_empty(&self) -> bool {
        self.exclude.is_empty()
    }

    /// Remove excluded fields from a document.
    pub fn apply(&self, mut doc: Document) -> Document {
        for field in &self.exclude {
            doc.remove(field);
        }
        doc
    }

    /// Render as a MongoDB-style projection document (`{ field: 0 }`).
    pub fn to_document(&self) -> Option<Document> {
        if self.exclude.is_empty() {
            return None;
        }
        let mut doc = Document::new();
        for field in &self.exclude {
            doc.insert(field.clone(), 0);
        }
        Some(doc)
    }
}

/// Generic accessor for one collection of a document store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the engine shares accessors behind
/// `Arc` and may be driven from any task of the caller's runtime.
#[async_trait]
pub trait CollectionAccessor: Send + Sync {
    /// Collection name as known to the store.
    fn name(&self) -> &str;

    /// Read every document, in store order, with the projection applied.
    async fn find_all(&self, projection: &Projection) -> Result<Vec<Document>>;

    /// Create a new document and return its identity.
    ///
    /// The store assigns `_id` when the document has none and initialises the
    /// revision counter. Constraint violations are returned as errors; the
    /// document is not written in that case.
    async fn create(&self, doc: Document) -> Result<Bson>;

    /// Number of documents in the collection.
    async fn count(&self) -> Result<u64>;
}

/// A document store that hands out collection accessors by name.
pub trait DocumentStore: Send + Sync {
    /// Accessor for the named collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the store does not define the collection.
    fn collection(&self, name: &str) -> Result<Arc<dyn CollectionAccessor>>;

    /// Names of every collection the store defines.
    fn collection_names(&self) -> Vec<String>;

    /// Short backend label for logs ("memory", "sqlite", "mongodb").
    fn backend_name(&self) -> &'static str;
}

/// Prepare a document for insertion the way the object mapper does: assign a
/// fresh `ObjectId` when `_id` is absent (placed first) and start the revision
/// counter at zero when it is absent.
pub fn stamp_identity(doc: Document) -> (Bson, Document) {
    let id = match doc.get(ID_FIELD) {
        Some(existing) if *existing != Bson::Null => existing.clone(),
        _ => Bson::ObjectId(bson::oid::ObjectId::new()),
    };

    let mut stamped = Document::new();
    stamped.insert(ID_FIELD, id.clone());
    for (key, value) in doc {
        if key != ID_FIELD {
            stamped.insert(key, value);
        }
    }
    if !stamped.contains_key(REVISION_FIELD) {
        stamped.insert(REVISION_FIELD, 0i32);
    }
    (id, stamped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_projection_apply() {
        let projection = Projection::all().exclude("password").exclude("password");
        assert_eq!(projection.excluded(), &["password".to_string()]);
        assert!(projection.excludes("password"));

        let doc = doc! { "email": "a@example.com", "password": "hash" };
        let out = projection.apply(doc);
        assert_eq!(out, doc! { "email": "a@example.com" });
    }

    #[test]
    fn test_projection_to_document() {
        assert!(Projection::all().to_document().is_none());
        let projection = Projection::all().exclude("password");
        assert_eq!(projection.to_document(), Some(doc! { "password": 0 }));
    }

    #[test]
    fn test_stamp_identity_assigns_id_first() {
        let (id, doc) = stamp_identity(doc! { "name": "admin" });
        assert!(matches!(id, Bson::ObjectId(_)));
        let keys: Vec<&String> = doc.keys().collect();
        assert_eq!(keys, vec!["_id", "name", "__v"]);
        assert_eq!(doc.get(ID_FIELD), Some(&id));
        assert_eq!(doc.get_i32(REVISION_FIELD).unwrap(), 0);
    }

    #[test]
    fn test_stamp_identity_keeps_existing() {
        let oid = bson::oid::ObjectId::new();
        let (id, doc) = stamp_identity(doc! { "name": "x", "_id": oid, "__v": 3 });
        assert_eq!(id, Bson::ObjectId(oid));
        assert_eq!(doc.get_i32(REVISION_FIELD).unwrap(), 3);
        assert_eq!(doc.keys().next().unwrap(), "_id");
    }
}
