//! In-process document store.
//!
//! Used by tests and by the `memory` backend for dry runs. Contents live for
//! the lifetime of the store value.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};
use parking_lot::RwLock;
use tracing::{debug, instrument};

use crate::error::{Result, StoreError};
use crate::schema::CollectionSchema;
use crate::traits::{stamp_identity, CollectionAccessor, DocumentStore, Projection};

/// In-memory document store with a fixed set of collections.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Arc<MemoryCollection>>,
    order: Vec<String>,
}

impl MemoryStore {
    /// Create a store defining one collection per schema.
    pub fn new(schemas: impl IntoIterator<Item = CollectionSchema>) -> Self {
        let mut store = Self::default();
        for schema in schemas {
            store.define(schema);
        }
        store
    }

    /// Define (or redefine, dropping its contents) a collection.
    pub fn define(&mut self, schema: CollectionSchema) {
        let name = schema.name.clone();
        if !self.collections.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.collections
            .insert(name, Arc::new(MemoryCollection::new(schema)));
    }

    /// Typed handle to a collection, for callers that need `len()` or seeding.
    pub fn memory_collection(&self, name: &str) -> Option<Arc<MemoryCollection>> {
        self.collections.get(name).cloned()
    }
}

impl DocumentStore for MemoryStore {
    fn collection(&self, name: &str) -> Result<Arc<dyn CollectionAccessor>> {
        self.collections
            .get(name)
            .cloned()
            .map(|c| c as Arc<dyn CollectionAccessor>)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn collection_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Debug, Default)]
struct Inner {
    docs: Vec<Document>,
    unique: HashSet<(String, String)>,
}

/// One in-memory collection.
#[derive(Debug)]
pub struct MemoryCollection {
    schema: CollectionSchema,
    inner: RwLock<Inner>,
}

impl MemoryCollection {
    pub fn new(schema: CollectionSchema) -> Self {
        Self {
            schema,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    pub fn len(&self) -> usize {
        self.inner.read().docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, doc: Document) -> Result<Bson> {
        self.schema.check_required(&doc)?;
        let (id, doc) = stamp_identity(doc);
        let entries = self.schema.unique_entries(&doc);

        let mut inner = self.inner.write();
        if let Some((field, value)) = entries.iter().find(|e| inner.unique.contains(*e)) {
            return Err(self.schema.duplicate(field, value));
        }
        inner.unique.extend(entries);
        inner.docs.push(doc);
        Ok(id)
    }
}

#[async_trait]
impl CollectionAccessor for MemoryCollection {
    fn name(&self) -> &str {
        &self.schema.name
    }

    #[instrument(skip(self), fields(collection = %self.schema.name))]
    async fn find_all(&self, projection: &Projection) -> Result<Vec<Document>> {
        let inner = self.inner.read();
        debug!("Reading {} documents", inner.docs.len());
        Ok(inner
            .docs
            .iter()
            .cloned()
            .map(|doc| projection.apply(doc))
            .collect())
    }

    async fn create(&self, doc: Document) -> Result<Bson> {
        self.insert(doc)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.len() as u64)
    }
}
