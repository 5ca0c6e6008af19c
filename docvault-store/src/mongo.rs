//! MongoDB driver (requires the `mongodb` feature).
//!
//! Find-all runs with the projection pushed to the server. Required fields are
//! checked client side before `insert_one`; uniqueness is whatever indexes the
//! server already has.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use tracing::{debug, instrument};

use crate::error::{Result, StoreError};
use crate::schema::CollectionSchema;
use crate::traits::{stamp_identity, CollectionAccessor, DocumentStore, Projection};

/// Document store over a MongoDB database.
#[derive(Clone, Debug)]
pub struct MongoStore {
    db: Database,
    collections: HashMap<String, CollectionSchema>,
    order: Vec<String>,
}

impl MongoStore {
    /// Connect to `uri` and use `database`.
    pub async fn connect(
        uri: &str,
        database: &str,
        schemas: impl IntoIterator<Item = CollectionSchema>,
    ) -> Result<Self> {
        let client = mongodb::Client::with_uri_str(uri).await?;
        Ok(Self::new(client.database(database), schemas))
    }

    pub fn new(db: Database, schemas: impl IntoIterator<Item = CollectionSchema>) -> Self {
        let mut collections = HashMap::new();
        let mut order = Vec::new();
        for schema in schemas {
            if !collections.contains_key(&schema.name) {
                order.push(schema.name.clone());
            }
            collections.insert(schema.name.clone(), schema);
        }
        Self {
            db,
            collections,
            order,
        }
    }
}

impl DocumentStore for MongoStore {
    fn collection(&self, name: &str) -> Result<Arc<dyn CollectionAccessor>> {
        let schema = self
            .collections
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Ok(Arc::new(MongoCollection {
            inner: self.db.collection::<Document>(name),
            schema,
        }))
    }

    fn collection_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}

/// Accessor for one MongoDB collection.
pub struct MongoCollection {
    inner: Collection<Document>,
    schema: CollectionSchema,
}

#[async_trait]
impl CollectionAccessor for MongoCollection {
    fn name(&self) -> &str {
        &self.schema.name
    }

    #[instrument(skip(self), fields(collection = %self.schema.name))]
    async fn find_all(&self, projection: &Projection) -> Result<Vec<Document>> {
        let cursor = match projection.to_document() {
            Some(p) => self.inner.find(doc! {}).projection(p).await?,
            None => self.inner.find(doc! {}).await?,
        };
        let docs: Vec<Document> = cursor.try_collect().await?;
        debug!("Read {} documents", docs.len());
        Ok(docs)
    }

    async fn create(&self, doc: Document) -> Result<Bson> {
        self.schema.check_required(&doc)?;
        let (_, doc) = stamp_identity(doc);
        let result = self.inner.insert_one(doc).await?;
        Ok(result.inserted_id)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.inner.count_documents(doc! {}).await?)
    }
}
