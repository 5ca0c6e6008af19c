//! SQLite-backed document store.
//!
//! Documents are kept as BSON blobs in one table, ordered by insertion.
//! Unique fields are enforced through a side table with a composite primary
//! key; each create runs in its own SQLite transaction so a rejected document
//! leaves neither its body nor its index entries behind.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};
use rusqlite::{params, Connection, ErrorCode};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::{Result, StoreError};
use crate::schema::CollectionSchema;
use crate::traits::{stamp_identity, CollectionAccessor, DocumentStore, Projection};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    seq        INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    doc_id     TEXT NOT NULL,
    body       BLOB NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, seq);
CREATE TABLE IF NOT EXISTS unique_values (
    collection TEXT NOT NULL,
    field      TEXT NOT NULL,
    value      TEXT NOT NULL,
    PRIMARY KEY (collection, field, value)
);
"#;

/// SQLite document store with a fixed set of collections.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    collections: HashMap<String, CollectionSchema>,
    order: Vec<String>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("collections", &self.order)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (or create) a store file at the given path.
    pub fn open(
        path: impl AsRef<Path>,
        schemas: impl IntoIterator<Item = CollectionSchema>,
    ) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        Self::from_connection(conn, schemas)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory(schemas: impl IntoIterator<Item = CollectionSchema>) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, schemas)
    }

    fn from_connection(
        conn: Connection,
        schemas: impl IntoIterator<Item = CollectionSchema>,
    ) -> Result<Self> {
        conn.execute_batch(SCHEMA_SQL)?;

        let mut collections = HashMap::new();
        let mut order = Vec::new();
        for schema in schemas {
            if !collections.contains_key(&schema.name) {
                order.push(schema.name.clone());
            }
            collections.insert(schema.name.clone(), schema);
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            collections,
            order,
        })
    }
}

impl DocumentStore for SqliteStore {
    fn collection(&self, name: &str) -> Result<Arc<dyn CollectionAccessor>> {
        let schema = self
            .collections
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Ok(Arc::new(SqliteCollection {
            conn: self.conn.clone(),
            schema,
        }))
    }

    fn collection_names(&self) -> Vec<String> {
        self.order.clone()
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

/// Accessor for one collection of a [`SqliteStore`].
pub struct SqliteCollection {
    conn: Arc<Mutex<Connection>>,
    schema: CollectionSchema,
}

#[async_trait]
impl CollectionAccessor for SqliteCollection {
    fn name(&self) -> &str {
        &self.schema.name
    }

    #[instrument(skip(self), fields(collection = %self.schema.name))]
    async fn find_all(&self, projection: &Projection) -> Result<Vec<Document>> {
        let conn = self.conn.lock().await;
        let mut stmt =
            conn.prepare("SELECT body FROM documents WHERE collection = ? ORDER BY seq")?;
        let rows = stmt.query_map(params![&self.schema.name], |row| row.get::<_, Vec<u8>>(0))?;

        let mut docs = Vec::new();
        for body in rows {
            let body = body?;
            let doc = Document::from_reader(body.as_slice())?;
            docs.push(projection.apply(doc));
        }
        debug!("Read {} documents", docs.len());
        Ok(docs)
    }

    #[instrument(skip(self, doc), fields(collection = %self.schema.name))]
    async fn create(&self, doc: Document) -> Result<Bson> {
        self.schema.check_required(&doc)?;
        let (id, doc) = stamp_identity(doc);
        let entries = self.schema.unique_entries(&doc);

        let mut body = Vec::new();
        doc.to_writer(&mut body)?;
        let doc_id = crate::schema::canonical_value(&id);

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        for (field, value) in &entries {
            let inserted = tx.execute(
                "INSERT INTO unique_values (collection, field, value) VALUES (?, ?, ?)",
                params![&self.schema.name, field, value],
            );
            match inserted {
                Ok(_) => {}
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == ErrorCode::ConstraintViolation =>
                {
                    // dropping `tx` rolls back the entries inserted so far
                    return Err(self.schema.duplicate(field, value));
                }
                Err(e) => return Err(e.into()),
            }
        }
        tx.execute(
            "INSERT INTO documents (collection, doc_id, body) VALUES (?, ?, ?)",
            params![&self.schema.name, doc_id, body],
        )?;
        tx.commit()?;

        Ok(id)
    }

    async fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?",
            params![&self.schema.name],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use tempfile::TempDir;

    fn schemas() -> Vec<CollectionSchema> {
        vec![
            CollectionSchema::new("roles")
                .with_required(["name"])
                .with_unique(["name"]),
            CollectionSchema::new("posts"),
        ]
    }

    #[tokio::test]
    async fn test_create_and_read_in_order() {
        let store = SqliteStore::in_memory(schemas()).unwrap();
        let posts = store.collection("posts").unwrap();

        for i in 0..5 {
            posts.create(doc! { "title": format!("post {i}") }).await.unwrap();
        }

        let docs = posts.find_all(&Projection::all()).await.unwrap();
        let titles: Vec<&str> = docs.iter().map(|d| d.get_str("title").unwrap()).collect();
        assert_eq!(titles, vec!["post 0", "post 1", "post 2", "post 3", "post 4"]);
        assert!(docs.iter().all(|d| d.get_object_id("_id").is_ok()));
        assert_eq!(posts.count().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_unique_violation_rolls_back() {
        let store = SqliteStore::in_memory(schemas()).unwrap();
        let roles = store.collection("roles").unwrap();

        roles.create(doc! { "name": "admin" }).await.unwrap();
        let err = roles.create(doc! { "name": "admin" }).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref field, .. } if field == "name"));
        assert_eq!(roles.count().await.unwrap(), 1);

        // the rejected document's _id entry must not linger
        roles.create(doc! { "name": "editor" }).await.unwrap();
        assert_eq!(roles.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_required_field() {
        let store = SqliteStore::in_memory(schemas()).unwrap();
        let roles = store.collection("roles").unwrap();
        let err = roles.create(doc! { "label": "x" }).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingField { .. }));
        assert_eq!(roles.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("store.db");

        {
            let store = SqliteStore::open(&path, schemas()).unwrap();
            let roles = store.collection("roles").unwrap();
            roles
                .create(doc! { "name": "admin", "created": bson::DateTime::now() })
                .await
                .unwrap();
        }

        let store = SqliteStore::open(&path, schemas()).unwrap();
        let roles = store.collection("roles").unwrap();
        let docs = roles.find_all(&Projection::all()).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].get_datetime("created").is_ok());

        // unique index survives the reopen too
        assert!(roles.create(doc! { "name": "admin" }).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_collection() {
        let store = SqliteStore::in_memory(schemas()).unwrap();
        assert!(store.collection("users").err().unwrap().is_not_found());
        assert_eq!(store.collection_names(), vec!["roles", "posts"]);
    }
}
