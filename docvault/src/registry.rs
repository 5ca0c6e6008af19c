//! Collection registry: the ordered list of collections a backup covers.
//!
//! Order is the dependency contract. Collections that others reference
//! (roles, users) come first so they already exist when referencing records
//! are restored. The registry iterates in exactly the order it was built and
//! never reorders or checks references itself.
//!
//! Per-collection exceptions hang off a descriptor as hooks:
//! - [`ExportHook`] narrows the find-all projection (credential redaction)
//! - [`ImportHook`] adjusts a record before it is created (placeholder credential)

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document};
use docvault_store::{CollectionAccessor, DocumentStore, Projection};

use crate::config::BackupConfig;
use crate::error::{Error, Result};

/// Hook applied when a collection is exported.
pub trait ExportHook: Send + Sync + fmt::Debug {
    /// Narrow the projection used to read the collection.
    fn projection(&self, projection: Projection) -> Projection;

    /// One-line description for listings.
    fn describe(&self) -> String;
}

/// Hook applied to each record of a collection before it is created on import.
pub trait ImportHook: Send + Sync + fmt::Debug {
    fn prepare(&self, record: &mut Document);

    /// One-line description for listings.
    fn describe(&self) -> String;
}

/// Leave the named fields out of the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactFields {
    fields: Vec<String>,
}

impl RedactFields {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl ExportHook for RedactFields {
    fn projection(&self, projection: Projection) -> Projection {
        self.fields
            .iter()
            .fold(projection, |p, field| p.exclude(field.clone()))
    }

    fn describe(&self) -> String {
        format!("redacts {}", self.fields.join(", "))
    }
}

/// Fill a field with a fixed value when a record lacks it.
///
/// A field counts as lacking when it is absent, null or an empty string,
/// which covers both a redacted export and an empty spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderField {
    field: String,
    value: String,
}

impl PlaceholderField {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl ImportHook for PlaceholderField {
    fn prepare(&self, record: &mut Document) {
        let lacking = match record.get(&self.field) {
            None | Some(Bson::Null) => true,
            Some(Bson::String(s)) => s.is_empty(),
            Some(_) => false,
        };
        if lacking {
            record.insert(self.field.clone(), self.value.clone());
        }
    }

    fn describe(&self) -> String {
        format!("fills missing {} with placeholder", self.field)
    }
}

/// One registry entry: a stable key, the accessor for its collection and
/// optional hooks.
#[derive(Clone)]
pub struct CollectionDescriptor {
    key: String,
    accessor: Arc<dyn CollectionAccessor>,
    export_hook: Option<Arc<dyn ExportHook>>,
    import_hook: Option<Arc<dyn ImportHook>>,
}

impl fmt::Debug for CollectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionDescriptor")
            .field("key", &self.key)
            .field("collection", &self.accessor.name())
            .field("export_hook", &self.export_hook)
            .field("import_hook", &self.import_hook)
            .finish()
    }
}

impl CollectionDescriptor {
    pub fn new(key: impl Into<String>, accessor: Arc<dyn CollectionAccessor>) -> Self {
        Self {
            key: key.into(),
            accessor,
            export_hook: None,
            import_hook: None,
        }
    }

    pub fn with_export_hook(mut self, hook: impl ExportHook + 'static) -> Self {
        self.export_hook = Some(Arc::new(hook));
        self
    }

    pub fn with_import_hook(mut self, hook: impl ImportHook + 'static) -> Self {
        self.import_hook = Some(Arc::new(hook));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn accessor(&self) -> &Arc<dyn CollectionAccessor> {
        &self.accessor
    }

    pub fn export_hook(&self) -> Option<&Arc<dyn ExportHook>> {
        self.export_hook.as_ref()
    }

    pub fn import_hook(&self) -> Option<&Arc<dyn ImportHook>> {
        self.import_hook.as_ref()
    }

    /// Projection for the export read, after the export hook (if any).
    pub fn projection(&self) -> Projection {
        match &self.export_hook {
            Some(hook) => hook.projection(Projection::all()),
            None => Projection::all(),
        }
    }

    /// Run the import hook (if any) on a record about to be created.
    pub fn prepare(&self, record: &mut Document) {
        if let Some(hook) = &self.import_hook {
            hook.prepare(record);
        }
    }
}

/// Ordered, immutable list of collection descriptors.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    descriptors: Vec<CollectionDescriptor>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Build the registry described by configuration, resolving each
    /// collection through the store.
    pub fn from_config(config: &BackupConfig, store: &dyn DocumentStore) -> Result<Self> {
        let mut builder = Self::builder();
        for entry in &config.collections {
            let accessor = store.collection(entry.store_name())?;
            let mut descriptor = CollectionDescriptor::new(entry.key.clone(), accessor);
            if !entry.redact.is_empty() {
                descriptor = descriptor.with_export_hook(RedactFields::new(entry.redact.clone()));
            }
            if let Some(placeholder) = &entry.placeholder {
                descriptor = descriptor.with_import_hook(PlaceholderField::new(
                    placeholder.field.clone(),
                    placeholder.value.clone(),
                ));
            }
            builder = builder.collection(descriptor);
        }
        builder.build()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CollectionDescriptor> {
        self.descriptors.iter()
    }

    pub fn get(&self, key: &str) -> Option<&CollectionDescriptor> {
        self.descriptors.iter().find(|d| d.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.descriptors.iter().map(|d| d.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Appends descriptors in order and validates keys on `build`.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    descriptors: Vec<CollectionDescriptor>,
}

impl RegistryBuilder {
    pub fn collection(mut self, descriptor: CollectionDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Keys must be non-empty, lowercase, free of whitespace and unique, so
    /// that a key survives the sheet-name normalization of the tabular format.
    pub fn build(self) -> Result<Registry> {
        let mut seen = HashSet::new();
        for descriptor in &self.descriptors {
            let key = descriptor.key.as_str();
            if key.is_empty() {
                return Err(Error::Config("collection key must not be empty".to_string()));
            }
            if key.chars().any(char::is_whitespace) || key.to_lowercase() != key {
                return Err(Error::Config(format!(
                    "collection key '{}' must be lowercase without whitespace",
                    key
                )));
            }
            if !seen.insert(key) {
                return Err(Error::Config(format!("duplicate collection key '{}'", key)));
            }
        }
        Ok(Registry {
            descriptors: self.descriptors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docvault_store::{CollectionSchema, MemoryStore};

    fn store() -> MemoryStore {
        MemoryStore::new([
            CollectionSchema::new("roles"),
            CollectionSchema::new("users"),
            CollectionSchema::new("posts"),
        ])
    }

    fn descriptor(store: &MemoryStore, key: &str) -> CollectionDescriptor {
        CollectionDescriptor::new(key, store.collection(key).unwrap())
    }

    #[test]
    fn test_iteration_follows_build_order() {
        let store = store();
        let registry = Registry::builder()
            .collection(descriptor(&store, "users"))
            .collection(descriptor(&store, "roles"))
            .collection(descriptor(&store, "posts"))
            .build()
            .unwrap();

        let keys: Vec<&str> = registry.keys().collect();
        assert_eq!(keys, vec!["users", "roles", "posts"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("roles"));
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_rejects_bad_keys() {
        let store = store();
        let accessor = store.collection("roles").unwrap();

        let err = Registry::builder()
            .collection(CollectionDescriptor::new("Roles", accessor.clone()))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Registry::builder()
            .collection(CollectionDescriptor::new("link pages", accessor.clone()))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = Registry::builder()
            .collection(CollectionDescriptor::new("roles", accessor.clone()))
            .collection(CollectionDescriptor::new("roles", accessor))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_redact_hook_projection() {
        let store = store();
        let users = descriptor(&store, "users").with_export_hook(RedactFields::new(["password"]));
        assert!(users.projection().excludes("password"));
        assert!(descriptor(&store, "roles").projection().is_empty());
    }

    #[test]
    fn test_placeholder_hook() {
        let hook = PlaceholderField::new("password", "!reset-required!");

        let mut missing = doc! { "email": "a@example.com" };
        hook.prepare(&mut missing);
        assert_eq!(missing.get_str("password").unwrap(), "!reset-required!");

        let mut null = doc! { "email": "a@example.com", "password": Bson::Null };
        hook.prepare(&mut null);
        assert_eq!(null.get_str("password").unwrap(), "!reset-required!");

        let mut present = doc! { "email": "a@example.com", "password": "$2b$10$hash" };
        hook.prepare(&mut present);
        assert_eq!(present.get_str("password").unwrap(), "$2b$10$hash");
    }
}
