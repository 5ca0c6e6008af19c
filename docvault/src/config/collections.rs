//! Default collection set of the admin application, in restore order.

use serde::{Deserialize, Serialize};

/// Credential written for restored users whose export carried none.
///
/// It is not a valid hash of any password, so the account cannot be logged
/// into until an operator resets it.
pub const PLACEHOLDER_CREDENTIAL: &str = "!reset-required!";

/// One collection covered by backups.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Snapshot key (lowercase, no whitespace)
    pub key: String,
    /// Store collection name when it differs from the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Fields the store requires on create
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Fields the store keeps unique
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique: Vec<String>,
    /// Fields left out of exports
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redact: Vec<String>,
    /// Value filled in on import when a record lacks the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<PlaceholderConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PlaceholderConfig {
    pub field: String,
    pub value: String,
}

impl CollectionConfig {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            collection: None,
            required: Vec::new(),
            unique: Vec::new(),
            redact: Vec::new(),
            placeholder: None,
        }
    }

    /// Name of the collection in the store.
    pub fn store_name(&self) -> &str {
        self.collection.as_deref().unwrap_or(&self.key)
    }

    fn required(mut self, fields: &[&str]) -> Self {
        self.required = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    fn unique(mut self, fields: &[&str]) -> Self {
        self.unique = fields.iter().map(|f| f.to_string()).collect();
        self
    }
}

pub(crate) fn default_collections() -> Vec<CollectionConfig> {
    let mut users = CollectionConfig::new("users")
        .required(&["email", "password"])
        .unique(&["email"]);
    users.redact = vec!["password".to_string()];
    users.placeholder = Some(PlaceholderConfig {
        field: "password".to_string(),
        value: PLACEHOLDER_CREDENTIAL.to_string(),
    });

    vec![
        CollectionConfig::new("roles").required(&["name"]).unique(&["name"]),
        users,
        CollectionConfig::new("categories")
            .required(&["name"])
            .unique(&["slug"]),
        CollectionConfig::new("pages").required(&["title"]).unique(&["slug"]),
        CollectionConfig::new("posts").required(&["title"]).unique(&["slug"]),
        CollectionConfig::new("linkpages").unique(&["slug"]),
        CollectionConfig::new("links").required(&["url"]),
        CollectionConfig::new("reminders").required(&["title", "due_at"]),
        CollectionConfig::new("settings").unique(&["key"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_list_roles_and_users_first() {
        let defaults = default_collections();
        let keys: Vec<&str> = defaults.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(&keys[..2], &["roles", "users"]);

        let users = &defaults[1];
        assert_eq!(users.redact, vec!["password"]);
        assert_eq!(
            users.placeholder.as_ref().map(|p| p.value.as_str()),
            Some(PLACEHOLDER_CREDENTIAL)
        );
    }

    #[test]
    fn test_store_name_defaults_to_key() {
        let mut entry = CollectionConfig::new("linkpages");
        assert_eq!(entry.store_name(), "linkpages");
        entry.collection = Some("link_pages".to_string());
        assert_eq!(entry.store_name(), "link_pages");
    }
}
