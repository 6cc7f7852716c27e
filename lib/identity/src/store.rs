//! Credential store capability.
//!
//! The flow persists the access token and the decoded claims through this
//! trait and never touches a concrete storage mechanism. Browser local
//! storage, a file, or a network-backed store can all sit behind it.

use crate::error::StoreError;
use async_trait::async_trait;
use rootcause::prelude::Report;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Key/value storage for persisted credentials.
///
/// Every call is awaited to completion before the flow proceeds. Removing a
/// key that is not present must succeed.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, Report<StoreError>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), Report<StoreError>>;

    /// Removes `key`. Absent keys are not an error.
    async fn remove(&self, key: &str) -> Result<(), Report<StoreError>>;
}

/// Names of the keys holding persisted credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialKeys {
    access_token: String,
    claims: String,
}

impl CredentialKeys {
    /// Derives the key names from a prefix.
    #[must_use]
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            access_token: format!("{prefix}access_token"),
            claims: format!("{prefix}claims"),
        }
    }

    /// Key of the stored access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Key of the stored claims blob.
    #[must_use]
    pub fn claims(&self) -> &str {
        &self.claims
    }
}

/// In-memory credential store.
///
/// Contents live as long as the store value; useful for tests and for hosts
/// that keep their own persistence outside the flow.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Report<StoreError>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Report<StoreError>> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Report<StoreError>> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_prefix() {
        let keys = CredentialKeys::with_prefix("myapp.");
        assert_eq!(keys.access_token(), "myapp.access_token");
        assert_eq!(keys.claims(), "myapp.claims");
    }

    #[test]
    fn empty_prefix_gives_bare_keys() {
        let keys = CredentialKeys::with_prefix("");
        assert_eq!(keys.access_token(), "access_token");
        assert_eq!(keys.claims(), "claims");
    }

    #[tokio::test]
    async fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);

        store.set("k", "v1").await.expect("set");
        store.set("k", "v2").await.expect("overwrite");
        assert_eq!(store.get("k").await.expect("get"), Some("v2".to_string()));
        assert_eq!(store.len().await, 1);

        store.remove("k").await.expect("remove");
        assert_eq!(store.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn memory_store_remove_absent_key_is_ok() {
        let store = MemoryStore::new();
        assert!(store.remove("never-set").await.is_ok());
    }
}
