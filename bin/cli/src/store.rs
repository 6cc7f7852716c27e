//! Credential store persisted as a JSON object on disk.

use async_trait::async_trait;
use gatehouse_identity::{CredentialStore, StoreError};
use rootcause::prelude::Report;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

type Entries = BTreeMap<String, String>;

/// A [`CredentialStore`] backed by a JSON file.
///
/// The file is read on every call so that separate invocations observe each
/// other's writes. A missing or empty file is an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    /// Creates a store at `path`. Nothing is touched until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Entries, String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(Entries::new()),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| format!("{} is not a JSON object of strings: {e}", self.path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(format!("failed to read {}: {e}", self.path.display())),
        }
    }

    async fn save(&self, entries: &Entries) -> Result<(), String> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
        }

        let contents = serde_json::to_string_pretty(entries).map_err(|e| e.to_string())?;
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, contents)
            .await
            .map_err(|e| format!("failed to write {}: {e}", staging.display()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| format!("failed to replace {}: {e}", self.path.display()))
    }
}

#[async_trait]
impl CredentialStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Report<StoreError>> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await.map_err(|reason| StoreError::ReadFailed {
            key: key.to_string(),
            reason,
        })?;
        Ok(entries.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), Report<StoreError>> {
        let _guard = self.lock.lock().await;
        let write_failed = |reason| StoreError::WriteFailed {
            key: key.to_string(),
            reason,
        };

        let mut entries = self.load().await.map_err(write_failed)?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await.map_err(write_failed)?;
        debug!(key, path = %self.path.display(), "stored credential");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Report<StoreError>> {
        let _guard = self.lock.lock().await;
        let remove_failed = |reason| StoreError::RemoveFailed {
            key: key.to_string(),
            reason,
        };

        let mut entries = self.load().await.map_err(remove_failed)?;
        if entries.remove(key).is_some() {
            self.save(&entries).await.map_err(remove_failed)?;
            debug!(key, path = %self.path.display(), "removed credential");
        }
        Ok(())
    }
}
