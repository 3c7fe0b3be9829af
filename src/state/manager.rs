//! State manager implementation
//!
//! Persists one [`InstanceRecord`] per query instance, either as
//! `{dir}/{instance}.json` files written atomically or in memory.

use super::types::InstanceRecord;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Check that an instance id is usable as a file name
pub fn validate_instance_id(instance_id: &str) -> Result<()> {
    if instance_id.is_empty() {
        return Err(Error::invalid_value("instance_id", "must not be empty"));
    }
    if instance_id.starts_with('.') {
        return Err(Error::invalid_value("instance_id", "must not start with '.'"));
    }
    if let Some(c) = instance_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(Error::invalid_value(
            "instance_id",
            format!("invalid character {c:?} in '{instance_id}'"),
        ));
    }
    Ok(())
}

/// State manager for persisting and loading instance records
#[derive(Debug, Clone)]
pub struct StateManager {
    /// Directory holding one file per instance; empty for in-memory mode
    dir: PathBuf,
    /// Records held in memory when there is no directory
    records: Arc<RwLock<HashMap<String, InstanceRecord>>>,
    /// Serializes create-if-absent
    create_lock: Arc<Mutex<()>>,
}

impl StateManager {
    /// Create a state manager persisting under `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            records: Arc::new(RwLock::new(HashMap::new())),
            create_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Create an in-memory state manager (no file persistence)
    pub fn in_memory() -> Self {
        Self::new(PathBuf::new())
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.dir.as_os_str().is_empty()
    }

    /// Directory holding the state files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the state file for `instance_id`
    pub fn path_for(&self, instance_id: &str) -> Result<PathBuf> {
        validate_instance_id(instance_id)?;
        Ok(self.dir.join(format!("{instance_id}.json")))
    }

    /// Load the record of an instance, if it exists
    pub async fn load(&self, instance_id: &str) -> Result<Option<InstanceRecord>> {
        let path = self.path_for(instance_id)?;

        if self.is_in_memory() {
            return Ok(self.records.read().await.get(instance_id).cloned());
        }

        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::state(format!(
                    "Failed to read state file {}: {e}",
                    path.display()
                )))
            }
        };

        let record = serde_json::from_str(&contents).map_err(|e| {
            Error::state(format!("Failed to parse state file {}: {e}", path.display()))
        })?;
        Ok(Some(record))
    }

    /// Save (replace) the record of an instance
    pub async fn save(&self, record: &InstanceRecord) -> Result<()> {
        let path = self.path_for(&record.instance_id)?;

        if self.is_in_memory() {
            self.records
                .write()
                .await
                .insert(record.instance_id.clone(), record.clone());
            return Ok(());
        }

        let contents = serde_json::to_string_pretty(record)
            .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::state(format!("Failed to create state directory: {e}")))?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::state(format!("Failed to write state file: {e}")))?;

        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| Error::state(format!("Failed to rename state file: {e}")))?;

        debug!(instance = %record.instance_id, "state saved");
        Ok(())
    }

    /// Save a record only if the instance does not exist yet
    ///
    /// Returns `false` without writing if it already exists.
    pub async fn create(&self, record: &InstanceRecord) -> Result<bool> {
        let _guard = self.create_lock.lock().await;

        if self.exists(&record.instance_id).await? {
            return Ok(false);
        }
        self.save(record).await?;
        Ok(true)
    }

    /// Check if an instance has persisted state
    pub async fn exists(&self, instance_id: &str) -> Result<bool> {
        let path = self.path_for(instance_id)?;

        if self.is_in_memory() {
            return Ok(self.records.read().await.contains_key(instance_id));
        }

        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| Error::state(format!("Failed to check state file: {e}")))
    }

    /// Delete the state of an instance; `false` if there was none
    pub async fn remove(&self, instance_id: &str) -> Result<bool> {
        let path = self.path_for(instance_id)?;

        if self.is_in_memory() {
            return Ok(self.records.write().await.remove(instance_id).is_some());
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::state(format!("Failed to remove state file: {e}"))),
        }
    }

    /// Ids of every instance with persisted state, sorted
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut ids = if self.is_in_memory() {
            self.records.read().await.keys().cloned().collect()
        } else {
            let mut ids = Vec::new();
            let mut entries = match tokio::fs::read_dir(&self.dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
                Err(e) => return Err(Error::state(format!("Failed to list state directory: {e}"))),
            };
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                if let Some(id) = name.to_str().and_then(|n| n.strip_suffix(".json")) {
                    ids.push(id.to_string());
                }
            }
            ids
        };

        ids.sort();
        Ok(ids)
    }

    /// Export an instance record as pretty-printed JSON
    pub async fn to_json_pretty(&self, instance_id: &str) -> Result<Option<String>> {
        self.load(instance_id)
            .await?
            .map(|record| {
                serde_json::to_string_pretty(&record)
                    .map_err(|e| Error::state(format!("Failed to serialize state: {e}")))
            })
            .transpose()
    }
}
