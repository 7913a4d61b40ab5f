//! In-memory tree store

use crate::models::Tree;
use crate::storage::{validate_name, StorageError, TreeStore};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// Keeps saved trees as JSON documents in memory
///
/// Documents are stored serialized, so loading goes through the same
/// validation as loading from disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn documents(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // The map stays consistent even if a holder panicked
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TreeStore for MemoryStore {
    fn save(&self, name: &str, tree: &Tree) -> Result<(), StorageError> {
        validate_name(name)?;
        let json = tree.to_json_string();
        tracing::debug!("Saving tree '{}' in memory ({} bytes)", name, json.len());
        self.documents().insert(name.to_string(), json);
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Tree, StorageError> {
        validate_name(name)?;
        let json = self
            .documents()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::not_found(name))?;
        Tree::from_json_str(&json).map_err(|source| StorageError::Malformed {
            name: name.to_string(),
            source,
        })
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = self.documents().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<(), StorageError> {
        validate_name(name)?;
        self.documents()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found(name))
    }
}
