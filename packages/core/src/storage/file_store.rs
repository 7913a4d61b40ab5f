//! Directory-backed tree store

use crate::models::Tree;
use crate::storage::{validate_name, StorageError, TreeStore};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "json";

/// One `<name>.json` file per saved tree
///
/// Writes go to a temporary file first and are renamed into place, so a
/// crash never leaves a half-written tree behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!("Opened tree store at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, EXTENSION))
    }
}

impl TreeStore for JsonFileStore {
    fn save(&self, name: &str, tree: &Tree) -> Result<(), StorageError> {
        validate_name(name)?;
        let path = self.path_for(name);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&tree.serialize())?;

        fs::write(&tmp, json).map_err(|e| StorageError::io(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| StorageError::io(&path, e))?;

        tracing::info!("Saved tree '{}' to {}", name, path.display());
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Tree, StorageError> {
        validate_name(name)?;
        let path = self.path_for(name);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(StorageError::not_found(name)),
            Err(e) => return Err(StorageError::io(&path, e)),
        };
        tracing::debug!("Loaded tree '{}' from {}", name, path.display());
        Tree::from_json_str(&json).map_err(|source| StorageError::Malformed {
            name: name.to_string(),
            source,
        })
    }

    fn list(&self) -> Result<Vec<String>, StorageError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| StorageError::io(&self.dir, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StorageError::io(&self.dir, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if validate_name(stem).is_ok() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete(&self, name: &str) -> Result<(), StorageError> {
        validate_name(name)?;
        let path = self.path_for(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found(name)),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }
}
