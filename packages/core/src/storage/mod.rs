//! Persistence boundary
//!
//! The core never decides where trees live. Embedding applications pass a
//! [`TreeStore`] to the builder when they want to save or restore a session.
//! Two implementations ship with the crate:
//!
//! - [`JsonFileStore`]: one pretty-printed JSON document per name in a directory
//! - [`MemoryStore`]: in-process documents for tests and previews
//!
//! Both store the same JSON produced by [`Tree::serialize`], so a saved tree
//! can move between them.

pub mod error;
pub mod file_store;
pub mod memory_store;

pub use error::StorageError;
pub use file_store::JsonFileStore;
pub use memory_store::MemoryStore;

use crate::models::Tree;
use regex::Regex;
use std::sync::OnceLock;

/// Saved tree names: letters, digits, `_` and `-`, up to 64 characters
const TREE_NAME_PATTERN: &str = r"^[A-Za-z0-9][A-Za-z0-9_-]{0,63}$";

pub(crate) fn validate_name(name: &str) -> Result<(), StorageError> {
    static TREE_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = TREE_NAME_REGEX.get_or_init(|| Regex::new(TREE_NAME_PATTERN).unwrap());
    if regex.is_match(name) {
        Ok(())
    } else {
        Err(StorageError::invalid_name(name))
    }
}

/// Named storage for saved trees
///
/// Implementations must be `Send + Sync` so a store can be shared between
/// a live editor and a preview.
pub trait TreeStore: Send + Sync {
    /// Save `tree` under `name`, replacing any previous version
    fn save(&self, name: &str, tree: &Tree) -> Result<(), StorageError>;

    /// Load the tree saved under `name`
    fn load(&self, name: &str) -> Result<Tree, StorageError>;

    /// Names of all saved trees, sorted
    fn list(&self) -> Result<Vec<String>, StorageError>;

    fn delete(&self, name: &str) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("demo").is_ok());
        assert!(validate_name("price-filter_2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("../etc/passwd").is_err());
        assert!(validate_name("-leading").is_err());
        assert!(validate_name(&"x".repeat(65)).is_err());
    }
}
