//! Storage error types

use crate::models::MalformedTreeError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised at the persistence boundary
#[derive(Error, Debug)]
pub enum StorageError {
    /// Names must be plain file-safe identifiers
    #[error("Invalid tree name '{name}'")]
    InvalidName { name: String },

    #[error("No saved tree named '{name}'")]
    NotFound { name: String },

    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to create storage directory: {0}")]
    DirectoryCreationFailed(#[from] std::io::Error),

    #[error("Failed to encode tree: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Saved tree '{name}' is malformed: {source}")]
    Malformed {
        name: String,
        source: MalformedTreeError,
    },
}

impl StorageError {
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
