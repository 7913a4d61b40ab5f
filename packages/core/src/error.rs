//! Crate-wide error type
//!
//! Each layer has its own error enum. [`BuilderError`] wraps them for
//! callers that drive the whole builder and want a single error type.

use crate::export::ExportError;
use crate::models::{ConfigError, MalformedTreeError};
use crate::operations::ValidationError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Malformed tree: {0}")]
    MalformedTree(#[from] MalformedTreeError),

    #[error("Edit rejected: {0}")]
    Validation(#[from] ValidationError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type Result<T, E = BuilderError> = std::result::Result<T, E>;
