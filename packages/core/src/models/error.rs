//! Model-level error types
//!
//! `ConfigError` is raised while registering a schema and is fatal for the
//! embedding application. `MalformedTreeError` is raised while loading a
//! stored tree; callers usually recover by falling back to an empty tree.

use thiserror::Error;

/// Errors raised while building a [`Schema`](crate::models::Schema)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Duplicate field key: {key}")]
    DuplicateField { key: String },

    #[error("Invalid field key '{key}': keys must start with a letter or underscore")]
    InvalidFieldKey { key: String },

    #[error("Field '{field}' declares unknown operator '{operator}'")]
    UnknownOperator { field: String, operator: String },

    #[error("Field '{field}' declares operator '{operator}' which does not support {value_type} values")]
    OperatorNotSupported {
        field: String,
        operator: String,
        value_type: String,
    },

    #[error("Field '{field}' has min {min} greater than max {max}")]
    InvalidRange { field: String, min: f64, max: f64 },

    #[error("Field '{field}' is a {value_type} field but declares no list values")]
    MissingListValues { field: String, value_type: String },

    #[error("Field '{field}' has no usable operators")]
    NoOperators { field: String },

    #[error("Field '{field}' declares no value sources")]
    NoValueSources { field: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    #[error("Failed to read configuration: {0}")]
    Io(String),
}

impl ConfigError {
    pub fn duplicate_field(key: impl Into<String>) -> Self {
        Self::DuplicateField { key: key.into() }
    }

    pub fn operator_not_supported(
        field: impl Into<String>,
        operator: impl Into<String>,
        value_type: impl Into<String>,
    ) -> Self {
        Self::OperatorNotSupported {
            field: field.into(),
            operator: operator.into(),
            value_type: value_type.into(),
        }
    }
}

/// Errors raised while loading a tree from its JSON representation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedTreeError {
    #[error("Expected a JSON object at {path}")]
    NotAnObject { path: String },

    #[error("Unknown node type '{node_type}' at {path}")]
    UnknownNodeType { node_type: String, path: String },

    #[error("Missing node type at {path}")]
    MissingNodeType { path: String },

    #[error("Invalid node id at {path}: {reason}")]
    InvalidId { path: String, reason: String },

    #[error("Node id '{id}' appears more than once")]
    DuplicateId { id: String },

    #[error("Cyclic reference: node '{id}' is its own ancestor")]
    Cycle { id: String },

    #[error("The root node must be a group")]
    RootNotGroup,

    #[error("Invalid property '{property}' on node '{id}': {reason}")]
    InvalidProperty {
        id: String,
        property: String,
        reason: String,
    },

    #[error("Invalid value in slot {index} of rule '{id}': {reason}")]
    InvalidValue {
        id: String,
        index: usize,
        reason: String,
    },

    #[error("Tree is nested deeper than {max} levels")]
    TooDeep { max: usize },

    #[error("Failed to parse tree JSON: {0}")]
    Parse(String),
}

impl MalformedTreeError {
    pub fn invalid_property(
        id: impl Into<String>,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            id: id.into(),
            property: property.into(),
            reason: reason.into(),
        }
    }
}
