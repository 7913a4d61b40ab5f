//! Error types for tree edits
//!
//! Every edit either returns a new tree or one of these errors; the previous
//! tree is never touched. Variants carry enough context for a front end to
//! show the message next to the offending node or value slot.

use thiserror::Error;

fn describe_range(min: &Option<f64>, max: &Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("[{}, {}]", min, max),
        (Some(min), None) => format!(">= {}", min),
        (None, Some(max)) => format!("<= {}", max),
        (None, None) => "unbounded".to_string(),
    }
}

/// Errors produced by edit operations and tree validation
///
/// # Examples
///
/// ```rust
/// use querybuilder_core::operations::ValidationError;
///
/// let err = ValidationError::Range {
///     field: "price".to_string(),
///     value: 5.0,
///     min: Some(10.0),
///     max: Some(100.0),
/// };
/// assert_eq!(
///     err.to_string(),
///     "Value 5 for field 'price' is outside the allowed range [10, 100]"
/// );
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Node '{node_id}' does not exist")]
    NodeNotFound { node_id: String },

    #[error("Node '{node_id}' is not a group")]
    NotAGroup { node_id: String },

    #[error("Node '{node_id}' is not a rule")]
    NotARule { node_id: String },

    #[error("The root group '{node_id}' cannot be removed")]
    RootRemoval { node_id: String },

    #[error("Node id '{node_id}' is already in use")]
    DuplicateId { node_id: String },

    #[error("Group '{group_id}' is at the maximum nesting depth of {max}")]
    MaxNestingExceeded { group_id: String, max: usize },

    #[error("The tree already holds the maximum of {max} rules")]
    MaxRulesExceeded { max: usize },

    #[error("Unknown field '{field}'")]
    UnknownField { field: String },

    #[error("Unknown operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("Operator '{operator}' is not allowed for field '{field}'")]
    OperatorNotAllowed { field: String, operator: String },

    #[error("Field '{field}' expects a {expected} value, got {actual}")]
    TypeMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Value {value} for field '{field}' is outside the allowed range {}", describe_range(.min, .max))]
    Range {
        field: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("'{value}' is not an option of field '{field}'")]
    OptionNotAllowed { field: String, value: String },

    #[error("Rule '{rule_id}' has {arity} value slots, index {index} is out of range")]
    ValueIndexOutOfRange {
        rule_id: String,
        index: usize,
        arity: usize,
    },

    #[error("Rule '{rule_id}' has {actual} value slots, operator expects {expected}")]
    ArityMismatch {
        rule_id: String,
        expected: usize,
        actual: usize,
    },

    #[error("Field '{field}' does not accept {value_source} values")]
    ValueSourceNotAllowed { field: String, value_source: String },

    #[error("Cannot move node '{node_id}': {reason}")]
    InvalidMove { node_id: String, reason: String },
}

impl ValidationError {
    pub fn node_not_found(node_id: impl ToString) -> Self {
        Self::NodeNotFound {
            node_id: node_id.to_string(),
        }
    }

    pub fn unknown_field(field: impl Into<String>) -> Self {
        Self::UnknownField {
            field: field.into(),
        }
    }

    pub fn type_mismatch(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_move(node_id: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidMove {
            node_id: node_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error concerns a single value slot rather than the tree
    /// shape
    pub fn is_value_error(&self) -> bool {
        matches!(
            self,
            Self::TypeMismatch { .. }
                | Self::Range { .. }
                | Self::OptionNotAllowed { .. }
                | Self::ValueSourceNotAllowed { .. }
        )
    }
}
