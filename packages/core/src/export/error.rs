//! Export errors
//!
//! An export failure only affects the export call; the tree is untouched.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExportError {
    #[error("Operator '{operator}' of field '{field}' has no {format} mapping")]
    UnsupportedOperator {
        operator: String,
        field: String,
        format: String,
    },

    #[error("Rule '{rule_id}' uses unknown field '{field}'")]
    UnknownField { rule_id: String, field: String },

    #[error("Rule '{rule_id}' uses unknown operator '{operator}'")]
    UnknownOperator { rule_id: String, operator: String },
}

impl ExportError {
    pub fn unsupported_operator(
        operator: impl Into<String>,
        field: impl Into<String>,
        format: impl Into<String>,
    ) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
            field: field.into(),
            format: format.into(),
        }
    }
}
