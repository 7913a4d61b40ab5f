//! Data Models
//!
//! This module contains the data structures every other layer works on:
//!
//! - [`Schema`] - validated field registry plus builder settings
//! - [`Field`] - one queryable attribute with its operators and constraints
//! - [`Operator`] - built-in operator catalog with export templates
//! - [`Tree`] - immutable, structurally shared group/rule tree
//! - [`RuleValue`] / [`ValueSlot`] - typed rule operands
//!
//! Loading and saving trees lives in `tree_json`; edits live in
//! [`crate::operations`].

pub mod error;
pub mod field;
pub mod operator;
pub mod schema;
pub mod tree;
pub mod tree_json;
pub mod value;

pub use error::{ConfigError, MalformedTreeError};
pub use field::{Field, FieldConstraints, ListValue, WidgetKind};
pub use operator::{
    builtin_operators, default_operators_for, find_operator, LogicKind, LogicMapping, Operator,
    QueryTemplate, SqlTemplate,
};
pub use schema::{BuilderSettings, Schema};
pub use tree::{Conjunction, GroupNode, Node, NodeId, RuleNode, Tree};
pub use tree_json::{load_tree, serialize_tree, MAX_LOAD_DEPTH};
pub use value::{RuleValue, ValueSlot, ValueSource, ValueType, DATE_FORMAT};
