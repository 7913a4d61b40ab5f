//! Query Builder Core
//!
//! This crate provides the engine behind a schema-driven visual query
//! builder: a field registry, an immutable group/rule tree, pure edit
//! functions, and exporters to a query string, a logic expression and SQL.
//!
//! # Architecture
//!
//! - **Persistent trees**: every edit returns a new [`Tree`] that shares all
//!   untouched nodes with the previous one
//! - **Schema-checked edits**: nesting, operator, type and range rules are
//!   enforced on every edit, and a failed edit leaves the tree untouched
//! - **Thin adapter**: [`QueryBuilder`] holds the current state and publishes
//!   changes on a broadcast channel
//!
//! # Modules
//!
//! - [`models`] - Schema, fields, operators and the tree itself
//! - [`operations`] - Edit functions and tree validation
//! - [`export`] - Query string, logic expression and SQL exporters
//! - [`builder`] - Session adapter, change events and outline rows
//! - [`storage`] - Persistence boundary for saved trees
//! - [`config`] - JSON builder configuration
//! - [`presets`] - Demo schema and starting query

pub mod builder;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod operations;
pub mod presets;
pub mod storage;

// Re-export commonly used types
pub use builder::{BuilderEvent, ChangeCause, QueryBuilder};
pub use config::BuilderConfig;
pub use error::BuilderError;
pub use export::{to_display_string, to_logic_expression, to_query_string, to_sql_where};
pub use models::*;
pub use operations::{apply_edit, validate_tree, Edit, ValidationError};
pub use storage::{JsonFileStore, MemoryStore, TreeStore};
