//! Builder Adapter
//!
//! [`QueryBuilder`] is the thin boundary a front end talks to. It owns the
//! current `(tree, schema)` pair, runs edits through [`crate::operations`],
//! and replaces its state only when an edit succeeds. Every replacement is
//! published as a [`BuilderEvent`] on a broadcast channel.
//!
//! # Examples
//!
//! ```rust
//! use querybuilder_core::builder::QueryBuilder;
//! use querybuilder_core::operations::Edit;
//! use querybuilder_core::presets::{demo_schema, demo_tree};
//! use serde_json::json;
//!
//! let mut builder = QueryBuilder::with_tree(demo_schema().unwrap(), demo_tree());
//! let mut events = builder.subscribe();
//!
//! let edit: Edit = serde_json::from_value(json!({
//!     "type": "setValue",
//!     "ruleId": "ba88bb89-89ab-4cde-b012-31951b8f840f",
//!     "index": 0,
//!     "value": 40
//! }))
//! .unwrap();
//! builder.apply(&edit).unwrap();
//!
//! assert!(builder.query_string().contains("price BETWEEN 40 AND 100"));
//! assert_eq!(events.try_recv().unwrap().event_type(), "tree:edited");
//! ```

pub mod events;
pub mod outline;

pub use events::{BuilderEvent, ChangeCause};
pub use outline::{render_outline, OutlineRow, RowKind};

use crate::error::BuilderError;
use crate::export::{self, ExportError, LogicExpr};
use crate::models::{MalformedTreeError, Schema, Tree};
use crate::operations::{self, retype_values, validate_tree, Edit, TreeIssue, ValidationError};
use crate::storage::{StorageError, TreeStore};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Broadcast channel capacity for builder events
///
/// Subscribers that fall further behind than this receive `Lagged` and can
/// resync from the latest event, which always carries the full state.
const BUILDER_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Holds the current tree and schema of one editing session
pub struct QueryBuilder {
    tree: Tree,
    schema: Arc<Schema>,
    event_tx: broadcast::Sender<BuilderEvent>,
}

impl QueryBuilder {
    /// Start a session with an empty tree using the schema's default conjunction
    pub fn new(schema: Schema) -> Self {
        let tree = Tree::empty(schema.settings().default_conjunction);
        Self::with_tree(schema, tree)
    }

    /// Start a session from an existing tree
    pub fn with_tree(schema: Schema, tree: Tree) -> Self {
        let (event_tx, _) = broadcast::channel(BUILDER_EVENT_CHANNEL_CAPACITY);
        Self {
            tree,
            schema: Arc::new(schema),
            event_tx,
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Current state as an owned pair, for readers on other threads
    pub fn snapshot(&self) -> (Tree, Arc<Schema>) {
        (self.tree.clone(), self.schema.clone())
    }

    /// Subscribe to state changes
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use querybuilder_core::builder::QueryBuilder;
    /// # use querybuilder_core::presets::demo_schema;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let builder = QueryBuilder::new(demo_schema()?);
    /// let mut rx = builder.subscribe();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = rx.recv().await {
    ///         println!("{}: {}", event.event_type(), event.tree().to_json_string());
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<BuilderEvent> {
        self.event_tx.subscribe()
    }

    /// Ignores send errors; having no subscribers is normal
    fn emit_event(&self, cause: ChangeCause) {
        let _ = self.event_tx.send(BuilderEvent::Changed {
            tree: self.tree.clone(),
            schema: self.schema.clone(),
            cause,
        });
    }

    fn replace_tree(&mut self, tree: Tree, cause: ChangeCause) {
        self.tree = tree;
        self.emit_event(cause);
    }

    /// Replace the tree with a loaded one
    ///
    /// Stored values are retyped against the current schema and any remaining
    /// problems are logged; use [`QueryBuilder::issues`] to list them.
    fn install_loaded(&mut self, tree: Tree) {
        let tree = retype_values(&tree, &self.schema);
        let issues = validate_tree(&tree, &self.schema);
        if issues.is_empty() {
            tracing::info!("Loaded tree with {} rules", tree.rule_count());
        } else {
            tracing::warn!(
                "Loaded tree with {} rules and {} validation issues",
                tree.rule_count(),
                issues.len()
            );
        }
        self.replace_tree(tree, ChangeCause::Loaded);
    }

    /// Load a stored tree document
    ///
    /// On a malformed document the builder falls back to an empty tree,
    /// publishes that, and returns the error so the caller can report it.
    pub fn load(&mut self, document: &Value) -> Result<(), MalformedTreeError> {
        match Tree::load(document) {
            Ok(tree) => {
                self.install_loaded(tree);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to load tree, falling back to an empty tree: {}", e);
                let empty = Tree::empty(self.schema.settings().default_conjunction);
                self.replace_tree(empty, ChangeCause::LoadFailed);
                Err(e)
            }
        }
    }

    /// Swap the schema, keeping the tree
    ///
    /// Rules the new schema does not cover stay in the tree and show up in
    /// [`QueryBuilder::issues`].
    pub fn replace_schema(&mut self, schema: Schema) {
        self.schema = Arc::new(schema);
        let tree = retype_values(&self.tree, &self.schema);
        tracing::info!("Schema replaced ({} fields)", self.schema.fields().len());
        self.replace_tree(tree, ChangeCause::SchemaReplaced);
    }

    /// Run an edit function against the current state
    ///
    /// On success the result becomes the current tree and a change event is
    /// published. On failure the state is left untouched and the error is
    /// returned.
    pub fn update<F>(&mut self, name: &'static str, edit: F) -> Result<&Tree, ValidationError>
    where
        F: FnOnce(&Tree, &Schema) -> Result<Tree, ValidationError>,
    {
        match edit(&self.tree, self.schema.as_ref()) {
            Ok(tree) => {
                tracing::debug!("{} applied, tree: {}", name, tree.to_json_string());
                self.replace_tree(tree, ChangeCause::Edit(name));
                Ok(&self.tree)
            }
            Err(e) => {
                tracing::debug!("{} rejected: {}", name, e);
                Err(e)
            }
        }
    }

    /// Apply an [`Edit`] sent as data
    pub fn apply(&mut self, edit: &Edit) -> Result<&Tree, ValidationError> {
        self.update(edit.name(), |tree, schema| {
            operations::apply_edit(tree, schema, edit)
        })
    }

    /// Stored JSON form of the current tree
    pub fn saved_json(&self) -> Value {
        self.tree.serialize()
    }

    pub fn query_string(&self) -> String {
        export::to_query_string(&self.tree, &self.schema)
    }

    pub fn display_string(&self) -> String {
        export::to_display_string(&self.tree, &self.schema)
    }

    pub fn logic_expression(&self) -> Result<LogicExpr, ExportError> {
        export::to_logic_expression(&self.tree, &self.schema)
    }

    pub fn sql_where(&self) -> Result<String, ExportError> {
        export::to_sql_where(&self.tree, &self.schema)
    }

    /// Problems in the current tree against the current schema
    pub fn issues(&self) -> Vec<TreeIssue> {
        validate_tree(&self.tree, &self.schema)
    }

    pub fn outline(&self) -> Vec<OutlineRow> {
        render_outline(&self.tree, &self.schema)
    }

    /// Save the current tree under `name`
    pub fn save_to(&self, store: &dyn TreeStore, name: &str) -> Result<(), StorageError> {
        store.save(name, &self.tree)?;
        tracing::info!("Saved tree '{}' ({} rules)", name, self.tree.rule_count());
        Ok(())
    }

    /// Replace the current tree with the one saved under `name`
    ///
    /// Unlike [`QueryBuilder::load`], a failed read leaves the state as it
    /// was: nothing has been lost yet.
    pub fn load_from(&mut self, store: &dyn TreeStore, name: &str) -> Result<(), BuilderError> {
        let tree = store.load(name)?;
        self.install_loaded(tree);
        Ok(())
    }
}
