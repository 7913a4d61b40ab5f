//! Builder Events
//!
//! Change notifications published by [`QueryBuilder`](super::QueryBuilder)
//! whenever its current `(tree, schema)` pair is replaced.
//!
//! # Architecture
//!
//! Events go out on a tokio broadcast channel, so a live preview, an
//! autosaver and the main editor can all follow the same builder without
//! holding a reference to it. Every event carries the complete new state;
//! trees share their nodes, so cloning one into an event is cheap.

use crate::models::{Schema, Tree};
use std::sync::Arc;

/// What replaced the builder's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeCause {
    /// A successful edit, named as in [`Edit::name`](crate::operations::Edit::name)
    Edit(&'static str),
    /// A tree was loaded
    Loaded,
    /// Loading failed and the builder fell back to an empty tree
    LoadFailed,
    /// The schema was swapped for a new one
    SchemaReplaced,
}

/// Events emitted by the builder
#[derive(Debug, Clone)]
pub enum BuilderEvent {
    /// The current tree or schema changed
    Changed {
        tree: Tree,
        schema: Arc<Schema>,
        cause: ChangeCause,
    },
}

impl BuilderEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            BuilderEvent::Changed { cause, .. } => match cause {
                ChangeCause::Edit(_) => "tree:edited",
                ChangeCause::Loaded => "tree:loaded",
                ChangeCause::LoadFailed => "tree:load-failed",
                ChangeCause::SchemaReplaced => "schema:replaced",
            },
        }
    }

    pub fn tree(&self) -> &Tree {
        match self {
            BuilderEvent::Changed { tree, .. } => tree,
        }
    }
}
