//! Tree Model
//!
//! A query is a tree of [`Group`](Node::Group) and [`Rule`](Node::Rule)
//! nodes rooted at a single group. Trees are persistent values: nodes live in
//! an id-keyed arena of reference-counted entries, and every edit produces a
//! new [`Tree`] that replaces only the entries it touches. Unchanged nodes are
//! shared between the old and the new tree, so holding on to an older
//! snapshot (for a preview, or for undo) costs only the replaced entries.
//!
//! # Architecture
//!
//! - **Arena**: persistent `im::HashMap` of `id → Arc<Node>`; an edit
//!   copies only the map path to the entries it replaces
//! - **Children**: ordered id lists on each group
//! - **Parent links**: ids only, used for lookups and depth checks
//! - **Equality**: structural, with a pointer fast path for shared entries
//! - **Rule count**: kept up to date by every draft write
//!
//! Edits go through [`crate::operations`]; this module only exposes reads
//! plus the crate-internal [`TreeDraft`] used to build new versions.

use crate::models::value::ValueSlot;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Unique node identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Boolean combinator applied to a group's children
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Some(Conjunction::And),
            "OR" => Some(Conjunction::Or),
            _ => None,
        }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupNode {
    pub id: NodeId,
    /// Lookup-only back reference; `None` for the root
    pub parent: Option<NodeId>,
    pub conjunction: Conjunction,
    pub negated: bool,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub field: String,
    pub operator: String,
    /// One slot per operand; the length follows the operator's arity
    pub values: Vec<ValueSlot>,
}

impl RuleNode {
    /// Whether every value slot holds a value
    pub fn is_complete(&self, arity: usize) -> bool {
        self.values.len() == arity && self.values.iter().all(ValueSlot::is_set)
    }
}

/// A tree node: either a group of children or a single rule
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Group(GroupNode),
    Rule(RuleNode),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Group(g) => &g.id,
            Node::Rule(r) => &r.id,
        }
    }

    pub fn parent(&self) -> Option<&NodeId> {
        match self {
            Node::Group(g) => g.parent.as_ref(),
            Node::Rule(r) => r.parent.as_ref(),
        }
    }

    pub fn as_group(&self) -> Option<&GroupNode> {
        match self {
            Node::Group(g) => Some(g),
            Node::Rule(_) => None,
        }
    }

    pub fn as_rule(&self) -> Option<&RuleNode> {
        match self {
            Node::Rule(r) => Some(r),
            Node::Group(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::Group(_) => "group",
            Node::Rule(_) => "rule",
        }
    }
}

type Arena = im::HashMap<NodeId, Arc<Node>>;

fn is_rule(node: &Node) -> bool {
    matches!(node, Node::Rule(_))
}

/// Immutable query tree
#[derive(Debug, Clone)]
pub struct Tree {
    root: NodeId,
    nodes: Arena,
    rules: usize,
}

impl Tree {
    /// Tree holding only an empty root group
    pub fn empty(conjunction: Conjunction) -> Self {
        Self::empty_with_id(NodeId::generate(), conjunction)
    }

    pub fn empty_with_id(root: NodeId, conjunction: Conjunction) -> Self {
        let group = GroupNode {
            id: root.clone(),
            parent: None,
            conjunction,
            negated: false,
            children: Vec::new(),
        };
        let nodes = Arena::unit(root.clone(), Arc::new(Node::Group(group)));
        Self {
            root,
            nodes,
            rules: 0,
        }
    }

    /// Assemble a tree from a complete arena. Callers guarantee the arena is
    /// connected and acyclic.
    pub(crate) fn from_arena(
        root: NodeId,
        nodes: impl IntoIterator<Item = (NodeId, Arc<Node>)>,
    ) -> Self {
        let nodes: Arena = nodes.into_iter().collect();
        let rules = nodes.values().filter(|n| is_rule(n)).count();
        Self { root, nodes, rules }
    }

    pub fn root_id(&self) -> &NodeId {
        &self.root
    }

    pub fn root(&self) -> &GroupNode {
        match self.nodes.get(&self.root).map(|n| n.as_ref()) {
            Some(Node::Group(g)) => g,
            // Every constructor inserts the root as a group and edits never
            // replace it with a rule.
            _ => unreachable!("tree root is always a group"),
        }
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(|n| n.as_ref())
    }

    pub fn group(&self, id: &NodeId) -> Option<&GroupNode> {
        self.get(id).and_then(Node::as_group)
    }

    pub fn rule(&self, id: &NodeId) -> Option<&RuleNode> {
        self.get(id).and_then(Node::as_rule)
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Total number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the root group has no children
    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.rules
    }

    /// Group depth of a node: the root is 0, its children 1, and so on
    pub fn depth_of(&self, id: &NodeId) -> Option<usize> {
        let mut node = self.get(id)?;
        let mut depth = 0;
        while let Some(parent) = node.parent() {
            node = self.get(parent)?;
            depth += 1;
            if depth > self.nodes.len() {
                return None;
            }
        }
        Some(depth)
    }

    /// Whether `id` lies inside the subtree rooted at `ancestor` (or is it)
    pub fn is_within(&self, id: &NodeId, ancestor: &NodeId) -> bool {
        let mut current = Some(id);
        let mut steps = 0;
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                return false;
            }
            current = self.get(cur).and_then(Node::parent);
        }
        false
    }

    /// Number of group levels below `id`; a rule or an empty group has height 0
    pub fn group_height(&self, id: &NodeId) -> usize {
        match self.get(id) {
            Some(Node::Group(g)) => g
                .children
                .iter()
                .filter(|child| matches!(self.get(child), Some(Node::Group(_))))
                .map(|child| 1 + self.group_height(child))
                .max()
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Pre-order walk yielding each node with its depth
    pub fn walk(&self) -> Vec<(usize, &Node)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0usize, &self.root)];
        while let Some((depth, id)) = stack.pop() {
            let Some(node) = self.get(id) else { continue };
            out.push((depth, node));
            if let Node::Group(g) = node {
                for child in g.children.iter().rev() {
                    stack.push((depth + 1, child));
                }
            }
        }
        out
    }

    /// Every node id in the subtree rooted at `id`, `id` first
    pub fn subtree_ids(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            if let Some(Node::Group(g)) = self.get(&current) {
                stack.extend(g.children.iter().rev().cloned());
            }
            out.push(current);
        }
        out
    }

    /// Whether both trees hold the very same entry for `id`
    ///
    /// Used to observe structural sharing between versions.
    pub fn shares_node(&self, other: &Tree, id: &NodeId) -> bool {
        match (self.nodes.get(id), other.nodes.get(id)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub(crate) fn draft(&self) -> TreeDraft {
        TreeDraft {
            root: self.root.clone(),
            nodes: self.nodes.clone(),
            rules: self.rules,
        }
    }
}

impl PartialEq for Tree {
    fn eq(&self, other: &Self) -> bool {
        if self.root != other.root || self.rules != other.rules {
            return false;
        }
        if self.nodes.ptr_eq(&other.nodes) {
            return true;
        }
        self.nodes.len() == other.nodes.len()
            && self.nodes.iter().all(|(id, node)| {
                other
                    .nodes
                    .get(id)
                    .is_some_and(|o| Arc::ptr_eq(node, o) || node == o)
            })
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::empty(Conjunction::And)
    }
}

/// Builder for the next version of a tree
///
/// Cloning the source arena is O(1); each write copies only the map nodes on
/// the path to the replaced entry. Entries that are not replaced stay shared
/// with the source tree.
pub(crate) struct TreeDraft {
    root: NodeId,
    nodes: Arena,
    rules: usize,
}

impl TreeDraft {
    pub(crate) fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id).map(|n| n.as_ref())
    }

    pub(crate) fn put(&mut self, node: Node) {
        let id = node.id().clone();
        let added = is_rule(&node);
        if let Some(old) = self.nodes.insert(id, Arc::new(node)) {
            if is_rule(&old) {
                self.rules -= 1;
            }
        }
        if added {
            self.rules += 1;
        }
    }

    pub(crate) fn remove(&mut self, id: &NodeId) {
        if let Some(old) = self.nodes.remove(id) {
            if is_rule(&old) {
                self.rules -= 1;
            }
        }
    }

    pub(crate) fn finish(self) -> Tree {
        Tree {
            root: self.root,
            nodes: self.nodes,
            rules: self.rules,
        }
    }
}
