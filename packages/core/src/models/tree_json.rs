//! Stored JSON form of a tree
//!
//! The format follows the nested group/rule layout front ends already
//! exchange:
//!
//! ```json
//! {
//!   "id": "9a1c…",
//!   "type": "group",
//!   "properties": { "conjunction": "AND", "not": false },
//!   "children1": [
//!     {
//!       "type": "rule",
//!       "id": "ba88bb89-89ab-4cde-b012-31951b8f840f",
//!       "properties": {
//!         "field": "price",
//!         "operator": "between",
//!         "value": [30, 100],
//!         "valueSrc": ["value", "value"],
//!         "valueType": ["number", "number"],
//!         "valueError": [null, null]
//!       }
//!     }
//!   ]
//! }
//! ```
//!
//! `children1` may also be an object keyed by child id. Ids are user
//! controlled, so loading rejects duplicates and ancestor cycles and bounds
//! the nesting depth. Missing ids are generated.

use crate::models::error::MalformedTreeError;
use crate::models::tree::{Conjunction, GroupNode, Node, NodeId, RuleNode, Tree};
use crate::models::value::{RuleValue, ValueSlot, ValueSource, ValueType};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Deepest nesting accepted by [`Tree::load`]
pub const MAX_LOAD_DEPTH: usize = 64;

impl Tree {
    /// Load a tree from its stored JSON form
    ///
    /// # Errors
    ///
    /// Returns `MalformedTreeError` for unknown or missing node types, ids that
    /// are not non-empty strings, duplicated ids, ancestor cycles, a rule at
    /// the root, undecodable properties, or nesting beyond
    /// [`MAX_LOAD_DEPTH`].
    pub fn load(value: &Value) -> Result<Tree, MalformedTreeError> {
        let mut loader = Loader::default();
        let root = loader.load_node(value, None, "$", 0, true)?;
        Ok(Tree::from_arena(root, loader.nodes))
    }

    /// Parse and load a JSON string
    pub fn from_json_str(s: &str) -> Result<Tree, MalformedTreeError> {
        let value: Value =
            serde_json::from_str(s).map_err(|e| MalformedTreeError::Parse(e.to_string()))?;
        Tree::load(&value)
    }

    /// Stored JSON form, accepted back by [`Tree::load`]
    pub fn serialize(&self) -> Value {
        self.node_json(self.root_id())
    }

    pub fn to_json_string(&self) -> String {
        self.serialize().to_string()
    }

    fn node_json(&self, id: &NodeId) -> Value {
        match self.get(id) {
            Some(Node::Group(g)) => json!({
                "id": g.id,
                "type": "group",
                "properties": {
                    "conjunction": g.conjunction,
                    "not": g.negated,
                },
                "children1": g.children.iter().map(|c| self.node_json(c)).collect::<Vec<_>>(),
            }),
            Some(Node::Rule(r)) => json!({
                "id": r.id,
                "type": "rule",
                "properties": {
                    "field": r.field,
                    "operator": r.operator,
                    "value": r.values.iter()
                        .map(|s| s.value.as_ref().map_or(Value::Null, RuleValue::to_json))
                        .collect::<Vec<_>>(),
                    "valueSrc": r.values.iter().map(|s| s.source.as_str()).collect::<Vec<_>>(),
                    "valueType": r.values.iter()
                        .map(|s| match s.value.as_ref().and_then(RuleValue::value_type) {
                            Some(vt) => json!(vt.as_str()),
                            None => Value::Null,
                        })
                        .collect::<Vec<_>>(),
                    "valueError": r.values.iter().map(|s| s.error.clone()).collect::<Vec<_>>(),
                },
            }),
            None => Value::Null,
        }
    }
}

/// Free-function form of [`Tree::load`]
pub fn load_tree(value: &Value) -> Result<Tree, MalformedTreeError> {
    Tree::load(value)
}

/// Free-function form of [`Tree::serialize`]
pub fn serialize_tree(tree: &Tree) -> Value {
    tree.serialize()
}

#[derive(Default)]
struct Loader {
    nodes: HashMap<NodeId, Arc<Node>>,
    /// Ids on the path from the root to the node being loaded
    ancestors: Vec<NodeId>,
}

impl Loader {
    fn load_node(
        &mut self,
        value: &Value,
        parent: Option<&NodeId>,
        path: &str,
        depth: usize,
        is_root: bool,
    ) -> Result<NodeId, MalformedTreeError> {
        self.load_node_with_key(value, parent, path, depth, is_root, None)
    }

    fn load_node_with_key(
        &mut self,
        value: &Value,
        parent: Option<&NodeId>,
        path: &str,
        depth: usize,
        is_root: bool,
        map_key: Option<&str>,
    ) -> Result<NodeId, MalformedTreeError> {
        if depth > MAX_LOAD_DEPTH {
            return Err(MalformedTreeError::TooDeep {
                max: MAX_LOAD_DEPTH,
            });
        }

        let obj = value
            .as_object()
            .ok_or_else(|| MalformedTreeError::NotAnObject {
                path: path.to_string(),
            })?;

        let id = self.read_id(obj, path, map_key)?;
        if self.ancestors.contains(&id) {
            return Err(MalformedTreeError::Cycle {
                id: id.to_string(),
            });
        }
        if self.nodes.contains_key(&id) {
            return Err(MalformedTreeError::DuplicateId {
                id: id.to_string(),
            });
        }

        let node_type = match obj.get("type") {
            Some(Value::String(t)) => t.as_str(),
            Some(other) => {
                return Err(MalformedTreeError::UnknownNodeType {
                    node_type: other.to_string(),
                    path: path.to_string(),
                })
            }
            // A bare top-level object is treated as the root group
            None if is_root => "group",
            None => {
                return Err(MalformedTreeError::MissingNodeType {
                    path: path.to_string(),
                })
            }
        };

        let empty = Map::new();
        let props = match obj.get("properties") {
            Some(Value::Object(p)) => p,
            None | Some(Value::Null) => &empty,
            Some(_) => {
                return Err(MalformedTreeError::invalid_property(
                    id.as_str(),
                    "properties",
                    "expected an object",
                ))
            }
        };

        match node_type {
            "group" => self.load_group(obj, props, id, parent, path, depth),
            "rule" if is_root => Err(MalformedTreeError::RootNotGroup),
            "rule" => {
                let rule = read_rule(props, id.clone(), parent.cloned())?;
                self.nodes.insert(id.clone(), Arc::new(Node::Rule(rule)));
                Ok(id)
            }
            other => Err(MalformedTreeError::UnknownNodeType {
                node_type: other.to_string(),
                path: path.to_string(),
            }),
        }
    }

    fn read_id(
        &self,
        obj: &Map<String, Value>,
        path: &str,
        map_key: Option<&str>,
    ) -> Result<NodeId, MalformedTreeError> {
        match obj.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(NodeId::new(s.as_str())),
            Some(Value::String(_)) => Err(MalformedTreeError::InvalidId {
                path: path.to_string(),
                reason: "id is empty".to_string(),
            }),
            None | Some(Value::Null) => match map_key {
                Some(key) if !key.trim().is_empty() => Ok(NodeId::new(key)),
                _ => {
                    let id = NodeId::generate();
                    tracing::debug!("Assigned generated id {} to node at {}", id, path);
                    Ok(id)
                }
            },
            Some(_) => Err(MalformedTreeError::InvalidId {
                path: path.to_string(),
                reason: "id must be a string".to_string(),
            }),
        }
    }

    fn load_group(
        &mut self,
        obj: &Map<String, Value>,
        props: &Map<String, Value>,
        id: NodeId,
        parent: Option<&NodeId>,
        path: &str,
        depth: usize,
    ) -> Result<NodeId, MalformedTreeError> {
        let conjunction = match props.get("conjunction") {
            None | Some(Value::Null) => Conjunction::default(),
            Some(Value::String(s)) => Conjunction::parse(s).ok_or_else(|| {
                MalformedTreeError::invalid_property(
                    id.as_str(),
                    "conjunction",
                    format!("unknown conjunction '{}'", s),
                )
            })?,
            Some(_) => {
                return Err(MalformedTreeError::invalid_property(
                    id.as_str(),
                    "conjunction",
                    "expected a string",
                ))
            }
        };
        let negated = match props.get("not") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(MalformedTreeError::invalid_property(
                    id.as_str(),
                    "not",
                    "expected a boolean",
                ))
            }
        };

        self.ancestors.push(id.clone());
        let mut children = Vec::new();
        match obj.get("children1") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for (i, item) in items.iter().enumerate() {
                    let child_path = format!("{}.children1[{}]", path, i);
                    children.push(self.load_node(item, Some(&id), &child_path, depth + 1, false)?);
                }
            }
            Some(Value::Object(items)) => {
                for (key, item) in items {
                    let child_path = format!("{}.children1.{}", path, key);
                    children.push(self.load_node_with_key(
                        item,
                        Some(&id),
                        &child_path,
                        depth + 1,
                        false,
                        Some(key),
                    )?);
                }
            }
            Some(_) => {
                return Err(MalformedTreeError::invalid_property(
                    id.as_str(),
                    "children1",
                    "expected an array or object",
                ))
            }
        }
        self.ancestors.pop();

        let group = GroupNode {
            id: id.clone(),
            parent: parent.cloned(),
            conjunction,
            negated,
            children,
        };
        self.nodes.insert(id.clone(), Arc::new(Node::Group(group)));
        Ok(id)
    }
}

fn read_rule(
    props: &Map<String, Value>,
    id: NodeId,
    parent: Option<NodeId>,
) -> Result<RuleNode, MalformedTreeError> {
    let field = required_string(props, &id, "field")?;
    let operator = required_string(props, &id, "operator")?;

    let values = match props.get("value") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            return Err(MalformedTreeError::invalid_property(
                id.as_str(),
                "value",
                "expected an array",
            ))
        }
    };
    let sources = optional_array(props, &id, "valueSrc")?;
    let types = optional_array(props, &id, "valueType")?;
    let errors = optional_array(props, &id, "valueError")?;

    let mut slots = Vec::with_capacity(values.len());
    for (index, raw) in values.iter().enumerate() {
        let source = match sources.get(index) {
            None | Some(Value::Null) => ValueSource::Value,
            Some(Value::String(s)) => {
                ValueSource::parse(s).ok_or_else(|| MalformedTreeError::InvalidValue {
                    id: id.to_string(),
                    index,
                    reason: format!("unknown value source '{}'", s),
                })?
            }
            Some(_) => {
                return Err(MalformedTreeError::InvalidValue {
                    id: id.to_string(),
                    index,
                    reason: "value source must be a string".to_string(),
                })
            }
        };
        let hint = match types.get(index) {
            Some(Value::String(s)) => Some(ValueType::parse(s).ok_or_else(|| {
                MalformedTreeError::InvalidValue {
                    id: id.to_string(),
                    index,
                    reason: format!("unknown value type '{}'", s),
                }
            })?),
            _ => None,
        };
        let value = match raw {
            Value::Null => None,
            raw => Some(RuleValue::from_json(raw, hint, source).map_err(|reason| {
                MalformedTreeError::InvalidValue {
                    id: id.to_string(),
                    index,
                    reason,
                }
            })?),
        };
        let error = match errors.get(index) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };
        slots.push(ValueSlot {
            value,
            source,
            error,
        });
    }

    Ok(RuleNode {
        id,
        parent,
        field,
        operator,
        values: slots,
    })
}

fn required_string(
    props: &Map<String, Value>,
    id: &NodeId,
    key: &str,
) -> Result<String, MalformedTreeError> {
    match props.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) | None | Some(Value::Null) => Err(
            MalformedTreeError::invalid_property(id.as_str(), key, "missing"),
        ),
        Some(_) => Err(MalformedTreeError::invalid_property(
            id.as_str(),
            key,
            "expected a string",
        )),
    }
}

fn optional_array<'a>(
    props: &'a Map<String, Value>,
    id: &NodeId,
    key: &str,
) -> Result<&'a [Value], MalformedTreeError> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(MalformedTreeError::invalid_property(
            id.as_str(),
            key,
            "expected an array",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_json() -> Value {
        json!({
            "id": "root",
            "type": "group",
            "children1": [
                {
                    "type": "rule",
                    "id": "ba88bb89-89ab-4cde-b012-31951b8f840f",
                    "properties": {
                        "fieldSrc": "field",
                        "field": "price",
                        "operator": "between",
                        "value": [30, 100],
                        "valueSrc": ["value", "value"],
                        "valueType": ["number", "number"],
                        "valueError": [null, null]
                    }
                },
                {
                    "type": "rule",
                    "id": "989ba9aa-4567-489a-bcde-f1951b902458",
                    "properties": {
                        "fieldSrc": "field",
                        "field": "color",
                        "operator": "select_equals",
                        "value": ["green"],
                        "valueSrc": ["value"],
                        "valueType": ["select"],
                        "valueError": [null]
                    }
                }
            ]
        })
    }

    #[test]
    fn test_load_demo_tree() {
        let tree = Tree::load(&demo_json()).unwrap();
        assert_eq!(tree.root_id().as_str(), "root");
        assert_eq!(tree.root().children.len(), 2);
        assert_eq!(tree.root().conjunction, Conjunction::And);

        let price = tree
            .rule(&"ba88bb89-89ab-4cde-b012-31951b8f840f".into())
            .unwrap();
        assert_eq!(price.operator, "between");
        assert_eq!(price.values[1].value, Some(RuleValue::number(100)));
        assert_eq!(price.parent.as_ref(), Some(tree.root_id()));

        let color = tree
            .rule(&"989ba9aa-4567-489a-bcde-f1951b902458".into())
            .unwrap();
        assert_eq!(color.values[0].value, Some(RuleValue::select("green")));
    }

    #[test]
    fn test_round_trip() {
        let tree = Tree::load(&demo_json()).unwrap();
        let again = Tree::load(&tree.serialize()).unwrap();
        assert_eq!(tree, again);
    }

    #[test]
    fn test_missing_ids_are_generated() {
        let tree = Tree::load(&json!({
            "type": "group",
            "children1": [
                { "type": "rule", "properties": { "field": "qty", "operator": "equal", "value": [1] } }
            ]
        }))
        .unwrap();
        assert_eq!(tree.len(), 2);
        let child = &tree.root().children[0];
        assert!(!child.as_str().is_empty());
        assert_ne!(child, tree.root_id());
    }

    #[test]
    fn test_object_children_use_keys_as_ids() {
        let tree = Tree::load(&json!({
            "id": "root",
            "type": "group",
            "children1": {
                "r1": { "type": "rule", "properties": { "field": "qty", "operator": "equal", "value": [1] } }
            }
        }))
        .unwrap();
        assert!(tree.rule(&"r1".into()).is_some());
    }

    #[test]
    fn test_cycle_is_rejected() {
        let err = Tree::load(&json!({
            "id": "a",
            "type": "group",
            "children1": [
                { "id": "b", "type": "group", "children1": [ { "id": "a", "type": "group" } ] }
            ]
        }))
        .unwrap_err();
        assert_eq!(err, MalformedTreeError::Cycle { id: "a".to_string() });
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let err = Tree::load(&json!({
            "id": "root",
            "type": "group",
            "children1": [
                { "id": "x", "type": "group" },
                { "id": "x", "type": "group" }
            ]
        }))
        .unwrap_err();
        assert_eq!(err, MalformedTreeError::DuplicateId { id: "x".to_string() });
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = Tree::load(&json!({
            "id": "root",
            "type": "group",
            "children1": [ { "id": "x", "type": "switch_group" } ]
        }))
        .unwrap_err();
        assert!(matches!(err, MalformedTreeError::UnknownNodeType { .. }));
    }

    #[test]
    fn test_rule_root_and_bad_ids_are_rejected() {
        let err = Tree::load(&json!({
            "type": "rule",
            "properties": { "field": "qty", "operator": "equal" }
        }))
        .unwrap_err();
        assert_eq!(err, MalformedTreeError::RootNotGroup);

        let err = Tree::load(&json!({ "id": 7, "type": "group" })).unwrap_err();
        assert!(matches!(err, MalformedTreeError::InvalidId { .. }));

        let err = Tree::load(&json!({
            "type": "group",
            "children1": [ { "properties": {} } ]
        }))
        .unwrap_err();
        assert!(matches!(err, MalformedTreeError::MissingNodeType { .. }));
    }

    #[test]
    fn test_depth_is_bounded() {
        let mut value = json!({ "type": "group" });
        for _ in 0..(MAX_LOAD_DEPTH + 2) {
            value = json!({ "type": "group", "children1": [value] });
        }
        let err = Tree::load(&value).unwrap_err();
        assert_eq!(err, MalformedTreeError::TooDeep { max: MAX_LOAD_DEPTH });
    }

    #[test]
    fn test_invalid_value_reports_slot() {
        let err = Tree::load(&json!({
            "type": "group",
            "children1": [{
                "id": "r",
                "type": "rule",
                "properties": {
                    "field": "qty",
                    "operator": "equal",
                    "value": ["many"],
                    "valueType": ["number"]
                }
            }]
        }))
        .unwrap_err();
        assert!(matches!(err, MalformedTreeError::InvalidValue { index: 0, .. }));
    }

    #[test]
    fn test_empty_slots_survive_round_trip() {
        let tree = Tree::load(&json!({
            "id": "root",
            "type": "group",
            "properties": { "conjunction": "OR", "not": true },
            "children1": [{
                "id": "r",
                "type": "rule",
                "properties": {
                    "field": "price",
                    "operator": "between",
                    "value": [null, 5],
                    "valueError": ["Required", null]
                }
            }]
        }))
        .unwrap();
        let rule = tree.rule(&"r".into()).unwrap();
        assert_eq!(rule.values.len(), 2);
        assert!(rule.values[0].value.is_none());
        assert_eq!(rule.values[0].error.as_deref(), Some("Required"));
        assert!(tree.root().negated);

        assert_eq!(Tree::load(&tree.serialize()).unwrap(), tree);
    }
}
