//! Tree Operations
//!
//! Pure edit functions over [`Tree`] values plus tree validation.
//!
//! Each edit intent has its own function in [`edit`]. Front ends that send
//! edits as data use [`Edit`], a serde-tagged enum, and [`apply_edit`]:
//!
//! ```rust
//! use querybuilder_core::models::{BuilderSettings, Field, Schema, Tree, ValueType};
//! use querybuilder_core::operations::{apply_edit, Edit};
//! use serde_json::json;
//!
//! let schema = Schema::register(
//!     vec![Field::new("qty", ValueType::Number)],
//!     BuilderSettings::default(),
//! )
//! .unwrap();
//! let tree = Tree::empty_with_id("root".into(), Default::default());
//!
//! let edit: Edit = serde_json::from_value(json!({
//!     "type": "addRule",
//!     "groupId": "root",
//!     "field": "qty",
//!     "id": "r1"
//! }))
//! .unwrap();
//! let tree = apply_edit(&tree, &schema, &edit).unwrap();
//! assert_eq!(tree.rule_count(), 1);
//! ```

pub mod edit;
pub mod error;
pub mod validate;

pub use edit::{
    add_group, add_group_with_id, add_rule, add_rule_with_id, clear_value, move_node,
    remove_node, set_conjunction, set_field, set_negation, set_operator, set_value,
};
pub use error::ValidationError;
pub use validate::{retype_values, validate_tree, TreeIssue, INVALID_RANGE_MESSAGE};

use crate::models::value::json_kind;
use crate::models::{Conjunction, NodeId, RuleValue, Schema, Tree, ValueSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One edit intent, as sent by a front end
///
/// Values in [`Edit::SetValue`] are plain JSON; they are decoded against the
/// slot type of the rule's field and operator before the edit runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Edit {
    AddRule {
        group_id: NodeId,
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<NodeId>,
    },
    AddGroup {
        parent_id: NodeId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<NodeId>,
    },
    RemoveNode {
        node_id: NodeId,
    },
    SetConjunction {
        group_id: NodeId,
        conjunction: Conjunction,
    },
    SetNegation {
        group_id: NodeId,
        negated: bool,
    },
    SetField {
        rule_id: NodeId,
        field: String,
    },
    SetOperator {
        rule_id: NodeId,
        operator: String,
    },
    SetValue {
        rule_id: NodeId,
        index: usize,
        value: Value,
        #[serde(default)]
        value_src: ValueSource,
    },
    ClearValue {
        rule_id: NodeId,
        index: usize,
    },
    MoveNode {
        node_id: NodeId,
        target_group_id: NodeId,
        index: usize,
    },
}

impl Edit {
    /// Short name of the intent, used in logs and change events
    pub fn name(&self) -> &'static str {
        match self {
            Edit::AddRule { .. } => "addRule",
            Edit::AddGroup { .. } => "addGroup",
            Edit::RemoveNode { .. } => "removeNode",
            Edit::SetConjunction { .. } => "setConjunction",
            Edit::SetNegation { .. } => "setNegation",
            Edit::SetField { .. } => "setField",
            Edit::SetOperator { .. } => "setOperator",
            Edit::SetValue { .. } => "setValue",
            Edit::ClearValue { .. } => "clearValue",
            Edit::MoveNode { .. } => "moveNode",
        }
    }
}

/// Decode a JSON value for a slot of `rule_id`
///
/// Fails the same way [`set_value`] does when the rule, its field or its
/// operator cannot be resolved, and with `TypeMismatch` when the JSON does not
/// have the slot's shape.
pub fn decode_value(
    tree: &Tree,
    schema: &Schema,
    rule_id: &NodeId,
    value: &Value,
    source: ValueSource,
) -> Result<RuleValue, ValidationError> {
    let rule = tree.rule(rule_id).ok_or_else(|| match tree.get(rule_id) {
        Some(_) => ValidationError::NotARule {
            node_id: rule_id.to_string(),
        },
        None => ValidationError::node_not_found(rule_id),
    })?;
    let field = schema
        .field(&rule.field)
        .ok_or_else(|| ValidationError::unknown_field(rule.field.as_str()))?;
    let operator = schema
        .operator(&rule.operator)
        .ok_or_else(|| ValidationError::UnknownOperator {
            operator: rule.operator.clone(),
        })?;
    let slot_type = operator.slot_type_for(field.value_type);

    RuleValue::from_json(value, Some(slot_type), source).map_err(|_| {
        ValidationError::type_mismatch(field.key.as_str(), slot_type.as_str(), json_kind(value))
    })
}

/// Apply one [`Edit`] and return the resulting tree
pub fn apply_edit(tree: &Tree, schema: &Schema, edit: &Edit) -> Result<Tree, ValidationError> {
    match edit {
        Edit::AddRule {
            group_id,
            field,
            id,
        } => match id {
            Some(id) => add_rule_with_id(tree, schema, group_id, field, id.clone()),
            None => add_rule(tree, schema, group_id, field),
        },
        Edit::AddGroup { parent_id, id } => match id {
            Some(id) => add_group_with_id(tree, schema, parent_id, id.clone()),
            None => add_group(tree, schema, parent_id),
        },
        Edit::RemoveNode { node_id } => remove_node(tree, schema, node_id),
        Edit::SetConjunction {
            group_id,
            conjunction,
        } => set_conjunction(tree, schema, group_id, *conjunction),
        Edit::SetNegation { group_id, negated } => set_negation(tree, schema, group_id, *negated),
        Edit::SetField { rule_id, field } => set_field(tree, schema, rule_id, field),
        Edit::SetOperator { rule_id, operator } => set_operator(tree, schema, rule_id, operator),
        Edit::SetValue {
            rule_id,
            index,
            value,
            value_src,
        } => {
            let value = decode_value(tree, schema, rule_id, value, *value_src)?;
            set_value(tree, schema, rule_id, *index, value)
        }
        Edit::ClearValue { rule_id, index } => clear_value(tree, schema, rule_id, *index),
        Edit::MoveNode {
            node_id,
            target_group_id,
            index,
        } => move_node(tree, schema, node_id, target_group_id, *index),
    }
}
