//! Mutation Engine
//!
//! One pure function per edit intent. Each takes the current tree, the schema
//! and the edit target, and returns either a new [`Tree`] or a
//! [`ValidationError`]. The input tree is never modified: new versions are
//! built through a draft that replaces only the entries an edit touches
//! (the edited node and, where the child list changes, its parent group).
//! Every other node entry is shared with the previous version.

use crate::models::{
    Conjunction, Field, GroupNode, Node, NodeId, Operator, RuleNode, RuleValue, Schema, Tree,
    ValueSlot, MAX_LOAD_DEPTH,
};
use crate::operations::error::ValidationError;
use crate::operations::validate::{check_value, range_order_error};

fn require_group<'a>(tree: &'a Tree, id: &NodeId) -> Result<&'a GroupNode, ValidationError> {
    match tree.get(id) {
        Some(Node::Group(group)) => Ok(group),
        Some(Node::Rule(_)) => Err(ValidationError::NotAGroup {
            node_id: id.to_string(),
        }),
        None => Err(ValidationError::node_not_found(id)),
    }
}

fn require_rule<'a>(tree: &'a Tree, id: &NodeId) -> Result<&'a RuleNode, ValidationError> {
    match tree.get(id) {
        Some(Node::Rule(rule)) => Ok(rule),
        Some(Node::Group(_)) => Err(ValidationError::NotARule {
            node_id: id.to_string(),
        }),
        None => Err(ValidationError::node_not_found(id)),
    }
}

fn require_field<'a>(schema: &'a Schema, key: &str) -> Result<&'a Field, ValidationError> {
    schema
        .field(key)
        .ok_or_else(|| ValidationError::unknown_field(key))
}

fn require_operator(schema: &Schema, key: &str) -> Result<&'static Operator, ValidationError> {
    schema
        .operator(key)
        .ok_or_else(|| ValidationError::UnknownOperator {
            operator: key.to_string(),
        })
}

/// Operator a rule on `field` starts with
fn initial_operator(schema: &Schema, field: &Field) -> Result<&'static Operator, ValidationError> {
    let key = field
        .default_operator()
        .ok_or_else(|| ValidationError::OperatorNotAllowed {
            field: field.key.clone(),
            operator: String::new(),
        })?;
    require_operator(schema, key)
}

fn empty_slots(schema: &Schema, field: &Field, arity: usize) -> Vec<ValueSlot> {
    vec![ValueSlot::empty(schema.initial_source(field)); arity]
}

fn ensure_unused(tree: &Tree, id: &NodeId) -> Result<(), ValidationError> {
    if tree.contains(id) {
        return Err(ValidationError::DuplicateId {
            node_id: id.to_string(),
        });
    }
    Ok(())
}

/// Fail when `levels` more group levels below `group_id` would reach the
/// maximum depth
///
/// Without a configured `max_nesting` the limit is [`MAX_LOAD_DEPTH`], so
/// every tree an edit produces can be stored and loaded again.
fn check_nesting(
    tree: &Tree,
    schema: &Schema,
    group_id: &NodeId,
    levels: usize,
) -> Result<(), ValidationError> {
    let max = schema
        .settings()
        .max_nesting
        .map_or(MAX_LOAD_DEPTH, |max| max.min(MAX_LOAD_DEPTH));
    let depth = tree
        .depth_of(group_id)
        .ok_or_else(|| ValidationError::node_not_found(group_id))?;
    if depth + levels >= max {
        return Err(ValidationError::MaxNestingExceeded {
            group_id: group_id.to_string(),
            max,
        });
    }
    Ok(())
}

fn with_child(group: &GroupNode, child: NodeId) -> Node {
    let mut group = group.clone();
    group.children.push(child);
    Node::Group(group)
}

/// Append a new rule for `field_key` to a group
///
/// The rule starts with the field's first allowed operator and one empty
/// slot per operand.
///
/// # Errors
///
/// - `NodeNotFound` / `NotAGroup`: `group_id` is not a group of the tree
/// - `MaxNestingExceeded`: the group already sits at the maximum depth
/// - `MaxRulesExceeded`: the tree already holds `max_number_of_rules` rules
/// - `UnknownField`: `field_key` is not registered
pub fn add_rule(
    tree: &Tree,
    schema: &Schema,
    group_id: &NodeId,
    field_key: &str,
) -> Result<Tree, ValidationError> {
    add_rule_with_id(tree, schema, group_id, field_key, NodeId::generate())
}

/// [`add_rule`] with a caller-chosen id for the new rule
pub fn add_rule_with_id(
    tree: &Tree,
    schema: &Schema,
    group_id: &NodeId,
    field_key: &str,
    id: NodeId,
) -> Result<Tree, ValidationError> {
    let group = require_group(tree, group_id)?;
    check_nesting(tree, schema, group_id, 0)?;
    if let Some(max) = schema.settings().max_number_of_rules {
        if tree.rule_count() >= max {
            return Err(ValidationError::MaxRulesExceeded { max });
        }
    }
    let field = require_field(schema, field_key)?;
    let operator = initial_operator(schema, field)?;
    ensure_unused(tree, &id)?;

    let rule = RuleNode {
        id: id.clone(),
        parent: Some(group_id.clone()),
        field: field.key.clone(),
        operator: operator.key.to_string(),
        values: empty_slots(schema, field, operator.arity),
    };

    tracing::debug!("Adding rule {} ({}) to group {}", id, field.key, group_id);

    let mut draft = tree.draft();
    draft.put(with_child(group, id));
    draft.put(Node::Rule(rule));
    Ok(draft.finish())
}

/// Append a new empty group using the default conjunction of the settings
///
/// # Errors
///
/// - `NodeNotFound` / `NotAGroup`: `parent_id` is not a group of the tree
/// - `MaxNestingExceeded`: the new group would reach the maximum depth
pub fn add_group(
    tree: &Tree,
    schema: &Schema,
    parent_id: &NodeId,
) -> Result<Tree, ValidationError> {
    add_group_with_id(tree, schema, parent_id, NodeId::generate())
}

/// [`add_group`] with a caller-chosen id for the new group
pub fn add_group_with_id(
    tree: &Tree,
    schema: &Schema,
    parent_id: &NodeId,
    id: NodeId,
) -> Result<Tree, ValidationError> {
    let parent = require_group(tree, parent_id)?;
    check_nesting(tree, schema, parent_id, 1)?;
    ensure_unused(tree, &id)?;

    let group = GroupNode {
        id: id.clone(),
        parent: Some(parent_id.clone()),
        conjunction: schema.settings().default_conjunction,
        negated: false,
        children: Vec::new(),
    };

    tracing::debug!("Adding group {} to group {}", id, parent_id);

    let mut draft = tree.draft();
    draft.put(with_child(parent, id));
    draft.put(Node::Group(group));
    Ok(draft.finish())
}

/// Detach a node from its parent and drop its whole subtree
///
/// # Errors
///
/// - `RootRemoval`: `node_id` is the root group
/// - `NodeNotFound`: no such node
pub fn remove_node(
    tree: &Tree,
    _schema: &Schema,
    node_id: &NodeId,
) -> Result<Tree, ValidationError> {
    if node_id == tree.root_id() {
        return Err(ValidationError::RootRemoval {
            node_id: node_id.to_string(),
        });
    }
    let node = tree
        .get(node_id)
        .ok_or_else(|| ValidationError::node_not_found(node_id))?;
    let parent_id = node
        .parent()
        .ok_or_else(|| ValidationError::node_not_found(node_id))?;
    let parent = require_group(tree, parent_id)?;

    let mut parent = parent.clone();
    parent.children.retain(|child| child != node_id);

    let removed = tree.subtree_ids(node_id);
    tracing::debug!("Removing {} and {} descendants", node_id, removed.len() - 1);

    let mut draft = tree.draft();
    for id in &removed {
        draft.remove(id);
    }
    draft.put(Node::Group(parent));
    Ok(draft.finish())
}

/// Replace a group's conjunction
pub fn set_conjunction(
    tree: &Tree,
    _schema: &Schema,
    group_id: &NodeId,
    conjunction: Conjunction,
) -> Result<Tree, ValidationError> {
    let group = require_group(tree, group_id)?;
    if group.conjunction == conjunction {
        return Ok(tree.clone());
    }
    let mut group = group.clone();
    group.conjunction = conjunction;

    let mut draft = tree.draft();
    draft.put(Node::Group(group));
    Ok(draft.finish())
}

/// Replace a group's negation flag
pub fn set_negation(
    tree: &Tree,
    _schema: &Schema,
    group_id: &NodeId,
    negated: bool,
) -> Result<Tree, ValidationError> {
    let group = require_group(tree, group_id)?;
    if group.negated == negated {
        return Ok(tree.clone());
    }
    let mut group = group.clone();
    group.negated = negated;

    let mut draft = tree.draft();
    draft.put(Node::Group(group));
    Ok(draft.finish())
}

/// Point a rule at another field
///
/// The operator is kept when the new field allows it and otherwise becomes the
/// field's first operator. Value slots are cleared either way.
pub fn set_field(
    tree: &Tree,
    schema: &Schema,
    rule_id: &NodeId,
    field_key: &str,
) -> Result<Tree, ValidationError> {
    let rule = require_rule(tree, rule_id)?;
    let field = require_field(schema, field_key)?;
    let operator = if field.allows_operator(&rule.operator) {
        require_operator(schema, &rule.operator)?
    } else {
        initial_operator(schema, field)?
    };

    let mut rule = rule.clone();
    rule.field = field.key.clone();
    rule.operator = operator.key.to_string();
    rule.values = empty_slots(schema, field, operator.arity);

    let mut draft = tree.draft();
    draft.put(Node::Rule(rule));
    Ok(draft.finish())
}

/// Change a rule's operator and reset its value slots to the new arity
///
/// Previous values are dropped, not converted.
///
/// # Errors
///
/// - `UnknownField`: the rule's field is not registered
/// - `UnknownOperator`: `operator_key` is not a known operator
/// - `OperatorNotAllowed`: the field does not allow the operator
pub fn set_operator(
    tree: &Tree,
    schema: &Schema,
    rule_id: &NodeId,
    operator_key: &str,
) -> Result<Tree, ValidationError> {
    let rule = require_rule(tree, rule_id)?;
    let field = require_field(schema, &rule.field)?;
    let operator = require_operator(schema, operator_key)?;
    if !field.allows_operator(operator_key) {
        return Err(ValidationError::OperatorNotAllowed {
            field: field.key.clone(),
            operator: operator_key.to_string(),
        });
    }

    let mut rule = rule.clone();
    rule.operator = operator.key.to_string();
    rule.values = empty_slots(schema, field, operator.arity);

    let mut draft = tree.draft();
    draft.put(Node::Rule(rule));
    Ok(draft.finish())
}

/// Resolve the field and operator of a rule plus a checked slot index
fn slot_target<'a>(
    tree: &'a Tree,
    schema: &'a Schema,
    rule_id: &NodeId,
    index: usize,
) -> Result<(&'a RuleNode, &'a Field, &'static Operator), ValidationError> {
    let rule = require_rule(tree, rule_id)?;
    let field = require_field(schema, &rule.field)?;
    let operator = require_operator(schema, &rule.operator)?;
    if index >= operator.arity {
        return Err(ValidationError::ValueIndexOutOfRange {
            rule_id: rule_id.to_string(),
            index,
            arity: operator.arity,
        });
    }
    Ok((rule, field, operator))
}

/// Write a slot and refresh the range error kept on the second slot
fn write_slot(
    tree: &Tree,
    schema: &Schema,
    rule: &RuleNode,
    field: &Field,
    arity: usize,
    index: usize,
    slot: ValueSlot,
) -> Tree {
    let mut rule = rule.clone();
    rule.values
        .resize(arity, ValueSlot::empty(schema.initial_source(field)));
    rule.values[index] = slot;

    if arity == 2 {
        let error = range_order_error(&rule);
        if error.is_some() {
            tracing::debug!("Rule {} now holds an inverted range", rule.id);
        }
        rule.values[1].error = error;
    }

    let mut draft = tree.draft();
    draft.put(Node::Rule(rule));
    draft.finish()
}

/// Set one value slot of a rule
///
/// The value may be a literal or, when the field allows it, a reference to
/// another field of the same type. The slot's source tag follows the value
/// and its error state is cleared.
///
/// # Errors
///
/// - `ValueIndexOutOfRange`: `index` is not below the operator's arity
/// - `ValueSourceNotAllowed`: the field does not accept this kind of value
/// - `TypeMismatch`: the value's type differs from the slot's type
/// - `Range`: a number lies outside the field's `[min, max]`
/// - `OptionNotAllowed`: a select value is not one of the field's options
pub fn set_value(
    tree: &Tree,
    schema: &Schema,
    rule_id: &NodeId,
    index: usize,
    value: RuleValue,
) -> Result<Tree, ValidationError> {
    let (rule, field, operator) = slot_target(tree, schema, rule_id, index)?;
    check_value(schema, field, operator, &value)?;
    Ok(write_slot(
        tree,
        schema,
        rule,
        field,
        operator.arity,
        index,
        ValueSlot::filled(value),
    ))
}

/// Empty one value slot of a rule, keeping its source tag
pub fn clear_value(
    tree: &Tree,
    schema: &Schema,
    rule_id: &NodeId,
    index: usize,
) -> Result<Tree, ValidationError> {
    let (rule, field, operator) = slot_target(tree, schema, rule_id, index)?;
    let source = rule
        .values
        .get(index)
        .map(|slot| slot.source)
        .unwrap_or_else(|| schema.initial_source(field));
    Ok(write_slot(
        tree,
        schema,
        rule,
        field,
        operator.arity,
        index,
        ValueSlot::empty(source),
    ))
}

/// Move a node under `target_group_id` at position `index`
///
/// `index` counts the target's children after the node has been detached;
/// an index past the end appends.
///
/// # Errors
///
/// - `InvalidMove`: the node is the root, or the target lies inside the
///   moved group
/// - `MaxNestingExceeded`: the moved subtree would reach the maximum depth
pub fn move_node(
    tree: &Tree,
    schema: &Schema,
    node_id: &NodeId,
    target_group_id: &NodeId,
    index: usize,
) -> Result<Tree, ValidationError> {
    if node_id == tree.root_id() {
        return Err(ValidationError::invalid_move(
            node_id,
            "the root group cannot be moved",
        ));
    }
    let node = tree
        .get(node_id)
        .ok_or_else(|| ValidationError::node_not_found(node_id))?;
    let target = require_group(tree, target_group_id)?;
    if tree.is_within(target_group_id, node_id) {
        return Err(ValidationError::invalid_move(
            node_id,
            "a group cannot be moved into itself or its own subtree",
        ));
    }
    let levels = match node {
        Node::Group(_) => 1 + tree.group_height(node_id),
        Node::Rule(_) => 0,
    };
    check_nesting(tree, schema, target_group_id, levels)?;

    let old_parent_id = node
        .parent()
        .ok_or_else(|| ValidationError::node_not_found(node_id))?;

    let mut draft = tree.draft();

    let mut target = if old_parent_id == target_group_id {
        target.clone()
    } else {
        let mut old_parent = require_group(tree, old_parent_id)?.clone();
        old_parent.children.retain(|child| child != node_id);
        draft.put(Node::Group(old_parent));
        target.clone()
    };
    target.children.retain(|child| child != node_id);
    let position = index.min(target.children.len());
    target.children.insert(position, node_id.clone());
    draft.put(Node::Group(target));

    let moved = match node {
        Node::Group(group) => Node::Group(GroupNode {
            parent: Some(target_group_id.clone()),
            ..group.clone()
        }),
        Node::Rule(rule) => Node::Rule(RuleNode {
            parent: Some(target_group_id.clone()),
            ..rule.clone()
        }),
    };
    draft.put(moved);

    tracing::debug!(
        "Moved {} to group {} at position {}",
        node_id,
        target_group_id,
        position
    );
    Ok(draft.finish())
}
