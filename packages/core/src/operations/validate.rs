//! Value checks and whole-tree validation
//!
//! `check_value` is the single place a literal or field reference is checked
//! against a field and operator; edits call it before writing a slot, and
//! [`validate_tree`] calls it for every stored slot of a loaded tree.

use crate::models::{Field, Node, NodeId, Operator, RuleNode, RuleValue, Schema, Tree, ValueSource};
use crate::operations::error::ValidationError;
use serde::Serialize;

/// Message stored in a slot's error state when a range is inverted
pub const INVALID_RANGE_MESSAGE: &str = "Invalid range";

/// A problem found by [`validate_tree`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeIssue {
    pub node_id: NodeId,
    /// Value slot the issue refers to, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<usize>,
    #[serde(serialize_with = "serialize_error")]
    pub error: ValidationError,
}

fn serialize_error<S: serde::Serializer>(
    error: &ValidationError,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

/// Check one value against the field and operator of the slot it goes into
pub(crate) fn check_value(
    schema: &Schema,
    field: &Field,
    operator: &Operator,
    value: &RuleValue,
) -> Result<(), ValidationError> {
    let expected = operator.slot_type_for(field.value_type);

    if !field.allows_source(value.source()) {
        return Err(ValidationError::ValueSourceNotAllowed {
            field: field.key.clone(),
            value_source: value.source().as_str().to_string(),
        });
    }

    match value {
        RuleValue::Field(other) => {
            let referenced = schema
                .field(other)
                .ok_or_else(|| ValidationError::unknown_field(other.as_str()))?;
            if referenced.value_type != expected {
                return Err(ValidationError::type_mismatch(
                    &field.key,
                    expected.as_str(),
                    format!("field '{}' of type {}", other, referenced.value_type),
                ));
            }
            Ok(())
        }
        _ => {
            if value.value_type() != Some(expected) {
                return Err(ValidationError::type_mismatch(
                    &field.key,
                    expected.as_str(),
                    value.type_name(),
                ));
            }
            check_constraints(field, value)
        }
    }
}

fn check_constraints(field: &Field, value: &RuleValue) -> Result<(), ValidationError> {
    let constraints = &field.constraints;
    match value {
        RuleValue::Number(_) => {
            let n = value.as_f64().unwrap_or(f64::NAN);
            if !constraints.contains(n) {
                return Err(ValidationError::Range {
                    field: field.key.clone(),
                    value: n,
                    min: constraints.min,
                    max: constraints.max,
                });
            }
        }
        RuleValue::Select(option) => {
            if !constraints.has_option(option) {
                return Err(ValidationError::OptionNotAllowed {
                    field: field.key.clone(),
                    value: option.clone(),
                });
            }
        }
        RuleValue::MultiSelect(options) => {
            if let Some(bad) = options.iter().find(|o| !constraints.has_option(o)) {
                return Err(ValidationError::OptionNotAllowed {
                    field: field.key.clone(),
                    value: bad.clone(),
                });
            }
        }
        _ => {}
    }
    Ok(())
}

/// Error message for an inverted two-slot range, if any
pub(crate) fn range_order_error(rule: &RuleNode) -> Option<String> {
    let [low, high] = rule.values.as_slice() else {
        return None;
    };
    let inverted = match (&low.value, &high.value) {
        (Some(RuleValue::Number(_)), Some(RuleValue::Number(_))) => {
            let (a, b) = (
                low.value.as_ref().and_then(RuleValue::as_f64),
                high.value.as_ref().and_then(RuleValue::as_f64),
            );
            matches!((a, b), (Some(a), Some(b)) if a > b)
        }
        (Some(RuleValue::Date(a)), Some(RuleValue::Date(b))) => a > b,
        _ => false,
    };
    inverted.then(|| INVALID_RANGE_MESSAGE.to_string())
}

/// Report every problem in `tree` against `schema` without failing
///
/// Loaded trees are not checked against a schema, so this is how a session
/// finds rules referring to fields or operators it does not know, value
/// lists of the wrong length, invalid values and groups nested too deep.
pub fn validate_tree(tree: &Tree, schema: &Schema) -> Vec<TreeIssue> {
    let mut issues = Vec::new();
    let max_nesting = schema.settings().max_nesting;

    for (depth, node) in tree.walk() {
        match node {
            Node::Group(group) => {
                if let Some(max) = max_nesting {
                    if depth >= max && depth > 0 {
                        issues.push(TreeIssue {
                            node_id: group.id.clone(),
                            slot: None,
                            error: ValidationError::MaxNestingExceeded {
                                group_id: group.id.to_string(),
                                max,
                            },
                        });
                    }
                }
            }
            Node::Rule(rule) => validate_rule(schema, rule, &mut issues),
        }
    }

    if let Some(max) = schema.settings().max_number_of_rules {
        if tree.rule_count() > max {
            issues.push(TreeIssue {
                node_id: tree.root_id().clone(),
                slot: None,
                error: ValidationError::MaxRulesExceeded { max },
            });
        }
    }

    issues
}

/// Give untyped stored values the type their slot expects
///
/// Returns the input tree unchanged (sharing every entry) when no value
/// needed a new type.
pub fn retype_values(tree: &Tree, schema: &Schema) -> Tree {
    let mut draft = None;
    for (_, node) in tree.walk() {
        let Node::Rule(rule) = node else { continue };
        let (Some(field), Some(operator)) = (schema.field(&rule.field), schema.operator(&rule.operator))
        else {
            continue;
        };
        let slot_type = operator.slot_type_for(field.value_type);
        let mut retyped = rule.clone();
        let mut changed = false;
        for slot in &mut retyped.values {
            if let Some(value) = slot.value.as_ref().and_then(|v| v.coerce_to(slot_type)) {
                slot.value = Some(value);
                changed = true;
            }
        }
        if changed {
            draft
                .get_or_insert_with(|| tree.draft())
                .put(Node::Rule(retyped));
        }
    }
    match draft {
        Some(draft) => draft.finish(),
        None => tree.clone(),
    }
}

fn validate_rule(schema: &Schema, rule: &RuleNode, issues: &mut Vec<TreeIssue>) {
    let issue = |slot: Option<usize>, error: ValidationError| TreeIssue {
        node_id: rule.id.clone(),
        slot,
        error,
    };

    let Some(field) = schema.field(&rule.field) else {
        issues.push(issue(None, ValidationError::unknown_field(&rule.field)));
        return;
    };
    let Some(operator) = schema.operator(&rule.operator) else {
        issues.push(issue(
            None,
            ValidationError::UnknownOperator {
                operator: rule.operator.clone(),
            },
        ));
        return;
    };
    if !field.allows_operator(&rule.operator) {
        issues.push(issue(
            None,
            ValidationError::OperatorNotAllowed {
                field: field.key.clone(),
                operator: rule.operator.clone(),
            },
        ));
    }
    if rule.values.len() != operator.arity {
        issues.push(issue(
            None,
            ValidationError::ArityMismatch {
                rule_id: rule.id.to_string(),
                expected: operator.arity,
                actual: rule.values.len(),
            },
        ));
    }

    let slot_type = operator.slot_type_for(field.value_type);
    for (index, slot) in rule.values.iter().enumerate() {
        if let Some(value) = &slot.value {
            let coerced = value.coerce_to(slot_type);
            let value = coerced.as_ref().unwrap_or(value);
            if let Err(error) = check_value(schema, field, operator, value) {
                issues.push(issue(Some(index), error));
            }
        } else if slot.source == ValueSource::Field && !field.allows_source(ValueSource::Field) {
            issues.push(issue(
                Some(index),
                ValidationError::ValueSourceNotAllowed {
                    field: field.key.clone(),
                    value_source: slot.source.as_str().to_string(),
                },
            ));
        }
    }
}
