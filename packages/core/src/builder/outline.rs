//! Outline rendering
//!
//! Flattens a tree into the rows a front end draws, in depth-first order.
//! Each row says what to show and which input widget to use per value slot;
//! drawing them is left to the host.

use crate::models::{Node, NodeId, RuleNode, Schema, Tree, ValueSource, WidgetKind};
use serde::Serialize;

/// Row kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Group,
    Rule,
}

/// One drawable row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutlineRow {
    /// Depth below the root; the root is 0, its children 1
    pub depth: usize,
    pub node_id: NodeId,
    pub kind: RowKind,
    /// `AND` / `NOT OR` for groups, `Price Between` for rules
    pub text: String,
    /// Input widget per value slot, empty for groups
    pub widgets: Vec<WidgetKind>,
    /// Whether the NOT toggle is offered; always false for rules
    pub not_toggle: bool,
}

fn rule_row(depth: usize, rule: &RuleNode, schema: &Schema) -> OutlineRow {
    let field = schema.field(&rule.field);
    let operator = schema.operator(&rule.operator);

    let text = format!(
        "{} {}",
        field.map_or(rule.field.as_str(), |f| f.label.as_str()),
        operator.map_or(rule.operator.as_str(), |op| op.label)
    );

    let widgets = match (field, operator) {
        (Some(field), Some(operator)) => {
            let slot_type = operator.slot_type_for(field.value_type);
            rule.values
                .iter()
                .map(|slot| match slot.source {
                    ValueSource::Field => WidgetKind::Field,
                    ValueSource::Value => field.widget_for(slot_type, operator.arity),
                })
                .collect()
        }
        _ => Vec::new(),
    };

    OutlineRow {
        depth,
        node_id: rule.id.clone(),
        kind: RowKind::Rule,
        text,
        widgets,
        not_toggle: false,
    }
}

/// Rows for every node of `tree`, parents before children
pub fn render_outline(tree: &Tree, schema: &Schema) -> Vec<OutlineRow> {
    let show_not = schema.settings().show_not;
    tree.walk()
        .into_iter()
        .map(|(depth, node)| match node {
            Node::Group(group) => OutlineRow {
                depth,
                node_id: group.id.clone(),
                kind: RowKind::Group,
                text: if group.negated {
                    format!("NOT {}", group.conjunction)
                } else {
                    group.conjunction.to_string()
                },
                widgets: Vec::new(),
                not_toggle: show_not,
            },
            Node::Rule(rule) => rule_row(depth, rule, schema),
        })
        .collect()
}
