//! Exporters
//!
//! Pure functions turning a tree into output formats:
//!
//! - [`to_query_string`] / [`to_display_string`]: human-readable text
//! - [`to_logic_expression`]: nested conditional JSON for rule engines
//! - [`to_sql_where`]: a SQL `WHERE` fragment
//!
//! All exporters walk the tree depth-first in child order. Rules with an
//! empty value slot are skipped. A group left with nothing to export, either
//! childless or with every child skipped, exports as an empty group: the
//! logic and SQL forms render it as "always true" (negated when the group
//! is) and the query string leaves it out. An empty root exports as the
//! format's "always true" form.

pub mod error;
pub mod logic;
pub mod query_string;
pub mod sql;

pub use error::ExportError;
pub use logic::{to_logic_expression, LogicExpr};
pub use query_string::{to_display_string, to_query_string};
pub use sql::to_sql_where;

use crate::models::{Field, GroupNode, Node, Operator, RuleNode, RuleValue, Schema, Tree};

/// Per-format rendering of rules and groups
pub(crate) trait GroupRenderer {
    type Output;
    type Error;

    /// Render one rule; `None` leaves it out
    fn rule(&mut self, rule: &RuleNode) -> Result<Option<Self::Output>, Self::Error>;

    /// Combine the rendered children of a non-empty group
    fn group(&mut self, group: &GroupNode, children: Vec<Self::Output>) -> Self::Output;

    /// Render a group with nothing to export; `None` leaves it out
    fn empty_group(&mut self, _group: &GroupNode) -> Option<Self::Output> {
        None
    }
}

/// Render a group bottom-up; `None` when the renderer leaves an empty group
/// out
pub(crate) fn render_group<R: GroupRenderer>(
    tree: &Tree,
    group: &GroupNode,
    renderer: &mut R,
) -> Result<Option<R::Output>, R::Error> {
    let mut parts = Vec::with_capacity(group.children.len());
    for child in &group.children {
        let part = match tree.get(child) {
            Some(Node::Rule(rule)) => renderer.rule(rule)?,
            Some(Node::Group(inner)) => render_group(tree, inner, renderer)?,
            None => None,
        };
        parts.extend(part);
    }
    if parts.is_empty() {
        return Ok(renderer.empty_group(group));
    }
    Ok(Some(renderer.group(group, parts)))
}

/// Field and operator of a rule that is ready to export, `None` when a value
/// slot is still empty
///
/// Field references in the value slots must name registered fields, so
/// exporters can write them out as column or variable names unquoted.
pub(crate) fn resolve_rule<'s>(
    schema: &'s Schema,
    rule: &RuleNode,
) -> Result<Option<(&'s Field, &'static Operator)>, ExportError> {
    let field = schema
        .field(&rule.field)
        .ok_or_else(|| ExportError::UnknownField {
            rule_id: rule.id.to_string(),
            field: rule.field.clone(),
        })?;
    let operator = schema
        .operator(&rule.operator)
        .ok_or_else(|| ExportError::UnknownOperator {
            rule_id: rule.id.to_string(),
            operator: rule.operator.clone(),
        })?;
    if !rule.is_complete(operator.arity) {
        tracing::debug!("Skipping incomplete rule {} in export", rule.id);
        return Ok(None);
    }
    for value in rule.values.iter().filter_map(|slot| slot.value.as_ref()) {
        if let RuleValue::Field(key) = value {
            if schema.field(key).is_none() {
                return Err(ExportError::UnknownField {
                    rule_id: rule.id.to_string(),
                    field: key.clone(),
                });
            }
        }
    }
    Ok(Some((field, operator)))
}
