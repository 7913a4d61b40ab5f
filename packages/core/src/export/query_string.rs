//! Query string exporter
//!
//! Groups render as `(a AND b)`, prefixed with `NOT ` when negated. Rules
//! render as `field OP value` following the operator's query template.
//! Text, select and date values are double-quoted with `\` escapes.
//!
//! The string is for display; nothing parses it back.

use crate::export::{render_group, resolve_rule, GroupRenderer};
use crate::models::{
    Field, GroupNode, Operator, QueryTemplate, RuleNode, RuleValue, Schema, Tree, DATE_FORMAT,
};
use std::convert::Infallible;

struct QueryStringRenderer<'a> {
    schema: &'a Schema,
    /// Use field labels and option titles instead of keys and values
    labels: bool,
}

impl QueryStringRenderer<'_> {
    fn field_name<'f>(&self, field: &'f Field) -> &'f str {
        if self.labels {
            &field.label
        } else {
            &field.key
        }
    }

    fn option<'f>(&self, field: &'f Field, value: &'f str) -> &'f str {
        if self.labels {
            field.constraints.option_title(value).unwrap_or(value)
        } else {
            value
        }
    }

    fn operand(&self, field: &Field, value: &RuleValue) -> String {
        match value {
            RuleValue::Number(n) => n.to_string(),
            RuleValue::Boolean(b) => b.to_string(),
            RuleValue::Text(s) => quote(s),
            RuleValue::Date(d) => quote(&d.format(DATE_FORMAT).to_string()),
            RuleValue::Select(s) => quote(self.option(field, s)),
            RuleValue::MultiSelect(items) => items
                .iter()
                .map(|item| quote(self.option(field, item)))
                .collect::<Vec<_>>()
                .join(", "),
            RuleValue::Field(key) => match self.schema.field(key) {
                Some(other) => self.field_name(other).to_string(),
                None => key.clone(),
            },
        }
    }

    fn render_rule(&self, field: &Field, operator: &Operator, values: &[&RuleValue]) -> String {
        let name = self.field_name(field);
        let operands: Vec<String> = values.iter().map(|v| self.operand(field, v)).collect();
        match (operator.query, operands.as_slice()) {
            (QueryTemplate::Infix(op), [v]) => format!("{} {} {}", name, op, v),
            (QueryTemplate::Range(op), [a, b]) => format!("{} {} {} AND {}", name, op, a, b),
            (QueryTemplate::List(op), [v]) => format!("{} {} ({})", name, op, v),
            (QueryTemplate::Postfix(op), _) => format!("{} {}", name, op),
            // Arity and template always agree in the catalog
            (_, operands) => format!("{} {} {}", name, operator.key, operands.join(" ")),
        }
    }
}

impl GroupRenderer for QueryStringRenderer<'_> {
    type Output = String;
    type Error = Infallible;

    fn rule(&mut self, rule: &RuleNode) -> Result<Option<String>, Infallible> {
        let (field, operator) = match resolve_rule(self.schema, rule) {
            Ok(Some(resolved)) => resolved,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!("Leaving rule {} out of the query string: {}", rule.id, e);
                return Ok(None);
            }
        };
        let values: Vec<&RuleValue> = rule.values.iter().filter_map(|s| s.value.as_ref()).collect();
        Ok(Some(self.render_rule(field, operator, &values)))
    }

    fn group(&mut self, group: &GroupNode, children: Vec<String>) -> String {
        let separator = format!(" {} ", group.conjunction);
        let body = format!("({})", children.join(&separator));
        if group.negated {
            format!("NOT {}", body)
        } else {
            body
        }
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn render(tree: &Tree, schema: &Schema, labels: bool) -> String {
    let mut renderer = QueryStringRenderer { schema, labels };
    match render_group(tree, tree.root(), &mut renderer) {
        Ok(out) => out.unwrap_or_default(),
        Err(never) => match never {},
    }
}

/// Render the tree as a query string using field keys and option values
///
/// Rules whose field or operator the schema does not know are left out and
/// logged; this export never fails. An empty tree renders as `""`.
pub fn to_query_string(tree: &Tree, schema: &Schema) -> String {
    render(tree, schema, false)
}

/// [`to_query_string`] with field labels and select option titles
pub fn to_display_string(tree: &Tree, schema: &Schema) -> String {
    render(tree, schema, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BuilderSettings, Conjunction, ListValue, ValueType};
    use crate::operations::{
        add_group_with_id, add_rule_with_id, set_conjunction, set_negation, set_operator,
        set_value,
    };

    fn schema() -> Schema {
        Schema::register(
            vec![
                Field::new("price", ValueType::Number)
                    .with_label("Price")
                    .with_min(10.0)
                    .with_max(100.0),
                Field::new("name", ValueType::Text).with_label("Name"),
                Field::new("color", ValueType::Select)
                    .with_label("Color")
                    .with_options(vec![
                        ListValue::new("green", "Green"),
                        ListValue::new("orange", "Orange"),
                    ]),
            ],
            BuilderSettings::default(),
        )
        .unwrap()
    }

    fn sample(schema: &Schema) -> Tree {
        let tree = Tree::empty_with_id("root".into(), Conjunction::And);
        let tree = add_rule_with_id(&tree, schema, &"root".into(), "price", "r1".into()).unwrap();
        let tree = set_operator(&tree, schema, &"r1".into(), "between").unwrap();
        let tree = set_value(&tree, schema, &"r1".into(), 0, RuleValue::number(30)).unwrap();
        let tree = set_value(&tree, schema, &"r1".into(), 1, RuleValue::number(100)).unwrap();
        let tree = add_rule_with_id(&tree, schema, &"root".into(), "color", "r2".into()).unwrap();
        set_value(&tree, schema, &"r2".into(), 0, RuleValue::select("green")).unwrap()
    }

    #[test]
    fn test_query_string() {
        let schema = schema();
        assert_eq!(
            to_query_string(&sample(&schema), &schema),
            r#"(price BETWEEN 30 AND 100 AND color = "green")"#
        );
    }

    #[test]
    fn test_display_string_uses_labels() {
        let schema = schema();
        assert_eq!(
            to_display_string(&sample(&schema), &schema),
            r#"(Price BETWEEN 30 AND 100 AND Color = "Green")"#
        );
    }

    #[test]
    fn test_nested_negated_group_and_quoting() {
        let schema = schema();
        let tree = sample(&schema);
        let tree = add_group_with_id(&tree, &schema, &"root".into(), "g1".into()).unwrap();
        let tree = set_conjunction(&tree, &schema, &"g1".into(), Conjunction::Or).unwrap();
        let tree = set_negation(&tree, &schema, &"g1".into(), true).unwrap();
        let tree = add_rule_with_id(&tree, &schema, &"g1".into(), "name", "r3".into()).unwrap();
        let tree =
            set_value(&tree, &schema, &"r3".into(), 0, RuleValue::text(r#"say "hi""#)).unwrap();
        let tree = add_rule_with_id(&tree, &schema, &"g1".into(), "color", "r4".into()).unwrap();
        let tree = set_operator(&tree, &schema, &"r4".into(), "select_any_in").unwrap();
        let tree = set_value(
            &tree,
            &schema,
            &"r4".into(),
            0,
            RuleValue::multi(["green", "orange"]),
        )
        .unwrap();

        assert_eq!(
            to_query_string(&tree, &schema),
            r#"(price BETWEEN 30 AND 100 AND color = "green" AND NOT (name = "say \"hi\"" OR color IN ("green", "orange")))"#
        );
    }

    #[test]
    fn test_empty_and_incomplete() {
        let schema = schema();
        let tree = Tree::empty_with_id("root".into(), Conjunction::And);
        assert_eq!(to_query_string(&tree, &schema), "");

        let tree = add_group_with_id(&tree, &schema, &"root".into(), "g1".into()).unwrap();
        let tree = add_rule_with_id(&tree, &schema, &"g1".into(), "price", "r1".into()).unwrap();
        assert_eq!(to_query_string(&tree, &schema), "");

        let tree = add_rule_with_id(&tree, &schema, &"root".into(), "name", "r2".into()).unwrap();
        let tree = set_operator(&tree, &schema, &"r2".into(), "is_not_null").unwrap();
        assert_eq!(to_query_string(&tree, &schema), "(name IS NOT NULL)");
    }
}
