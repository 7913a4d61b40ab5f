//! Logic expression exporter
//!
//! Produces JsonLogic-style nested objects: groups become `{"and": [...]}` or
//! `{"or": [...]}`, rules become operator objects over `{"var": field}`, and
//! negation wraps the expression in `{"!": ...}`.

use crate::export::{render_group, resolve_rule, ExportError, GroupRenderer};
use crate::models::{GroupNode, LogicKind, RuleNode, RuleValue, Schema, Tree};
use serde_json::{json, Map, Value};

/// A logic expression document
pub type LogicExpr = Value;

fn op(name: &str, args: Value) -> Value {
    let mut object = Map::new();
    object.insert(name.to_string(), args);
    Value::Object(object)
}

fn var(key: &str) -> Value {
    json!({ "var": key })
}

fn operand(value: &RuleValue) -> Value {
    match value {
        RuleValue::Field(key) => var(key),
        other => other.to_json(),
    }
}

struct LogicRenderer<'a> {
    schema: &'a Schema,
}

impl GroupRenderer for LogicRenderer<'_> {
    type Output = Value;
    type Error = ExportError;

    fn rule(&mut self, rule: &RuleNode) -> Result<Option<Value>, ExportError> {
        let Some((field, operator)) = resolve_rule(self.schema, rule)? else {
            return Ok(None);
        };
        let unsupported = || ExportError::unsupported_operator(operator.key, &field.key, "logic");
        let mapping = operator.logic.ok_or_else(unsupported)?;

        let subject = var(&field.key);
        let values: Vec<Value> = rule
            .values
            .iter()
            .filter_map(|slot| slot.value.as_ref())
            .map(operand)
            .collect();

        let expr = match (mapping.kind, values.as_slice()) {
            (LogicKind::Compare(name), [v]) => op(name, json!([subject, v])),
            (LogicKind::Substring, [v]) => op("in", json!([v, subject])),
            (LogicKind::Range, [low, high]) => op("<=", json!([low, subject, high])),
            (LogicKind::Truthy, []) => op("!!", subject),
            (LogicKind::Falsy, []) => op("!", subject),
            (LogicKind::NullCompare(name), []) => op(name, json!([subject, null])),
            (LogicKind::AnyIn, [list]) => op("in", json!([subject, list])),
            (LogicKind::AllIn, [list]) => op(
                "all",
                json!([subject, { "in": [{ "var": "" }, list] }]),
            ),
            _ => return Err(unsupported()),
        };

        Ok(Some(if mapping.negate { op("!", expr) } else { expr }))
    }

    fn group(&mut self, group: &GroupNode, children: Vec<Value>) -> Value {
        let combined = op(
            &group.conjunction.as_str().to_ascii_lowercase(),
            Value::Array(children),
        );
        negate_if(group, combined)
    }

    fn empty_group(&mut self, group: &GroupNode) -> Option<Value> {
        Some(negate_if(group, Value::Bool(true)))
    }
}

fn negate_if(group: &GroupNode, expr: Value) -> Value {
    if group.negated {
        op("!", expr)
    } else {
        expr
    }
}

/// Convert the tree into a logic expression
///
/// An empty tree, or one where every rule is still incomplete, exports as
/// `true`. A group inside the tree with nothing to export is `true` too (or
/// `{"!": true}` when negated).
///
/// # Errors
///
/// - `UnsupportedOperator`: a complete rule uses an operator without a
///   logic mapping (`starts_with`, `ends_with`)
/// - `UnknownField` / `UnknownOperator`: a rule refers to something the
///   schema does not define
pub fn to_logic_expression(tree: &Tree, schema: &Schema) -> Result<LogicExpr, ExportError> {
    let mut renderer = LogicRenderer { schema };
    Ok(render_group(tree, tree.root(), &mut renderer)?.unwrap_or(Value::Bool(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BuilderSettings, Conjunction, Field, ListValue, NodeId, ValueSource, ValueType};
    use crate::operations::{
        add_group_with_id, add_rule_with_id, set_conjunction, set_negation, set_operator,
        set_value,
    };

    fn schema() -> Schema {
        Schema::register(
            vec![
                Field::new("qty", ValueType::Number),
                Field::new("price", ValueType::Number)
                    .with_min(10.0)
                    .with_max(100.0)
                    .with_value_sources(vec![ValueSource::Value, ValueSource::Field]),
                Field::new("name", ValueType::Text),
                Field::new("color", ValueType::Select).with_options(vec![
                    ListValue::new("green", "Green"),
                    ListValue::new("orange", "Orange"),
                ]),
                Field::new("tags", ValueType::MultiSelect).with_options(vec![
                    ListValue::new("new", "New"),
                    ListValue::new("sale", "Sale"),
                ]),
            ],
            BuilderSettings::default(),
        )
        .unwrap()
    }

    /// Tree with a single rule on `field` using `operator`, values set in order
    fn single(schema: &Schema, field: &str, operator: &str, values: Vec<RuleValue>) -> Tree {
        let id = NodeId::from("r1");
        let tree = Tree::empty_with_id("root".into(), Conjunction::And);
        let tree = add_rule_with_id(&tree, schema, &"root".into(), field, id.clone()).unwrap();
        let mut tree = set_operator(&tree, schema, &id, operator).unwrap();
        for (i, value) in values.into_iter().enumerate() {
            tree = set_value(&tree, schema, &id, i, value).unwrap();
        }
        tree
    }

    fn export_single(field: &str, operator: &str, values: Vec<RuleValue>) -> Value {
        let schema = schema();
        let tree = single(&schema, field, operator, values);
        to_logic_expression(&tree, &schema).unwrap()["and"][0].clone()
    }

    #[test]
    fn test_between_and_select() {
        assert_eq!(
            export_single("price", "between", vec![RuleValue::number(30), RuleValue::number(100)]),
            json!({ "<=": [30, { "var": "price" }, 100] })
        );
        assert_eq!(
            export_single("color", "select_equals", vec![RuleValue::select("green")]),
            json!({ "==": [{ "var": "color" }, "green"] })
        );
    }

    #[test]
    fn test_operator_shapes() {
        assert_eq!(
            export_single("name", "like", vec![RuleValue::text("app")]),
            json!({ "in": ["app", { "var": "name" }] })
        );
        assert_eq!(
            export_single("name", "not_like", vec![RuleValue::text("app")]),
            json!({ "!": { "in": ["app", { "var": "name" }] } })
        );
        assert_eq!(
            export_single("price", "not_between", vec![RuleValue::number(10), RuleValue::number(20)]),
            json!({ "!": { "<=": [10, { "var": "price" }, 20] } })
        );
        assert_eq!(
            export_single("name", "is_empty", vec![]),
            json!({ "!": { "var": "name" } })
        );
        assert_eq!(
            export_single("name", "is_not_empty", vec![]),
            json!({ "!!": { "var": "name" } })
        );
        assert_eq!(
            export_single("qty", "is_null", vec![]),
            json!({ "==": [{ "var": "qty" }, null] })
        );
        assert_eq!(
            export_single("color", "select_any_in", vec![RuleValue::multi(["green", "orange"])]),
            json!({ "in": [{ "var": "color" }, ["green", "orange"]] })
        );
        assert_eq!(
            export_single("tags", "multiselect_contains", vec![RuleValue::multi(["sale"])]),
            json!({ "all": [{ "var": "tags" }, { "in": [{ "var": "" }, ["sale"]] }] })
        );
    }

    #[test]
    fn test_field_reference_exports_as_var() {
        assert_eq!(
            export_single("price", "greater", vec![RuleValue::field("qty")]),
            json!({ ">": [{ "var": "price" }, { "var": "qty" }] })
        );
    }

    #[test]
    fn test_empty_tree_is_true() {
        let schema = schema();
        let tree = Tree::empty(Conjunction::Or);
        assert_eq!(to_logic_expression(&tree, &schema).unwrap(), json!(true));

        // A rule that is still being filled in does not count
        let tree = single(&schema, "price", "between", vec![RuleValue::number(30)]);
        assert_eq!(to_logic_expression(&tree, &schema).unwrap(), json!(true));
    }

    #[test]
    fn test_negated_group() {
        let schema = schema();
        let tree = single(&schema, "qty", "equal", vec![RuleValue::number(3)]);
        let tree = set_negation(&tree, &schema, &"root".into(), true).unwrap();
        assert_eq!(
            to_logic_expression(&tree, &schema).unwrap(),
            json!({ "!": { "and": [{ "==": [{ "var": "qty" }, 3] }] } })
        );
    }

    #[test]
    fn test_empty_group_is_neutral() {
        let schema = schema();
        let tree = single(&schema, "qty", "equal", vec![RuleValue::number(3)]);
        let tree = set_conjunction(&tree, &schema, &"root".into(), Conjunction::Or).unwrap();
        let tree = add_group_with_id(&tree, &schema, &"root".into(), "g1".into()).unwrap();
        assert_eq!(
            to_logic_expression(&tree, &schema).unwrap(),
            json!({ "or": [{ "==": [{ "var": "qty" }, 3] }, true] })
        );

        let tree = set_conjunction(&tree, &schema, &"root".into(), Conjunction::And).unwrap();
        let tree = set_negation(&tree, &schema, &"g1".into(), true).unwrap();
        assert_eq!(
            to_logic_expression(&tree, &schema).unwrap(),
            json!({ "and": [{ "==": [{ "var": "qty" }, 3] }, { "!": true }] })
        );
    }

    #[test]
    fn test_field_reference_to_unknown_field_is_reported() {
        let tree = Tree::load(&json!({
            "id": "root",
            "children1": [{
                "id": "r1",
                "type": "rule",
                "properties": {
                    "field": "price",
                    "operator": "equal",
                    "value": ["weight"],
                    "valueSrc": ["field"]
                }
            }]
        }))
        .unwrap();
        assert_eq!(
            to_logic_expression(&tree, &schema()).unwrap_err(),
            ExportError::UnknownField {
                rule_id: "r1".to_string(),
                field: "weight".to_string(),
            }
        );
    }

    #[test]
    fn test_unsupported_operator_is_reported() {
        let schema = schema();
        let tree = single(&schema, "name", "starts_with", vec![RuleValue::text("a")]);
        assert_eq!(
            to_logic_expression(&tree, &schema).unwrap_err(),
            ExportError::unsupported_operator("starts_with", "name", "logic")
        );
    }

    #[test]
    fn test_unknown_field_is_reported() {
        let tree = Tree::load(&json!({
            "id": "root",
            "children1": [
                { "id": "r1", "type": "rule", "properties": { "field": "weight", "operator": "equal", "value": [1] } }
            ]
        }))
        .unwrap();
        assert!(matches!(
            to_logic_expression(&tree, &schema()),
            Err(ExportError::UnknownField { .. })
        ));
    }
}
