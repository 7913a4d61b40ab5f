//! Property tests over randomly edited trees
//!
//! Trees are built by replaying random edit sequences against a fixed schema.
//! Rejected edits are skipped, so every generated tree is one a user could
//! have produced.

use proptest::prelude::*;
use querybuilder_core::models::{
    BuilderSettings, Conjunction, Field, ListValue, Node, NodeId, RuleValue, Schema, Tree,
    ValueType,
};
use querybuilder_core::operations::{
    add_group, add_rule, move_node, remove_node, set_conjunction, set_negation, set_operator,
    set_value,
};
use querybuilder_core::{to_logic_expression, to_query_string, to_sql_where};

const FIELDS: [&str; 4] = ["qty", "name", "color", "tags"];
const OPTIONS: [&str; 3] = ["red", "green", "blue"];

fn schema() -> Schema {
    let options = || OPTIONS.iter().map(|o| ListValue::new(*o, o.to_uppercase())).collect();
    Schema::register(
        vec![
            Field::new("qty", ValueType::Number).with_min(0.0).with_max(1000.0),
            Field::new("name", ValueType::Text),
            Field::new("color", ValueType::Select).with_options(options()),
            Field::new("tags", ValueType::MultiSelect).with_options(options()),
        ],
        BuilderSettings {
            max_nesting: Some(4),
            max_number_of_rules: Some(24),
            ..Default::default()
        },
    )
    .unwrap()
}

#[derive(Clone, Debug)]
enum Step {
    AddRule { group: usize, field: usize },
    AddGroup { group: usize },
    SetOperator { rule: usize, operator: usize },
    SetValue { rule: usize, slot: usize, seed: u16, text: String },
    Remove { node: usize },
    Move { node: usize, group: usize, index: usize },
    Negate { group: usize },
    Flip { group: usize },
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (any::<usize>(), 0..FIELDS.len()).prop_map(|(group, field)| Step::AddRule { group, field }),
        1 => any::<usize>().prop_map(|group| Step::AddGroup { group }),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(rule, operator)| Step::SetOperator { rule, operator }),
        4 => (any::<usize>(), 0..2usize, any::<u16>(), "[a-z\"' %_]{1,6}")
            .prop_map(|(rule, slot, seed, text)| Step::SetValue { rule, slot, seed, text }),
        1 => any::<usize>().prop_map(|node| Step::Remove { node }),
        1 => (any::<usize>(), any::<usize>(), 0..4usize)
            .prop_map(|(node, group, index)| Step::Move { node, group, index }),
        1 => any::<usize>().prop_map(|group| Step::Negate { group }),
        1 => any::<usize>().prop_map(|group| Step::Flip { group }),
    ]
}

fn pick<'a>(ids: &'a [NodeId], n: usize) -> Option<&'a NodeId> {
    if ids.is_empty() {
        None
    } else {
        Some(&ids[n % ids.len()])
    }
}

fn value_for(schema: &Schema, tree: &Tree, rule_id: &NodeId, seed: u16, text: String) -> Option<RuleValue> {
    let rule = tree.rule(rule_id)?;
    let field = schema.field(&rule.field)?;
    let operator = schema.operator(&rule.operator)?;
    let option = OPTIONS[seed as usize % OPTIONS.len()];
    Some(match operator.slot_type_for(field.value_type) {
        ValueType::Number => RuleValue::number(i64::from(seed % 1200)),
        ValueType::Text => RuleValue::text(text),
        ValueType::Select => RuleValue::select(option),
        ValueType::MultiSelect => RuleValue::multi(OPTIONS.iter().copied().filter(|o| *o != option)),
        ValueType::Boolean => RuleValue::Boolean(seed % 2 == 0),
        ValueType::Date => return None,
    })
}

fn apply(schema: &Schema, tree: &Tree, step: Step) -> Tree {
    let walk = tree.walk();
    let groups: Vec<NodeId> = walk
        .iter()
        .filter(|(_, n)| matches!(n, Node::Group(_)))
        .map(|(_, n)| n.id().clone())
        .collect();
    let rules: Vec<NodeId> = walk
        .iter()
        .filter(|(_, n)| matches!(n, Node::Rule(_)))
        .map(|(_, n)| n.id().clone())
        .collect();
    let nodes: Vec<NodeId> = walk.iter().map(|(_, n)| n.id().clone()).collect();

    let result = match step {
        Step::AddRule { group, field } => pick(&groups, group)
            .map(|g| add_rule(tree, schema, g, FIELDS[field])),
        Step::AddGroup { group } => pick(&groups, group).map(|g| add_group(tree, schema, g)),
        Step::SetOperator { rule, operator } => pick(&rules, rule).and_then(|r| {
            let key = tree.rule(r)?.field.clone();
            let operators = schema.operators_for(&key)?;
            let op = operators[operator % operators.len()].key;
            Some(set_operator(tree, schema, r, op))
        }),
        Step::SetValue { rule, slot, seed, text } => pick(&rules, rule).and_then(|r| {
            let value = value_for(schema, tree, r, seed, text)?;
            Some(set_value(tree, schema, r, slot, value))
        }),
        Step::Remove { node } => pick(&nodes, node).map(|n| remove_node(tree, schema, n)),
        Step::Move { node, group, index } => match (pick(&nodes, node), pick(&groups, group)) {
            (Some(n), Some(g)) => Some(move_node(tree, schema, n, g, index)),
            _ => None,
        },
        Step::Negate { group } => pick(&groups, group).map(|g| {
            let negated = tree.group(g).map_or(false, |grp| grp.negated);
            set_negation(tree, schema, g, !negated)
        }),
        Step::Flip { group } => pick(&groups, group).map(|g| {
            let conjunction = match tree.group(g).map(|grp| grp.conjunction) {
                Some(Conjunction::And) => Conjunction::Or,
                _ => Conjunction::And,
            };
            set_conjunction(tree, schema, g, conjunction)
        }),
    };

    match result {
        Some(Ok(next)) => next,
        _ => tree.clone(),
    }
}

fn arb_tree() -> impl Strategy<Value = Tree> {
    prop::collection::vec(arb_step(), 0..40).prop_map(|steps| {
        let schema = schema();
        steps
            .into_iter()
            .fold(Tree::empty(Conjunction::And), |tree, step| apply(&schema, &tree, step))
    })
}

proptest! {
    #[test]
    fn prop_load_serialize_round_trip(tree in arb_tree()) {
        let loaded = Tree::load(&tree.serialize()).unwrap();
        prop_assert_eq!(&loaded, &tree);
        prop_assert_eq!(Tree::from_json_str(&tree.to_json_string()).unwrap(), tree);
    }

    #[test]
    fn prop_exports_are_deterministic(tree in arb_tree()) {
        let schema = schema();
        prop_assert_eq!(to_query_string(&tree, &schema), to_query_string(&tree, &schema));
        prop_assert_eq!(to_logic_expression(&tree, &schema), to_logic_expression(&tree, &schema));
        prop_assert_eq!(to_sql_where(&tree, &schema), to_sql_where(&tree, &schema));

        // A reloaded copy exports the same way
        let loaded = Tree::load(&tree.serialize()).unwrap();
        prop_assert_eq!(to_query_string(&loaded, &schema), to_query_string(&tree, &schema));
    }

    #[test]
    fn prop_set_operator_resets_arity(tree in arb_tree(), pick_rule in any::<usize>(), pick_op in any::<usize>()) {
        let schema = schema();
        let rules: Vec<NodeId> = tree
            .walk()
            .into_iter()
            .filter_map(|(_, n)| n.as_rule().map(|r| r.id.clone()))
            .collect();
        prop_assume!(!rules.is_empty());

        let rule_id = &rules[pick_rule % rules.len()];
        let field = tree.rule(rule_id).unwrap().field.clone();
        let operators = schema.operators_for(&field).unwrap();
        let operator = operators[pick_op % operators.len()];

        let next = set_operator(&tree, &schema, rule_id, operator.key).unwrap();
        let rule = next.rule(rule_id).unwrap();
        prop_assert_eq!(rule.values.len(), operator.arity);
        prop_assert!(rule.values.iter().all(|slot| slot.value.is_none()));
    }

    #[test]
    fn prop_rule_limit_holds(tree in arb_tree()) {
        prop_assert!(tree.rule_count() <= 24);
        let depth = tree.walk().into_iter().map(|(d, _)| d).max().unwrap_or(0);
        // Groups stop at depth 3 with max_nesting 4; rules sit one below
        prop_assert!(depth <= 4);
    }
}
