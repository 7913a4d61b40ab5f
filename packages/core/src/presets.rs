//! Demo presets
//!
//! The product catalogue schema and starting query used by the `qb-demo`
//! binary, the benchmarks and the integration tests.

use crate::config::{BuilderConfig, FieldConfig, FieldSettings};
use crate::models::{
    BuilderSettings, ConfigError, Conjunction, GroupNode, ListValue, Node, NodeId, RuleNode,
    RuleValue, Schema, Tree, ValueSlot, ValueSource, ValueType, WidgetKind,
};
use std::sync::Arc;

/// Id of the `price between` rule in [`demo_tree`]
pub const DEMO_PRICE_RULE_ID: &str = "ba88bb89-89ab-4cde-b012-31951b8f840f";

/// Id of the `color select_equals` rule in [`demo_tree`]
pub const DEMO_COLOR_RULE_ID: &str = "989ba9aa-4567-489a-bcde-f1951b902458";

fn field(label: &str, value_type: ValueType) -> FieldConfig {
    FieldConfig {
        label: Some(label.to_string()),
        ..FieldConfig::new(value_type)
    }
}

/// Product catalogue fields: AND by default, no NOT toggle, one level deep
pub fn demo_config() -> BuilderConfig {
    let settings = BuilderSettings {
        max_nesting: Some(1),
        default_conjunction: Conjunction::And,
        show_not: false,
        ..Default::default()
    };

    BuilderConfig {
        settings,
        fields: Vec::new(),
    }
    .with_field(
        "qty",
        FieldConfig {
            prefer_widgets: vec![WidgetKind::Number],
            field_settings: FieldSettings {
                min: Some(0.0),
                ..Default::default()
            },
            ..field("Qty", ValueType::Number)
        },
    )
    .with_field(
        "price",
        FieldConfig {
            prefer_widgets: vec![WidgetKind::Slider, WidgetKind::RangeSlider],
            field_settings: FieldSettings {
                min: Some(10.0),
                max: Some(100.0),
                ..Default::default()
            },
            ..field("Price", ValueType::Number)
        },
    )
    .with_field("name", field("Name", ValueType::Text))
    .with_field(
        "color",
        FieldConfig {
            field_settings: FieldSettings {
                list_values: vec![
                    ListValue::new("yellow", "Yellow"),
                    ListValue::new("green", "Green"),
                    ListValue::new("orange", "Orange"),
                ],
                ..Default::default()
            },
            ..field("Color", ValueType::Select)
        },
    )
    .with_field(
        "is_promotion",
        FieldConfig {
            operators: vec!["equal".to_string()],
            ..field("Promo?", ValueType::Boolean)
        },
    )
}

pub fn demo_schema() -> Result<Schema, ConfigError> {
    demo_config().into_schema()
}

/// Starting query: `price BETWEEN 30 AND 100 AND color = green`
///
/// Rule ids are fixed; the root gets a fresh id on every call.
pub fn demo_tree() -> Tree {
    let root = NodeId::generate();
    let price = NodeId::from(DEMO_PRICE_RULE_ID);
    let color = NodeId::from(DEMO_COLOR_RULE_ID);

    let nodes = [
        Node::Group(GroupNode {
            id: root.clone(),
            parent: None,
            conjunction: Conjunction::And,
            negated: false,
            children: vec![price.clone(), color.clone()],
        }),
        Node::Rule(RuleNode {
            id: price,
            parent: Some(root.clone()),
            field: "price".to_string(),
            operator: "between".to_string(),
            values: vec![
                ValueSlot::filled(RuleValue::number(30)),
                ValueSlot::filled(RuleValue::number(100)),
            ],
        }),
        Node::Rule(RuleNode {
            id: color,
            parent: Some(root.clone()),
            field: "color".to_string(),
            operator: "select_equals".to_string(),
            values: vec![ValueSlot {
                value: Some(RuleValue::select("green")),
                source: ValueSource::Value,
                error: None,
            }],
        }),
    ];

    Tree::from_arena(
        root,
        nodes
            .into_iter()
            .map(|node| (node.id().clone(), Arc::new(node))),
    )
}
