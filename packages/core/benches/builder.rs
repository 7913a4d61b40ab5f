//! Performance benchmarks for query builder edits and exports
//!
//! Run with: `cargo bench -p querybuilder-core`
//!
//! These benchmarks measure:
//! - Single edits on wide and deep trees (structural sharing cost); a value
//!   edit should cost the same whether the tree holds 100 or 10,000 rules
//! - Export throughput for the query string, logic expression and SQL forms
//! - Load/serialize of stored trees

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use querybuilder_core::models::{
    BuilderSettings, Conjunction, Field, ListValue, NodeId, RuleValue, Schema, Tree, ValueType,
};
use querybuilder_core::operations::{add_group_with_id, add_rule_with_id, set_operator, set_value};
use querybuilder_core::{to_logic_expression, to_query_string, to_sql_where};
use serde_json::json;

fn bench_schema() -> Schema {
    Schema::register(
        vec![
            Field::new("price", ValueType::Number).with_min(0.0).with_max(10_000.0),
            Field::new("name", ValueType::Text),
            Field::new("color", ValueType::Select).with_options(vec![
                ListValue::new("green", "Green"),
                ListValue::new("orange", "Orange"),
            ]),
        ],
        BuilderSettings::default(),
    )
    .unwrap()
}

/// Root group with `width` complete `price between` rules
fn wide_tree(schema: &Schema, width: usize) -> Tree {
    let root = NodeId::from("root");
    let mut tree = Tree::empty_with_id(root.clone(), Conjunction::And);
    for i in 0..width {
        let id = NodeId::new(format!("r{}", i));
        tree = add_rule_with_id(&tree, schema, &root, "price", id.clone()).unwrap();
        tree = set_operator(&tree, schema, &id, "between").unwrap();
        tree = set_value(&tree, schema, &id, 0, RuleValue::number(i as i64)).unwrap();
        tree = set_value(&tree, schema, &id, 1, RuleValue::number(i as i64 + 10)).unwrap();
    }
    tree
}

/// Root group with `width` `price equal` rules, loaded in one pass
fn loaded_wide_tree(width: usize) -> Tree {
    let children: Vec<_> = (0..width)
        .map(|i| {
            json!({
                "id": format!("r{}", i),
                "type": "rule",
                "properties": { "field": "price", "operator": "equal", "value": [i] }
            })
        })
        .collect();
    Tree::load(&json!({ "id": "root", "type": "group", "children1": children })).unwrap()
}

/// Chain of `depth` nested groups, each holding one text rule
fn deep_tree(schema: &Schema, depth: usize) -> Tree {
    let mut parent = NodeId::from("root");
    let mut tree = Tree::empty_with_id(parent.clone(), Conjunction::Or);
    for i in 0..depth {
        let rule = NodeId::new(format!("r{}", i));
        tree = add_rule_with_id(&tree, schema, &parent, "name", rule.clone()).unwrap();
        tree = set_value(&tree, schema, &rule, 0, RuleValue::text(format!("item {}", i))).unwrap();
        let group = NodeId::new(format!("g{}", i));
        tree = add_group_with_id(&tree, schema, &parent, group.clone()).unwrap();
        parent = group;
    }
    tree
}

fn bench_edits(c: &mut Criterion) {
    let schema = bench_schema();
    let mut group = c.benchmark_group("edit");

    for width in [10, 100, 1000] {
        let tree = wide_tree(&schema, width);
        let target = NodeId::new(format!("r{}", width / 2));
        group.bench_with_input(BenchmarkId::new("set_value_wide", width), &tree, |b, tree| {
            b.iter(|| {
                set_value(
                    black_box(tree),
                    &schema,
                    &target,
                    0,
                    RuleValue::number(5),
                )
                .unwrap()
            })
        });
    }

    for width in [100, 1_000, 10_000] {
        let tree = loaded_wide_tree(width);
        let target = NodeId::new(format!("r{}", width / 2));
        group.bench_with_input(BenchmarkId::new("set_value_loaded", width), &tree, |b, tree| {
            b.iter(|| {
                set_value(black_box(tree), &schema, &target, 0, RuleValue::number(5)).unwrap()
            })
        });
    }

    for depth in [8, 32] {
        let tree = deep_tree(&schema, depth);
        let target = NodeId::new(format!("r{}", depth - 1));
        group.bench_with_input(BenchmarkId::new("set_value_deep", depth), &tree, |b, tree| {
            b.iter(|| {
                set_value(black_box(tree), &schema, &target, 0, RuleValue::text("x")).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_exports(c: &mut Criterion) {
    let schema = bench_schema();
    let tree = wide_tree(&schema, 500);
    let mut group = c.benchmark_group("export_500_rules");

    group.bench_function("query_string", |b| {
        b.iter(|| to_query_string(black_box(&tree), &schema))
    });
    group.bench_function("logic_expression", |b| {
        b.iter(|| to_logic_expression(black_box(&tree), &schema).unwrap())
    });
    group.bench_function("sql_where", |b| {
        b.iter(|| to_sql_where(black_box(&tree), &schema).unwrap())
    });

    group.finish();
}

fn bench_load(c: &mut Criterion) {
    let schema = bench_schema();
    let wide = wide_tree(&schema, 500).serialize();
    let deep = deep_tree(&schema, 32).serialize();

    c.bench_function("load_wide_500", |b| b.iter(|| Tree::load(black_box(&wide)).unwrap()));
    c.bench_function("load_deep_32", |b| b.iter(|| Tree::load(black_box(&deep)).unwrap()));
}

criterion_group!(benches, bench_edits, bench_exports, bench_load);
criterion_main!(benches);
