//! Query Builder Demo Binary
//!
//! Runs one builder session from the command line: loads a schema and a
//! starting tree, applies a list of edits, logs every saved tree and prints
//! the exports.
//!
//! # Usage
//!
//! ```bash
//! # Demo schema and starting query
//! cargo run --bin qb-demo
//!
//! # Own configuration, tree and edits
//! QB_CONFIG=fields.json QB_TREE=tree.json QB_EDITS=edits.json cargo run --bin qb-demo
//! ```
//!
//! # Environment Variables
//!
//! - `QB_CONFIG`: builder configuration JSON (default: demo configuration)
//! - `QB_TREE`: stored tree JSON (default: demo tree)
//! - `QB_EDITS`: JSON array of edits (default: a short scripted session when
//!   the demo tree is used, none otherwise)
//! - `QB_STORE_DIR`: directory to save the final tree in, as `session.json`
//! - `RUST_LOG`: logging level (e.g. "info", "debug")

use std::env;
use std::fs;

use anyhow::Context;
use querybuilder_core::presets::{self, DEMO_COLOR_RULE_ID, DEMO_PRICE_RULE_ID};
use querybuilder_core::storage::JsonFileStore;
use querybuilder_core::{BuilderConfig, Edit, QueryBuilder};
use serde_json::{json, Value};

fn read_json(path: &str) -> anyhow::Result<Value> {
    let contents = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path))
}

/// What a user of the demo page would do: narrow the price range, switch
/// the color and add a promotion filter
fn scripted_edits(root_id: &str) -> Value {
    json!([
        { "type": "setValue", "ruleId": DEMO_PRICE_RULE_ID, "index": 0, "value": 5 },
        { "type": "setValue", "ruleId": DEMO_PRICE_RULE_ID, "index": 0, "value": 40 },
        { "type": "setOperator", "ruleId": DEMO_COLOR_RULE_ID, "operator": "select_any_in" },
        { "type": "setValue", "ruleId": DEMO_COLOR_RULE_ID, "index": 0, "value": ["green", "orange"] },
        { "type": "addRule", "groupId": root_id, "field": "is_promotion", "id": "promo" },
        { "type": "setValue", "ruleId": "promo", "index": 0, "value": true }
    ])
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match env::var("QB_CONFIG") {
        Ok(path) => BuilderConfig::from_path(&path)?,
        Err(_) => presets::demo_config(),
    };
    let schema = config.into_schema().context("Invalid builder configuration")?;
    tracing::info!("Schema ready with {} fields", schema.fields().len());

    let mut builder = QueryBuilder::with_tree(schema, presets::demo_tree());
    let tree_path = env::var("QB_TREE").ok();
    if let Some(path) = &tree_path {
        let document = read_json(path)?;
        if let Err(e) = builder.load(&document) {
            tracing::warn!("Starting from an empty tree: {}", e);
        }
    }
    for issue in builder.issues() {
        tracing::warn!("Node {}: {}", issue.node_id, issue.error);
    }

    let edits = match (env::var("QB_EDITS"), &tree_path) {
        (Ok(path), _) => read_json(&path)?,
        (Err(_), None) => scripted_edits(builder.tree().root_id().as_str()),
        (Err(_), Some(_)) => json!([]),
    };
    let edits: Vec<Edit> = serde_json::from_value(edits).context("Invalid edit list")?;

    let mut events = builder.subscribe();
    for edit in &edits {
        match builder.apply(edit) {
            Ok(_) => tracing::info!("{}: {}", edit.name(), builder.saved_json()),
            Err(e) => tracing::warn!("{} rejected: {}", edit.name(), e),
        }
    }
    let mut changes = 0;
    while events.try_recv().is_ok() {
        changes += 1;
    }
    tracing::info!("{} of {} edits applied", changes, edits.len());

    println!("Query:   {}", builder.query_string());
    println!("Display: {}", builder.display_string());
    match builder.logic_expression() {
        Ok(logic) => println!("Logic:   {}", logic),
        Err(e) => println!("Logic:   unavailable ({})", e),
    }
    match builder.sql_where() {
        Ok(sql) => println!("SQL:     {}", sql),
        Err(e) => println!("SQL:     unavailable ({})", e),
    }
    for row in builder.outline() {
        println!("{}{} {:?}", "  ".repeat(row.depth), row.text, row.widgets);
    }

    if let Ok(dir) = env::var("QB_STORE_DIR") {
        let store = JsonFileStore::new(&dir)?;
        builder.save_to(&store, "session")?;
    }

    Ok(())
}
