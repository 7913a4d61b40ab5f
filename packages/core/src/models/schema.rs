//! Schema Registry
//!
//! A [`Schema`] is the validated, read-only set of fields a builder session
//! works against, together with the [`BuilderSettings`] that bound the tree
//! shape. Registration is the only place configuration is checked; after that
//! every lookup is infallible in the sense that a missing key simply yields
//! `None`.
//!
//! ## Example
//!
//! ```rust
//! use querybuilder_core::models::{BuilderSettings, Field, Schema, ValueType};
//!
//! let schema = Schema::register(
//!     vec![
//!         Field::new("price", ValueType::Number).with_min(10.0).with_max(100.0),
//!         Field::new("name", ValueType::Text),
//!     ],
//!     BuilderSettings::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(schema.operators_for("price").unwrap()[0].key, "equal");
//! ```

use crate::models::error::ConfigError;
use crate::models::field::{Field, FieldConstraints};
use crate::models::operator::{default_operators_for, find_operator, Operator};
use crate::models::tree::Conjunction;
use crate::models::value::{ValueSource, ValueType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Settings that shape every tree edited against a schema
///
/// All fields use `#[serde(default)]` so partial settings objects deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderSettings {
    /// Maximum group depth; the root group has depth 0. `None` is unlimited.
    #[serde(default)]
    pub max_nesting: Option<usize>,

    /// Maximum number of rules in the whole tree. `None` is unlimited.
    #[serde(default)]
    pub max_number_of_rules: Option<usize>,

    #[serde(default)]
    pub default_conjunction: Conjunction,

    /// Whether front ends offer the NOT toggle on groups
    #[serde(default = "default_show_not")]
    pub show_not: bool,

    /// Source used for freshly created value slots when the field allows it
    #[serde(default)]
    pub default_value_source: ValueSource,
}

fn default_show_not() -> bool {
    true
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            max_nesting: None,
            max_number_of_rules: None,
            default_conjunction: Conjunction::And,
            show_not: default_show_not(),
            default_value_source: ValueSource::Value,
        }
    }
}

/// Field keys are identifier paths such as `price` or `address.city`
const FIELD_KEY_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$";

fn is_valid_field_key(key: &str) -> bool {
    static FIELD_KEY_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = FIELD_KEY_REGEX.get_or_init(|| Regex::new(FIELD_KEY_PATTERN).unwrap());
    regex.is_match(key)
}

/// Validated field registry
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Fields in registration order
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    settings: BuilderSettings,
}

impl Schema {
    /// Validate and register a set of fields
    ///
    /// # Errors
    ///
    /// - `DuplicateField`: two fields share a key
    /// - `InvalidFieldKey`: a key is not a plain identifier path
    /// - `UnknownOperator` / `OperatorNotSupported`: a declared operator does
    ///   not exist or does not apply to the field's value type
    /// - `InvalidRange`: `min` is greater than `max`
    /// - `MissingListValues`: a select field has no options
    /// - `NoOperators` / `NoValueSources`: nothing left to edit the field with
    pub fn register(
        fields: impl IntoIterator<Item = Field>,
        settings: BuilderSettings,
    ) -> Result<Self, ConfigError> {
        let mut registered: Vec<Field> = Vec::new();
        let mut index = HashMap::new();

        for mut field in fields {
            if !is_valid_field_key(&field.key) {
                return Err(ConfigError::InvalidFieldKey { key: field.key });
            }
            if index.contains_key(&field.key) {
                return Err(ConfigError::duplicate_field(field.key));
            }

            if field.operators.is_empty() {
                field.operators = default_operators_for(field.value_type)
                    .into_iter()
                    .map(str::to_string)
                    .collect();
            }
            for key in &field.operators {
                let operator = find_operator(key).ok_or_else(|| ConfigError::UnknownOperator {
                    field: field.key.clone(),
                    operator: key.clone(),
                })?;
                if !operator.supports(field.value_type) {
                    return Err(ConfigError::operator_not_supported(
                        &field.key,
                        key,
                        field.value_type.as_str(),
                    ));
                }
            }
            if field.operators.is_empty() {
                return Err(ConfigError::NoOperators { field: field.key });
            }
            if field.value_sources.is_empty() {
                return Err(ConfigError::NoValueSources { field: field.key });
            }

            if let (Some(min), Some(max)) = (field.constraints.min, field.constraints.max) {
                if min > max {
                    return Err(ConfigError::InvalidRange {
                        field: field.key,
                        min,
                        max,
                    });
                }
            }
            if field.value_type.has_options() && field.constraints.list_values.is_empty() {
                return Err(ConfigError::MissingListValues {
                    field: field.key,
                    value_type: field.value_type.as_str().to_string(),
                });
            }

            index.insert(field.key.clone(), registered.len());
            registered.push(field);
        }

        tracing::debug!("Registered schema with {} fields", registered.len());

        Ok(Self {
            fields: registered,
            index,
            settings,
        })
    }

    pub fn settings(&self) -> &BuilderSettings {
        &self.settings
    }

    /// All fields in registration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.index.get(key).map(|&i| &self.fields[i])
    }

    /// Fields declaring the given value type, in registration order
    pub fn fields_for(&self, value_type: ValueType) -> Vec<&Field> {
        self.fields
            .iter()
            .filter(|f| f.value_type == value_type)
            .collect()
    }

    /// Allowed operators of a field, in declaration order
    pub fn operators_for(&self, key: &str) -> Option<Vec<&'static Operator>> {
        let field = self.field(key)?;
        Some(
            field
                .operators
                .iter()
                .filter_map(|op| find_operator(op))
                .collect(),
        )
    }

    pub fn constraints_for(&self, key: &str) -> Option<&FieldConstraints> {
        self.field(key).map(|f| &f.constraints)
    }

    /// Operator lookup in the built-in catalog
    pub fn operator(&self, key: &str) -> Option<&'static Operator> {
        find_operator(key)
    }

    /// Source for new value slots of `field`
    pub fn initial_source(&self, field: &Field) -> ValueSource {
        let preferred = self.settings.default_value_source;
        if field.allows_source(preferred) {
            preferred
        } else {
            field
                .value_sources
                .first()
                .copied()
                .unwrap_or(ValueSource::Value)
        }
    }
}
