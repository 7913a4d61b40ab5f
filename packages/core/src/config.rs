//! Builder configuration
//!
//! The JSON form an embedding application uses to describe its fields:
//!
//! ```json
//! {
//!   "settings": { "maxNesting": 1, "showNot": false },
//!   "fields": {
//!     "price": {
//!       "label": "Price",
//!       "type": "number",
//!       "preferWidgets": ["slider", "rangeslider"],
//!       "fieldSettings": { "min": 10, "max": 100 }
//!     },
//!     "color": {
//!       "type": "select",
//!       "fieldSettings": {
//!         "listValues": [{ "value": "green", "title": "Green" }]
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Every property except `type` is optional. Field order in the document is
//! kept and becomes the schema's registration order.

use crate::models::{
    BuilderSettings, ConfigError, Field, FieldConstraints, ListValue, Schema, ValueSource,
    ValueType, WidgetKind,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-field value constraints
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list_values: Vec<ListValue>,
}

/// Configuration of a single field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    /// Display label, defaults to the field key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(rename = "type")]
    pub value_type: ValueType,

    /// Allowed operators; empty means every operator of the value type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operators: Vec<String>,

    #[serde(default = "default_value_sources")]
    pub value_sources: Vec<ValueSource>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefer_widgets: Vec<WidgetKind>,

    #[serde(default)]
    pub field_settings: FieldSettings,
}

fn default_value_sources() -> Vec<ValueSource> {
    vec![ValueSource::Value]
}

impl FieldConfig {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            label: None,
            value_type,
            operators: Vec::new(),
            value_sources: default_value_sources(),
            prefer_widgets: Vec::new(),
            field_settings: FieldSettings::default(),
        }
    }

    fn into_field(self, key: String) -> Field {
        let FieldSettings {
            min,
            max,
            step,
            list_values,
        } = self.field_settings;
        Field {
            label: self.label.unwrap_or_else(|| key.clone()),
            key,
            value_type: self.value_type,
            operators: self.operators,
            value_sources: self.value_sources,
            prefer_widgets: self.prefer_widgets,
            constraints: FieldConstraints {
                min,
                max,
                step,
                list_values,
            },
        }
    }
}

/// Complete builder configuration: settings plus fields in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuilderConfig {
    #[serde(default)]
    pub settings: BuilderSettings,

    #[serde(default, with = "ordered_fields")]
    pub fields: Vec<(String, FieldConfig)>,
}

impl BuilderConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Read a configuration file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("Read builder configuration from {}", path.display());
        Self::from_json_str(&contents)
    }

    /// Add or replace a field, keeping its position when replaced
    pub fn with_field(mut self, key: impl Into<String>, field: FieldConfig) -> Self {
        let key = key.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = field,
            None => self.fields.push((key, field)),
        }
        self
    }

    /// Validate the configuration and build the schema
    pub fn into_schema(self) -> Result<Schema, ConfigError> {
        let fields = self
            .fields
            .into_iter()
            .map(|(key, config)| config.into_field(key));
        Schema::register(fields, self.settings)
    }
}

/// Serde adapter keeping a JSON object's key order
mod ordered_fields {
    use super::FieldConfig;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(
        fields: &[(String, FieldConfig)],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(fields.len()))?;
        for (key, field) in fields {
            map.serialize_entry(key, field)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<(String, FieldConfig)>, D::Error> {
        deserializer.deserialize_map(FieldsVisitor)
    }

    struct FieldsVisitor;

    impl<'de> Visitor<'de> for FieldsVisitor {
        type Value = Vec<(String, FieldConfig)>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of field keys to field configurations")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
            while let Some(entry) = access.next_entry::<String, FieldConfig>()? {
                fields.push(entry);
            }
            Ok(fields)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Conjunction;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "settings": { "maxNesting": 2, "defaultConjunction": "OR" },
        "fields": {
            "qty": { "label": "Qty", "type": "number", "fieldSettings": { "min": 0 } },
            "color": {
                "type": "select",
                "operators": ["select_equals", "select_any_in"],
                "fieldSettings": { "listValues": [{ "value": "green", "title": "Green" }] }
            },
            "in_stock": { "type": "boolean" }
        }
    }"#;

    #[test]
    fn test_parse_keeps_field_order() {
        let config = BuilderConfig::from_json_str(CONFIG).unwrap();
        let keys: Vec<_> = config.fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["qty", "color", "in_stock"]);
        assert_eq!(config.settings.max_nesting, Some(2));
        assert_eq!(config.settings.default_conjunction, Conjunction::Or);
        assert!(config.settings.show_not);
    }

    #[test]
    fn test_into_schema() {
        let schema = BuilderConfig::from_json_str(CONFIG)
            .unwrap()
            .into_schema()
            .unwrap();
        let qty = schema.field("qty").unwrap();
        assert_eq!(qty.label, "Qty");
        assert_eq!(qty.constraints.min, Some(0.0));
        assert_eq!(schema.field("color").unwrap().label, "color");
        assert_eq!(
            schema.field("color").unwrap().operators,
            vec!["select_equals", "select_any_in"]
        );
        assert_eq!(schema.fields()[2].key, "in_stock");
    }

    #[test]
    fn test_invalid_config_is_reported() {
        let err = BuilderConfig::from_json_str(r#"{ "fields": { "x": { "type": "colour" } } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = BuilderConfig::from_json_str(
            r#"{ "fields": { "x": { "type": "text", "operators": ["between"] } } }"#,
        )
        .unwrap()
        .into_schema()
        .unwrap_err();
        assert!(matches!(err, ConfigError::OperatorNotSupported { .. }));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let config = BuilderConfig::from_path(file.path()).unwrap();
        assert_eq!(config.fields.len(), 3);

        assert!(matches!(
            BuilderConfig::from_path("/definitely/not/here.json"),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_serialize_round_trip() {
        let config = BuilderConfig::default()
            .with_field("b", FieldConfig::new(ValueType::Text))
            .with_field("a", FieldConfig::new(ValueType::Number));
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(BuilderConfig::from_json_str(&json).unwrap(), config);
        assert!(json.find("\"b\"").unwrap() < json.find("\"a\"").unwrap());
    }
}
