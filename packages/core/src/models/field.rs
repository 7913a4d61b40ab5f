//! Field definitions
//!
//! A [`Field`] describes one queryable attribute: its value type, the
//! operators and value sources it allows, the widgets a front end should
//! prefer, and the constraints applied to literal values.

use crate::models::value::{ValueSource, ValueType};
use serde::{Deserialize, Serialize};

/// Input widget kinds a front end can render for a value slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Number,
    Slider,
    #[serde(rename = "rangeslider")]
    RangeSlider,
    Text,
    Boolean,
    Select,
    #[serde(rename = "multiselect")]
    MultiSelect,
    Date,
    /// Field picker used when the slot references another field
    Field,
}

impl WidgetKind {
    /// Widget used when a field declares no preference
    pub fn default_for(value_type: ValueType) -> Self {
        match value_type {
            ValueType::Number => WidgetKind::Number,
            ValueType::Text => WidgetKind::Text,
            ValueType::Boolean => WidgetKind::Boolean,
            ValueType::Select => WidgetKind::Select,
            ValueType::MultiSelect => WidgetKind::MultiSelect,
            ValueType::Date => WidgetKind::Date,
        }
    }

    /// Whether this widget can edit a slot of the given type
    pub fn accepts(&self, value_type: ValueType) -> bool {
        match self {
            WidgetKind::Number | WidgetKind::Slider | WidgetKind::RangeSlider => {
                value_type == ValueType::Number
            }
            WidgetKind::Text => value_type == ValueType::Text,
            WidgetKind::Boolean => value_type == ValueType::Boolean,
            WidgetKind::Select => value_type == ValueType::Select,
            WidgetKind::MultiSelect => value_type == ValueType::MultiSelect,
            WidgetKind::Date => value_type == ValueType::Date,
            WidgetKind::Field => false,
        }
    }
}

/// One selectable option of a select or multiselect field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListValue {
    pub value: String,
    pub title: String,
}

impl ListValue {
    pub fn new(value: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            title: title.into(),
        }
    }
}

/// Constraints applied to literal values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Slider step, display only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub list_values: Vec<ListValue>,
}

impl FieldConstraints {
    /// Whether `n` lies within `[min, max]`
    pub fn contains(&self, n: f64) -> bool {
        self.min.map_or(true, |min| n >= min) && self.max.map_or(true, |max| n <= max)
    }

    pub fn has_option(&self, value: &str) -> bool {
        self.list_values.iter().any(|lv| lv.value == value)
    }

    pub fn option_title(&self, value: &str) -> Option<&str> {
        self.list_values
            .iter()
            .find(|lv| lv.value == value)
            .map(|lv| lv.title.as_str())
    }
}

/// Definition of a queryable field
///
/// Fields are immutable once registered in a [`Schema`](crate::models::Schema).
/// An empty `operators` list means "every built-in operator for the value
/// type" and is filled in during registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub label: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub operators: Vec<String>,
    #[serde(default)]
    pub value_sources: Vec<ValueSource>,
    #[serde(default)]
    pub prefer_widgets: Vec<WidgetKind>,
    #[serde(default)]
    pub constraints: FieldConstraints,
}

impl Field {
    /// Create a field with defaults: label equal to the key, all operators of
    /// the type, literal values only, no constraints
    pub fn new(key: impl Into<String>, value_type: ValueType) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            value_type,
            operators: Vec::new(),
            value_sources: vec![ValueSource::Value],
            prefer_widgets: Vec::new(),
            constraints: FieldConstraints::default(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_operators<I, S>(mut self, operators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operators = operators.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_value_sources(mut self, sources: Vec<ValueSource>) -> Self {
        self.value_sources = sources;
        self
    }

    pub fn with_widgets(mut self, widgets: Vec<WidgetKind>) -> Self {
        self.prefer_widgets = widgets;
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.constraints.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.constraints.max = Some(max);
        self
    }

    pub fn with_options(mut self, options: Vec<ListValue>) -> Self {
        self.constraints.list_values = options;
        self
    }

    pub fn allows_operator(&self, operator: &str) -> bool {
        self.operators.iter().any(|op| op == operator)
    }

    pub fn allows_source(&self, source: ValueSource) -> bool {
        self.value_sources.contains(&source)
    }

    /// First allowed operator, used for freshly added rules
    pub fn default_operator(&self) -> Option<&str> {
        self.operators.first().map(String::as_str)
    }

    /// Widget for a slot of `slot_type` under an operator taking `arity`
    /// values, honoring the field's preferences
    ///
    /// A listed range slider covers both slots of a two-value operator and is
    /// skipped for any other arity.
    pub fn widget_for(&self, slot_type: ValueType, arity: usize) -> WidgetKind {
        let range = WidgetKind::RangeSlider;
        if arity == 2 && range.accepts(slot_type) && self.prefer_widgets.contains(&range) {
            return range;
        }
        self.prefer_widgets
            .iter()
            .copied()
            .filter(|w| *w != range)
            .find(|w| w.accepts(slot_type))
            .unwrap_or_else(|| WidgetKind::default_for(slot_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_field_defaults() {
        let field = Field::new("qty", ValueType::Number);
        assert_eq!(field.label, "qty");
        assert!(field.allows_source(ValueSource::Value));
        assert!(!field.allows_source(ValueSource::Field));
        assert_eq!(field.widget_for(ValueType::Number, 1), WidgetKind::Number);
    }

    #[test]
    fn test_preferred_widget_wins_when_compatible() {
        let field = Field::new("price", ValueType::Number)
            .with_widgets(vec![WidgetKind::Slider, WidgetKind::RangeSlider]);
        assert_eq!(field.widget_for(ValueType::Number, 1), WidgetKind::Slider);

        let color = Field::new("color", ValueType::Select).with_widgets(vec![WidgetKind::Slider]);
        assert_eq!(color.widget_for(ValueType::MultiSelect, 1), WidgetKind::MultiSelect);
    }

    #[test]
    fn test_range_slider_only_for_two_values() {
        let price = Field::new("price", ValueType::Number)
            .with_widgets(vec![WidgetKind::Slider, WidgetKind::RangeSlider]);
        assert_eq!(price.widget_for(ValueType::Number, 2), WidgetKind::RangeSlider);
        assert_eq!(price.widget_for(ValueType::Number, 1), WidgetKind::Slider);

        let ranged = Field::new("qty", ValueType::Number).with_widgets(vec![WidgetKind::RangeSlider]);
        assert_eq!(ranged.widget_for(ValueType::Number, 1), WidgetKind::Number);

        let plain = Field::new("qty", ValueType::Number);
        assert_eq!(plain.widget_for(ValueType::Number, 2), WidgetKind::Number);
    }

    #[test]
    fn test_constraints_contains() {
        let constraints = FieldConstraints {
            min: Some(10.0),
            max: Some(100.0),
            ..Default::default()
        };
        assert!(constraints.contains(10.0));
        assert!(constraints.contains(100.0));
        assert!(!constraints.contains(5.0));
        assert!(!constraints.contains(100.5));
        assert!(FieldConstraints::default().contains(-1e9));
    }

    #[test]
    fn test_option_lookup() {
        let field = Field::new("color", ValueType::Select)
            .with_options(vec![ListValue::new("green", "Green")]);
        assert!(field.constraints.has_option("green"));
        assert_eq!(field.constraints.option_title("green"), Some("Green"));
        assert_eq!(field.constraints.option_title("blue"), None);
    }
}
