//! Typed rule values
//!
//! A rule holds one [`ValueSlot`] per operand its operator needs. Each slot
//! carries an optional [`RuleValue`], the source tag of that value and the
//! per-slot error message shown next to the input widget.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};
use std::fmt;

/// Date format used in stored trees and exports
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Closed set of value types a field can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    Text,
    Boolean,
    Select,
    #[serde(rename = "multiselect")]
    MultiSelect,
    Date,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Number => "number",
            ValueType::Text => "text",
            ValueType::Boolean => "boolean",
            ValueType::Select => "select",
            ValueType::MultiSelect => "multiselect",
            ValueType::Date => "date",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "number" => Some(ValueType::Number),
            "text" => Some(ValueType::Text),
            "boolean" => Some(ValueType::Boolean),
            "select" => Some(ValueType::Select),
            "multiselect" => Some(ValueType::MultiSelect),
            "date" => Some(ValueType::Date),
            _ => None,
        }
    }

    /// Whether values of this type are picked from a fixed option list
    pub fn has_options(&self) -> bool {
        matches!(self, ValueType::Select | ValueType::MultiSelect)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a slot's value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// A literal typed by the user
    #[default]
    Value,
    /// A reference to another field of the same type
    Field,
}

impl ValueSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueSource::Value => "value",
            ValueSource::Field => "field",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "value" => Some(ValueSource::Value),
            "field" => Some(ValueSource::Field),
            _ => None,
        }
    }
}

/// A single typed operand
#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    /// Kept as a JSON number so integers survive export unchanged
    Number(Number),
    Text(String),
    Boolean(bool),
    Select(String),
    MultiSelect(Vec<String>),
    Date(NaiveDate),
    /// Reference to another field's key
    Field(String),
}

impl RuleValue {
    pub fn number(n: impl Into<Number>) -> Self {
        RuleValue::Number(n.into())
    }

    /// Build a number value from a float. Returns `None` for NaN and infinities.
    pub fn float(n: f64) -> Option<Self> {
        Number::from_f64(n).map(RuleValue::Number)
    }

    pub fn text(s: impl Into<String>) -> Self {
        RuleValue::Text(s.into())
    }

    pub fn select(s: impl Into<String>) -> Self {
        RuleValue::Select(s.into())
    }

    pub fn multi<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RuleValue::MultiSelect(items.into_iter().map(Into::into).collect())
    }

    pub fn field(key: impl Into<String>) -> Self {
        RuleValue::Field(key.into())
    }

    /// Value type of a literal. Field references have no intrinsic type.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            RuleValue::Number(_) => Some(ValueType::Number),
            RuleValue::Text(_) => Some(ValueType::Text),
            RuleValue::Boolean(_) => Some(ValueType::Boolean),
            RuleValue::Select(_) => Some(ValueType::Select),
            RuleValue::MultiSelect(_) => Some(ValueType::MultiSelect),
            RuleValue::Date(_) => Some(ValueType::Date),
            RuleValue::Field(_) => None,
        }
    }

    pub fn source(&self) -> ValueSource {
        match self {
            RuleValue::Field(_) => ValueSource::Field,
            _ => ValueSource::Value,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RuleValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// Human-readable name of the runtime type, used in error messages
    pub fn type_name(&self) -> &'static str {
        match self.value_type() {
            Some(vt) => vt.as_str(),
            None => "field",
        }
    }

    /// Reinterpret an untyped stored literal as `target`
    ///
    /// Trees saved without value types load select and date values as text;
    /// this recovers them once the field's type is known.
    pub fn coerce_to(&self, target: ValueType) -> Option<RuleValue> {
        match (self, target) {
            (RuleValue::Text(s), ValueType::Select) => Some(RuleValue::Select(s.clone())),
            (RuleValue::Text(s), ValueType::Date) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .ok()
                .map(RuleValue::Date),
            _ => None,
        }
    }

    /// JSON form used in stored trees. Field references store the field key.
    pub fn to_json(&self) -> Value {
        match self {
            RuleValue::Number(n) => Value::Number(n.clone()),
            RuleValue::Text(s) | RuleValue::Select(s) | RuleValue::Field(s) => json!(s),
            RuleValue::Boolean(b) => json!(b),
            RuleValue::MultiSelect(items) => json!(items),
            RuleValue::Date(d) => json!(d.format(DATE_FORMAT).to_string()),
        }
    }

    /// Decode a stored value
    ///
    /// `hint` is the slot's stored value type, if any. Without a hint the type
    /// is inferred from the JSON shape: numbers, strings, booleans and string
    /// arrays map to number, text, boolean and multiselect.
    pub fn from_json(
        value: &Value,
        hint: Option<ValueType>,
        source: ValueSource,
    ) -> Result<Self, String> {
        if source == ValueSource::Field {
            return value
                .as_str()
                .map(RuleValue::field)
                .ok_or_else(|| "field reference must be a string".to_string());
        }

        match (hint, value) {
            (Some(ValueType::Number) | None, Value::Number(n)) => Ok(RuleValue::Number(n.clone())),
            (Some(ValueType::Text) | None, Value::String(s)) => Ok(RuleValue::Text(s.clone())),
            (Some(ValueType::Boolean) | None, Value::Bool(b)) => Ok(RuleValue::Boolean(*b)),
            (Some(ValueType::Select), Value::String(s)) => Ok(RuleValue::Select(s.clone())),
            (Some(ValueType::MultiSelect) | None, Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| "multiselect items must be strings".to_string())
                })
                .collect::<Result<Vec<_>, _>>()
                .map(RuleValue::MultiSelect),
            (Some(ValueType::Date), Value::String(s)) => NaiveDate::parse_from_str(s, DATE_FORMAT)
                .map(RuleValue::Date)
                .map_err(|e| format!("invalid date '{}': {}", s, e)),
            (Some(expected), other) => Err(format!(
                "expected a {} value, found {}",
                expected,
                json_kind(other)
            )),
            (None, other) => Err(format!("unsupported value {}", json_kind(other))),
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One operand position of a rule
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValueSlot {
    pub value: Option<RuleValue>,
    pub source: ValueSource,
    /// Message shown next to the slot's widget, `None` when the slot is valid
    pub error: Option<String>,
}

impl ValueSlot {
    pub fn empty(source: ValueSource) -> Self {
        Self {
            value: None,
            source,
            error: None,
        }
    }

    pub fn filled(value: RuleValue) -> Self {
        Self {
            source: value.source(),
            value: Some(value),
            error: None,
        }
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }
}
