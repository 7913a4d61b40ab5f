//! Built-in operator catalog
//!
//! Every operator declares how many operands it takes, which value types it
//! applies to, and how each exporter renders it. Exporters match on the
//! template enums below; an operator without a template for a format cannot
//! be exported to that format.

use crate::models::value::ValueType;

use ValueType::{Boolean, Date, MultiSelect, Number, Select, Text};

/// How a rule is rendered in the human-readable query string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTemplate {
    /// `field OP value`
    Infix(&'static str),
    /// `field OP a AND b`
    Range(&'static str),
    /// `field OP` with no operands
    Postfix(&'static str),
    /// `field OP (a, b, c)`
    List(&'static str),
}

/// Shape of the logic-expression object a rule maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicKind {
    /// `{"op": [{"var": field}, value]}`
    Compare(&'static str),
    /// `{"in": [value, {"var": field}]}`
    Substring,
    /// `{"<=": [a, {"var": field}, b]}`
    Range,
    /// `{"!!": {"var": field}}`
    Truthy,
    /// `{"!": {"var": field}}`
    Falsy,
    /// `{"op": [{"var": field}, null]}`
    NullCompare(&'static str),
    /// `{"in": [{"var": field}, [values]]}`
    AnyIn,
    /// `{"all": [{"var": field}, {"in": [{"var": ""}, [values]]}]}`
    AllIn,
}

/// Logic-expression mapping, optionally wrapped in `{"!": ...}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicMapping {
    pub kind: LogicKind,
    pub negate: bool,
}

/// How a rule is rendered in a SQL `WHERE` fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlTemplate {
    /// `column OP value`
    Compare(&'static str),
    /// `column OP 'prefix value suffix'`
    Pattern {
        op: &'static str,
        leading_wildcard: bool,
        trailing_wildcard: bool,
    },
    /// `column OP a AND b`
    Range(&'static str),
    /// `column OP`
    Postfix(&'static str),
    /// `column OP (a, b)`
    List(&'static str),
}

/// Definition of a single operator
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub key: &'static str,
    pub label: &'static str,
    /// Number of value slots a rule with this operator carries
    pub arity: usize,
    pub applies_to: &'static [ValueType],
    /// Slot type when it differs from the field's own type
    pub slot_type: Option<ValueType>,
    pub query: QueryTemplate,
    pub logic: Option<LogicMapping>,
    pub sql: Option<SqlTemplate>,
}

impl Operator {
    pub fn supports(&self, value_type: ValueType) -> bool {
        self.applies_to.contains(&value_type)
    }

    /// Type each value slot must hold for a field of `field_type`
    pub fn slot_type_for(&self, field_type: ValueType) -> ValueType {
        self.slot_type.unwrap_or(field_type)
    }
}

const fn logic(kind: LogicKind) -> Option<LogicMapping> {
    Some(LogicMapping {
        kind,
        negate: false,
    })
}

const fn not_logic(kind: LogicKind) -> Option<LogicMapping> {
    Some(LogicMapping { kind, negate: true })
}

const ALL_TYPES: &[ValueType] = &[Number, Text, Boolean, Select, MultiSelect, Date];
const SCALARS: &[ValueType] = &[Number, Text, Boolean, Date];
const ORDERED: &[ValueType] = &[Number, Date];

static OPERATORS: &[Operator] = &[
    Operator {
        key: "equal",
        label: "==",
        arity: 1,
        applies_to: SCALARS,
        slot_type: None,
        query: QueryTemplate::Infix("="),
        logic: logic(LogicKind::Compare("==")),
        sql: Some(SqlTemplate::Compare("=")),
    },
    Operator {
        key: "not_equal",
        label: "!=",
        arity: 1,
        applies_to: SCALARS,
        slot_type: None,
        query: QueryTemplate::Infix("!="),
        logic: logic(LogicKind::Compare("!=")),
        sql: Some(SqlTemplate::Compare("<>")),
    },
    Operator {
        key: "less",
        label: "<",
        arity: 1,
        applies_to: ORDERED,
        slot_type: None,
        query: QueryTemplate::Infix("<"),
        logic: logic(LogicKind::Compare("<")),
        sql: Some(SqlTemplate::Compare("<")),
    },
    Operator {
        key: "less_or_equal",
        label: "<=",
        arity: 1,
        applies_to: ORDERED,
        slot_type: None,
        query: QueryTemplate::Infix("<="),
        logic: logic(LogicKind::Compare("<=")),
        sql: Some(SqlTemplate::Compare("<=")),
    },
    Operator {
        key: "greater",
        label: ">",
        arity: 1,
        applies_to: ORDERED,
        slot_type: None,
        query: QueryTemplate::Infix(">"),
        logic: logic(LogicKind::Compare(">")),
        sql: Some(SqlTemplate::Compare(">")),
    },
    Operator {
        key: "greater_or_equal",
        label: ">=",
        arity: 1,
        applies_to: ORDERED,
        slot_type: None,
        query: QueryTemplate::Infix(">="),
        logic: logic(LogicKind::Compare(">=")),
        sql: Some(SqlTemplate::Compare(">=")),
    },
    Operator {
        key: "like",
        label: "Contains",
        arity: 1,
        applies_to: &[Text],
        slot_type: None,
        query: QueryTemplate::Infix("LIKE"),
        logic: logic(LogicKind::Substring),
        sql: Some(SqlTemplate::Pattern {
            op: "LIKE",
            leading_wildcard: true,
            trailing_wildcard: true,
        }),
    },
    Operator {
        key: "not_like",
        label: "Not contains",
        arity: 1,
        applies_to: &[Text],
        slot_type: None,
        query: QueryTemplate::Infix("NOT LIKE"),
        logic: not_logic(LogicKind::Substring),
        sql: Some(SqlTemplate::Pattern {
            op: "NOT LIKE",
            leading_wildcard: true,
            trailing_wildcard: true,
        }),
    },
    Operator {
        key: "starts_with",
        label: "Starts with",
        arity: 1,
        applies_to: &[Text],
        slot_type: None,
        query: QueryTemplate::Infix("STARTS WITH"),
        logic: None,
        sql: Some(SqlTemplate::Pattern {
            op: "LIKE",
            leading_wildcard: false,
            trailing_wildcard: true,
        }),
    },
    Operator {
        key: "ends_with",
        label: "Ends with",
        arity: 1,
        applies_to: &[Text],
        slot_type: None,
        query: QueryTemplate::Infix("ENDS WITH"),
        logic: None,
        sql: Some(SqlTemplate::Pattern {
            op: "LIKE",
            leading_wildcard: true,
            trailing_wildcard: false,
        }),
    },
    Operator {
        key: "between",
        label: "Between",
        arity: 2,
        applies_to: ORDERED,
        slot_type: None,
        query: QueryTemplate::Range("BETWEEN"),
        logic: logic(LogicKind::Range),
        sql: Some(SqlTemplate::Range("BETWEEN")),
    },
    Operator {
        key: "not_between",
        label: "Not between",
        arity: 2,
        applies_to: ORDERED,
        slot_type: None,
        query: QueryTemplate::Range("NOT BETWEEN"),
        logic: not_logic(LogicKind::Range),
        sql: Some(SqlTemplate::Range("NOT BETWEEN")),
    },
    Operator {
        key: "select_equals",
        label: "==",
        arity: 1,
        applies_to: &[Select],
        slot_type: None,
        query: QueryTemplate::Infix("="),
        logic: logic(LogicKind::Compare("==")),
        sql: Some(SqlTemplate::Compare("=")),
    },
    Operator {
        key: "select_not_equals",
        label: "!=",
        arity: 1,
        applies_to: &[Select],
        slot_type: None,
        query: QueryTemplate::Infix("!="),
        logic: logic(LogicKind::Compare("!=")),
        sql: Some(SqlTemplate::Compare("<>")),
    },
    Operator {
        key: "select_any_in",
        label: "Any in",
        arity: 1,
        applies_to: &[Select],
        slot_type: Some(MultiSelect),
        query: QueryTemplate::List("IN"),
        logic: logic(LogicKind::AnyIn),
        sql: Some(SqlTemplate::List("IN")),
    },
    Operator {
        key: "select_not_any_in",
        label: "Not in",
        arity: 1,
        applies_to: &[Select],
        slot_type: Some(MultiSelect),
        query: QueryTemplate::List("NOT IN"),
        logic: not_logic(LogicKind::AnyIn),
        sql: Some(SqlTemplate::List("NOT IN")),
    },
    Operator {
        key: "multiselect_contains",
        label: "Contains",
        arity: 1,
        applies_to: &[MultiSelect],
        slot_type: None,
        query: QueryTemplate::List("CONTAINS"),
        logic: logic(LogicKind::AllIn),
        sql: None,
    },
    Operator {
        key: "multiselect_not_contains",
        label: "Not contains",
        arity: 1,
        applies_to: &[MultiSelect],
        slot_type: None,
        query: QueryTemplate::List("NOT CONTAINS"),
        logic: not_logic(LogicKind::AllIn),
        sql: None,
    },
    Operator {
        key: "multiselect_equals",
        label: "Equals",
        arity: 1,
        applies_to: &[MultiSelect],
        slot_type: None,
        query: QueryTemplate::List("="),
        logic: logic(LogicKind::Compare("==")),
        sql: None,
    },
    Operator {
        key: "multiselect_not_equals",
        label: "Not equals",
        arity: 1,
        applies_to: &[MultiSelect],
        slot_type: None,
        query: QueryTemplate::List("!="),
        logic: logic(LogicKind::Compare("!=")),
        sql: None,
    },
    Operator {
        key: "is_empty",
        label: "Is empty",
        arity: 0,
        applies_to: &[Text, Select, MultiSelect],
        slot_type: None,
        query: QueryTemplate::Postfix("IS EMPTY"),
        logic: logic(LogicKind::Falsy),
        sql: Some(SqlTemplate::Postfix("= ''")),
    },
    Operator {
        key: "is_not_empty",
        label: "Is not empty",
        arity: 0,
        applies_to: &[Text, Select, MultiSelect],
        slot_type: None,
        query: QueryTemplate::Postfix("IS NOT EMPTY"),
        logic: logic(LogicKind::Truthy),
        sql: Some(SqlTemplate::Postfix("<> ''")),
    },
    Operator {
        key: "is_null",
        label: "Is null",
        arity: 0,
        applies_to: ALL_TYPES,
        slot_type: None,
        query: QueryTemplate::Postfix("IS NULL"),
        logic: logic(LogicKind::NullCompare("==")),
        sql: Some(SqlTemplate::Postfix("IS NULL")),
    },
    Operator {
        key: "is_not_null",
        label: "Is not null",
        arity: 0,
        applies_to: ALL_TYPES,
        slot_type: None,
        query: QueryTemplate::Postfix("IS NOT NULL"),
        logic: logic(LogicKind::NullCompare("!=")),
        sql: Some(SqlTemplate::Postfix("IS NOT NULL")),
    },
];

/// All built-in operators in catalog order
pub fn builtin_operators() -> &'static [Operator] {
    OPERATORS
}

/// Look up a built-in operator by key
pub fn find_operator(key: &str) -> Option<&'static Operator> {
    OPERATORS.iter().find(|op| op.key == key)
}

/// Default operator keys for a value type, in catalog order
pub fn default_operators_for(value_type: ValueType) -> Vec<&'static str> {
    OPERATORS
        .iter()
        .filter(|op| op.supports(value_type))
        .map(|op| op.key)
        .collect()
}
