//! SQL `WHERE` exporter
//!
//! Field keys are used as column names; registration already limits them to
//! identifier paths, and field references are only written out once the
//! schema knows them. String literals are single-quoted with `''` escaping.

use crate::export::{render_group, resolve_rule, ExportError, GroupRenderer};
use crate::models::{GroupNode, RuleNode, RuleValue, Schema, SqlTemplate, Tree, DATE_FORMAT};

fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn literal(value: &RuleValue) -> String {
    match value {
        RuleValue::Number(n) => n.to_string(),
        RuleValue::Boolean(true) => "TRUE".to_string(),
        RuleValue::Boolean(false) => "FALSE".to_string(),
        RuleValue::Text(s) | RuleValue::Select(s) => quote(s),
        RuleValue::Date(d) => quote(&d.format(DATE_FORMAT).to_string()),
        RuleValue::MultiSelect(items) => items
            .iter()
            .map(|item| quote(item))
            .collect::<Vec<_>>()
            .join(", "),
        RuleValue::Field(key) => key.clone(),
    }
}

/// `LIKE` operand with wildcards; `%`, `_` and `\` in the text are escaped
fn pattern(value: &RuleValue, leading: bool, trailing: bool) -> Option<String> {
    let lead = if leading { "%" } else { "" };
    let trail = if trailing { "%" } else { "" };
    match value {
        RuleValue::Text(s) => {
            let escaped = s
                .replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_");
            let clause = if escaped != *s { " ESCAPE '\\'" } else { "" };
            Some(format!("{}{}", quote(&format!("{}{}{}", lead, escaped, trail)), clause))
        }
        RuleValue::Field(key) => {
            let mut parts = Vec::with_capacity(3);
            if leading {
                parts.push("'%'".to_string());
            }
            parts.push(key.clone());
            if trailing {
                parts.push("'%'".to_string());
            }
            Some(parts.join(" || "))
        }
        _ => None,
    }
}

struct SqlRenderer<'a> {
    schema: &'a Schema,
}

impl GroupRenderer for SqlRenderer<'_> {
    type Output = String;
    type Error = ExportError;

    fn rule(&mut self, rule: &RuleNode) -> Result<Option<String>, ExportError> {
        let Some((field, operator)) = resolve_rule(self.schema, rule)? else {
            return Ok(None);
        };
        let unsupported = || ExportError::unsupported_operator(operator.key, &field.key, "sql");
        let template = operator.sql.ok_or_else(unsupported)?;

        let column = &field.key;
        let values: Vec<&RuleValue> = rule.values.iter().filter_map(|s| s.value.as_ref()).collect();

        let sql = match (template, values.as_slice()) {
            (SqlTemplate::Compare(op), [v]) => format!("{} {} {}", column, op, literal(v)),
            (
                SqlTemplate::Pattern {
                    op,
                    leading_wildcard,
                    trailing_wildcard,
                },
                [v],
            ) => {
                let operand = pattern(v, leading_wildcard, trailing_wildcard).ok_or_else(unsupported)?;
                format!("{} {} {}", column, op, operand)
            }
            (SqlTemplate::Range(op), [low, high]) => {
                format!("{} {} {} AND {}", column, op, literal(low), literal(high))
            }
            (SqlTemplate::Postfix(op), []) => format!("{} {}", column, op),
            (SqlTemplate::List(op), [v]) => format!("{} {} ({})", column, op, literal(v)),
            _ => return Err(unsupported()),
        };
        Ok(Some(sql))
    }

    fn group(&mut self, group: &GroupNode, children: Vec<String>) -> String {
        let separator = format!(" {} ", group.conjunction);
        negate_if(group, format!("({})", children.join(&separator)))
    }

    fn empty_group(&mut self, group: &GroupNode) -> Option<String> {
        Some(negate_if(group, "TRUE".to_string()))
    }
}

fn negate_if(group: &GroupNode, sql: String) -> String {
    if group.negated {
        format!("NOT {}", sql)
    } else {
        sql
    }
}

/// Render the tree as a SQL `WHERE` fragment; an empty tree or group is `TRUE`
///
/// # Errors
///
/// - `UnsupportedOperator`: multiselect operators have no SQL form
/// - `UnknownField` / `UnknownOperator`: a rule refers to something the
///   schema does not define
pub fn to_sql_where(tree: &Tree, schema: &Schema) -> Result<String, ExportError> {
    let mut renderer = SqlRenderer { schema };
    Ok(render_group(tree, tree.root(), &mut renderer)?.unwrap_or_else(|| "TRUE".to_string()))
}
