//! Storage-level query vocabulary and its SQL translation.

use crate::document::ID_FIELD;
use docmodel_types::EntityId;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;
use std::collections::BTreeMap;

/// Predicate on one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    /// Matches when the field equals any of the values.
    In(Vec<Value>),
}

/// A conjunction of field conditions; one condition per field.
///
/// An empty query matches every document in the collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    conditions: BTreeMap<String, Condition>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches documents whose id is in `ids`.
    pub fn ids<'a>(ids: impl IntoIterator<Item = &'a EntityId>) -> Self {
        Self::new().with(
            ID_FIELD,
            Condition::In(ids.into_iter().map(|id| Value::String(id.to_string())).collect()),
        )
    }

    /// Sets the condition for `field`, replacing any previous one.
    pub fn with(mut self, field: impl Into<String>, condition: Condition) -> Self {
        self.set(field, condition);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, condition: Condition) {
        self.conditions.insert(field.into(), condition);
    }

    pub fn condition(&self, field: &str) -> Option<&Condition> {
        self.conditions.get(field)
    }

    pub fn conditions(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Appends ` AND ...` clauses for every condition to `sql`.
    pub(crate) fn push_sql(&self, sql: &mut String, params: &mut Vec<SqlValue>) {
        for (field, condition) in &self.conditions {
            let column = field_expr(field, params);
            match condition {
                Condition::Eq(Value::Null) => {
                    sql.push_str(&format!(" AND {column} IS NULL"));
                }
                Condition::Eq(value) => push_compare(sql, params, &column, "=", value),
                Condition::Gt(value) => push_compare(sql, params, &column, ">", value),
                Condition::Gte(value) => push_compare(sql, params, &column, ">=", value),
                Condition::Lt(value) => push_compare(sql, params, &column, "<", value),
                Condition::Lte(value) => push_compare(sql, params, &column, "<=", value),
                Condition::In(values) if values.is_empty() => sql.push_str(" AND 0"),
                Condition::In(values) => {
                    let placeholders: Vec<&str> = values
                        .iter()
                        .map(|value| {
                            params.push(to_sql(value));
                            placeholder(value)
                        })
                        .collect();
                    sql.push_str(&format!(" AND {column} IN ({})", placeholders.join(", ")));
                }
            }
        }
    }
}

fn push_compare(sql: &mut String, params: &mut Vec<SqlValue>, column: &str, op: &str, value: &Value) {
    params.push(to_sql(value));
    sql.push_str(&format!(" AND {column} {op} {}", placeholder(value)));
}

/// Arrays and objects come back from `json_extract` as minified JSON text.
fn placeholder(value: &Value) -> &'static str {
    match value {
        Value::Array(_) | Value::Object(_) => "json(?)",
        _ => "?",
    }
}

/// SQL expression selecting `field`, pushing its JSON path as a parameter.
pub(crate) fn field_expr(field: &str, params: &mut Vec<SqlValue>) -> String {
    if field == ID_FIELD {
        return "id".to_string();
    }
    params.push(SqlValue::Text(json_path(field)));
    "json_extract(data, ?)".to_string()
}

/// `a.b` becomes `$."a"."b"`.
pub(crate) fn json_path(field: &str) -> String {
    let mut path = String::from("$");
    for segment in field.split('.') {
        path.push_str(".\"");
        path.push_str(&segment.replace('"', ""));
        path.push('"');
    }
    path
}

/// JSON booleans extract as 0/1; arrays and objects compare as JSON text.
pub(crate) fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    fn sql(self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// One sort key; earlier keys take precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Descending)
    }
}

/// ` ORDER BY ...` for `sort`, always ending with insertion order.
pub(crate) fn order_by(sort: &[SortKey], params: &mut Vec<SqlValue>) -> String {
    let mut terms: Vec<String> = sort
        .iter()
        .map(|key| format!("{} {}", field_expr(&key.field, params), key.direction.sql()))
        .collect();
    terms.push("seq ASC".to_string());
    format!(" ORDER BY {}", terms.join(", "))
}
