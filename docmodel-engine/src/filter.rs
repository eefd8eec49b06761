//! Request filters and their translation to storage queries.

use docmodel_storage::{Condition, Query};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Comparison applied by a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Match {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// One `{ field, match, value }` clause.
///
/// `value` distinguishes absent (`None`, the clause is ignored) from an
/// explicit `null` (`Some(Value::Null)`, matches missing or null fields).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    pub field: String,
    #[serde(rename = "match")]
    pub matcher: Match,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

fn present_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl FilterClause {
    pub fn new(field: impl Into<String>, matcher: Match, value: Value) -> Self {
        Self {
            field: field.into(),
            matcher,
            value: Some(value),
        }
    }

    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::new(field, Match::Eq, value)
    }
}

/// A single clause or a list of clauses combined with AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Single(FilterClause),
    All(Vec<FilterClause>),
}

impl From<FilterClause> for Filter {
    fn from(clause: FilterClause) -> Self {
        Self::Single(clause)
    }
}

impl From<Vec<FilterClause>> for Filter {
    fn from(clauses: Vec<FilterClause>) -> Self {
        Self::All(clauses)
    }
}

/// Translates a filter into a storage query.
///
/// Clauses are merged left to right and a later clause on the same field
/// replaces the earlier one, so `[{age GTE 30}, {age LT 40}]` keeps only
/// `age < 40`. A clause without a value contributes nothing.
pub fn format_filter(filter: &Filter) -> Query {
    let mut query = Query::new();
    let clauses = match filter {
        Filter::Single(clause) => std::slice::from_ref(clause),
        Filter::All(clauses) => clauses.as_slice(),
    };
    for clause in clauses {
        let Some(value) = clause.value.clone() else {
            continue;
        };
        let condition = match clause.matcher {
            Match::Eq => Condition::Eq(value),
            Match::Gt => Condition::Gt(value),
            Match::Gte => Condition::Gte(value),
            Match::Lt => Condition::Lt(value),
            Match::Lte => Condition::Lte(value),
        };
        query.set(clause.field.clone(), condition);
    }
    query
}
