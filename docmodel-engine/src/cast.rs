//! Casting payload values to a schema's storage types.
//!
//! Writes are strict: keys the schema does not declare are dropped, and
//! values are coerced the way a document database would (`"34"` becomes `34`
//! for a number field). Anything that cannot be coerced is rejected with
//! `InvalidValue`.

use crate::error::{EngineError, EngineResult};
use docmodel_model::StorageType;
use docmodel_storage::ID_FIELD;
use docmodel_types::{EntityId, Timestamp};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Casts every declared field of `input`; undeclared keys are dropped.
pub(crate) fn cast_fields(
    model: &str,
    prefix: &str,
    fields: &BTreeMap<String, StorageType>,
    input: &Map<String, Value>,
) -> EngineResult<Map<String, Value>> {
    let mut out = Map::new();
    for (key, value) in input {
        let path = format!("{prefix}{key}");
        match fields.get(key) {
            Some(ty) => {
                out.insert(key.clone(), cast_value(model, &path, ty, value.clone())?);
            }
            None if key == ID_FIELD => {}
            None => debug!(model, field = %path, "Dropping undeclared field"),
        }
    }
    Ok(out)
}

/// Casts one value to `ty`. `null` is accepted for every type.
pub(crate) fn cast_value(
    model: &str,
    path: &str,
    ty: &StorageType,
    value: Value,
) -> EngineResult<Value> {
    if value.is_null() {
        return Ok(value);
    }
    let reject = |reason: &str| EngineError::invalid_value(model, path, reason);

    match ty {
        StorageType::String => match value {
            Value::String(_) => Ok(value),
            Value::Number(n) => Ok(Value::String(n.to_string())),
            Value::Bool(b) => Ok(Value::String(b.to_string())),
            _ => Err(reject("expected a string")),
        },
        StorageType::Number => match value {
            Value::Number(_) => Ok(value),
            Value::Bool(b) => Ok(Value::from(i64::from(b))),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    Ok(Value::Null)
                } else {
                    parse_number(s).ok_or_else(|| reject(&format!("`{s}` is not a number")))
                }
            }
            _ => Err(reject("expected a number")),
        },
        StorageType::Boolean => match &value {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Number(n) if n.as_f64() == Some(1.0) => Ok(Value::Bool(true)),
            Value::Number(n) if n.as_f64() == Some(0.0) => Ok(Value::Bool(false)),
            Value::String(s) => match s.as_str() {
                "true" | "1" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "no" => Ok(Value::Bool(false)),
                _ => Err(reject(&format!("`{s}` is not a boolean"))),
            },
            _ => Err(reject("expected a boolean")),
        },
        StorageType::Date => cast_date(&value)
            .ok_or_else(|| reject("expected an RFC 3339 date or epoch milliseconds")),
        StorageType::Array => match value {
            Value::Array(_) => Ok(value),
            scalar => Ok(Value::Array(vec![scalar])),
        },
        StorageType::ObjectRef { target } => {
            let raw = match &value {
                Value::String(s) => s.as_str(),
                Value::Object(doc) => doc
                    .get(ID_FIELD)
                    .and_then(Value::as_str)
                    .ok_or_else(|| reject(&format!("`{target}` reference object has no `_id`")))?,
                _ => return Err(reject(&format!("expected a `{target}` id"))),
            };
            let id = EntityId::parse(raw)
                .map_err(|_| reject(&format!("`{raw}` is not a `{target}` id")))?;
            Ok(Value::String(id.to_string()))
        }
        StorageType::Object { fields } => match &value {
            Value::Object(inner) => Ok(Value::Object(cast_fields(
                model,
                &format!("{path}."),
                fields,
                inner,
            )?)),
            _ => Err(reject("expected an object")),
        },
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    s.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// Dates are stored as RFC 3339 strings with millisecond precision so they
/// order correctly as text.
fn cast_date(value: &Value) -> Option<Value> {
    let ts = match value {
        Value::String(s) => Timestamp::parse(s).ok()?,
        Value::Number(n) => Timestamp::from_millis(n.as_i64()?)?,
        _ => return None,
    };
    Some(Value::String(ts.to_rfc3339()))
}
