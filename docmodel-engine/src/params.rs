//! Request envelope and response bodies of the entity repository.
//!
//! Field names follow the wire format (`retFields`, `matchedCount`, ...).

use crate::filter::Filter;
use docmodel_storage::{SortDirection, SortKey};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Generic request envelope. Which fields are read depends on the operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityParams {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ret_fields: Option<Vec<String>>,
}

impl EntityParams {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_entity(mut self, entity: Value) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn with_entities(mut self, entities: Vec<Value>) -> Self {
        self.entities = Some(entities);
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_ret_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ret_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub(crate) fn ret_fields(&self) -> &[String] {
        self.ret_fields.as_deref().unwrap_or_default()
    }
}

/// Ordered `{ field: direction }` sort specification.
///
/// Directions accept `asc`, `desc`, `ascending`, `descending`, `1` and `-1`.
/// Key order is significant and preserved from the request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort(Vec<SortKey>);

impl Sort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.0.push(SortKey::asc(field));
        self
    }

    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.0.push(SortKey::desc(field));
        self
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }
}

fn parse_direction(value: &Value) -> Option<SortDirection> {
    match value {
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "1" => Some(SortDirection::Ascending),
            "desc" | "descending" | "-1" => Some(SortDirection::Descending),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(SortDirection::Ascending),
            Some(-1) => Some(SortDirection::Descending),
            _ => None,
        },
        _ => None,
    }
}

impl Serialize for Sort {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for key in &self.0 {
            let direction = match key.direction {
                SortDirection::Ascending => "asc",
                SortDirection::Descending => "desc",
            };
            map.serialize_entry(&key.field, direction)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Sort {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SortVisitor;

        impl<'de> Visitor<'de> for SortVisitor {
            type Value = Sort;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to sort directions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Sort, A::Error> {
                let mut keys = Vec::new();
                while let Some((field, raw)) = access.next_entry::<String, Value>()? {
                    let direction = parse_direction(&raw).ok_or_else(|| {
                        de::Error::custom(format!("invalid sort direction {raw} for `{field}`"))
                    })?;
                    keys.push(SortKey::new(field, direction));
                }
                Ok(Sort(keys))
            }
        }

        deserializer.deserialize_map(SortVisitor)
    }
}

/// The constant `ok: 1` every response carries.
pub const OK: u8 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddEntityResponse {
    pub ok: u8,
    pub id: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddEntitiesResponse {
    pub ok: u8,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetEntityResponse {
    pub ok: u8,
    pub entity: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetEntitiesResponse {
    pub ok: u8,
    pub entities: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateEntityResponse {
    pub ok: u8,
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntitiesResponse {
    pub matched_count: usize,
    pub modified_count: usize,
    pub ok: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteEntityResponse {
    pub ok: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteEntitiesResponse {
    pub deleted_count: usize,
    pub ok: u8,
}
