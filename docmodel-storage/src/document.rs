//! Stored documents.

use docmodel_types::EntityId;
use serde_json::{Map, Value};

/// Name of the id key in the JSON form of a document.
pub const ID_FIELD: &str = "_id";

/// A document: its id plus the JSON body stored for it.
///
/// The body never carries `_id`; the id lives in its own column.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: EntityId,
    pub body: Map<String, Value>,
}

impl Document {
    pub fn new(id: EntityId, mut body: Map<String, Value>) -> Self {
        body.remove(ID_FIELD);
        Self { id, body }
    }

    /// Value at a dotted path inside the body. `_id` resolves to the id.
    pub fn get_path(&self, path: &str) -> Option<Value> {
        if path == ID_FIELD {
            return Some(Value::String(self.id.to_string()));
        }
        let mut segments = path.split('.');
        let mut current = self.body.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }

    /// JSON form with `_id` set.
    pub fn to_json(&self) -> Value {
        let mut out = self.body.clone();
        out.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));
        Value::Object(out)
    }
}
