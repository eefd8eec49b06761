//! A compiled schema bound to the document store.
//!
//! The model owns the write-path behaviors of its schema: strict casting,
//! password hashing and timestamps. Reads go through [`Model::sanitize`] so
//! the stored password hash never leaves the engine.

use crate::cast::{cast_fields, cast_value};
use crate::error::{EngineError, EngineResult};
use crate::paths;
use docmodel_crypto::PasswordHasher;
use docmodel_model::{CompiledSchema, StorageType};
use docmodel_storage::{
    Condition, Document, DocumentStore, Query, SortKey, StorageError, ID_FIELD,
};
use docmodel_types::{EntityId, Timestamp};
use serde_json::{Map, Value};
use tracing::debug;

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

static TIMESTAMP_TYPE: StorageType = StorageType::Date;

/// A registered model. Its collection in the store carries the model name.
#[derive(Debug)]
pub struct Model {
    schema: CompiledSchema,
    store: DocumentStore,
    hasher: PasswordHasher,
}

/// A parsed partial update: paths to set and paths to remove.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Update {
    sets: Vec<(String, Value)>,
    unsets: Vec<String>,
}

impl Update {
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty() && self.unsets.is_empty()
    }
}

impl Model {
    pub(crate) fn new(schema: CompiledSchema, store: DocumentStore, hasher: PasswordHasher) -> Self {
        Self {
            schema,
            store,
            hasher,
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    fn field_type(&self, path: &str) -> Option<&StorageType> {
        match path {
            CREATED_AT | UPDATED_AT if self.schema.behaviors.auto_timestamp => {
                Some(&TIMESTAMP_TYPE)
            }
            _ => self.schema.field_type(path),
        }
    }

    // ── Write path ───────────────────────────────────────────────

    /// Builds the document stored for an insert payload.
    ///
    /// A valid `_id` in the payload is kept; otherwise a new id is assigned.
    pub fn prepare_insert(&self, payload: &Value) -> EngineResult<Document> {
        let Value::Object(input) = payload else {
            return Err(EngineError::invalid_value(self.name(), "entity", "expected a JSON object"));
        };

        let id = match input.get(ID_FIELD) {
            None | Some(Value::Null) => EntityId::new(),
            Some(Value::String(raw)) => {
                EntityId::parse(raw).map_err(|_| EngineError::invalid_id(self.name(), raw.as_str()))?
            }
            Some(other) => return Err(EngineError::invalid_id(self.name(), other.to_string())),
        };

        let mut body = cast_fields(self.name(), "", &self.schema.storage_fields, input)?;
        self.hash_password(&mut body)?;
        if self.schema.behaviors.auto_timestamp {
            let now = Value::String(Timestamp::now().to_rfc3339());
            body.insert(CREATED_AT.to_string(), now.clone());
            body.insert(UPDATED_AT.to_string(), now);
        }
        Ok(Document::new(id, body))
    }

    /// Replaces a non-empty string at the password path with its hash.
    fn hash_password(&self, body: &mut Map<String, Value>) -> EngineResult<()> {
        let Some(path) = self.schema.behaviors.password_field.as_deref() else {
            return Ok(());
        };
        let hashed = match paths::get(body, path) {
            Some(Value::String(plain)) if !plain.is_empty() => self.hasher.hash(plain)?,
            _ => return Ok(()),
        };
        paths::set(body, path, Value::String(hashed));
        debug!(model = self.name(), field = path, "Hashed password field");
        Ok(())
    }

    /// Parses an update payload: a plain `{ path: value }` map, `$set` and
    /// `$unset` operators, or a mix. Undeclared paths are dropped; values
    /// are cast and the password is hashed once here.
    pub fn parse_update(&self, value: &Value) -> EngineResult<Update> {
        let Value::Object(input) = value else {
            return Err(EngineError::invalid_value(self.name(), "value", "expected a JSON object"));
        };

        let mut raw_sets: Vec<(&String, &Value)> = Vec::new();
        let mut raw_unsets: Vec<&str> = Vec::new();
        for (key, v) in input {
            match key.as_str() {
                "$set" => match v {
                    Value::Object(fields) => raw_sets.extend(fields.iter()),
                    _ => return Err(EngineError::invalid_value(self.name(), "$set", "expected an object")),
                },
                "$unset" => match v {
                    Value::Object(fields) => raw_unsets.extend(fields.keys().map(String::as_str)),
                    Value::Array(items) => raw_unsets.extend(items.iter().filter_map(Value::as_str)),
                    _ => {
                        return Err(EngineError::invalid_value(
                            self.name(),
                            "$unset",
                            "expected an object or a list of paths",
                        ))
                    }
                },
                op if op.starts_with('$') => {
                    return Err(EngineError::invalid_value(self.name(), op, "unsupported update operator"));
                }
                _ => raw_sets.push((key, v)),
            }
        }

        let mut update = Update::default();
        for (path, v) in raw_sets {
            let Some(ty) = self.writable_type(path) else {
                continue;
            };
            let cast = cast_value(self.name(), path, ty, v.clone())?;

            // Hash through a scratch body so a password nested in a map
            // value is found at its full path.
            let mut scratch = Map::new();
            paths::set(&mut scratch, path, cast);
            self.hash_password(&mut scratch)?;
            let cast = paths::remove(&mut scratch, path).unwrap_or(Value::Null);
            update.sets.push((path.clone(), cast));
        }
        for path in raw_unsets {
            if self.writable_type(path).is_some() {
                update.unsets.push(path.to_string());
            }
        }
        Ok(update)
    }

    /// Storage type of a path an update may touch. Ids and timestamps are
    /// managed by the engine.
    fn writable_type(&self, path: &str) -> Option<&StorageType> {
        let ty = match path {
            ID_FIELD | CREATED_AT | UPDATED_AT => None,
            _ => self.schema.field_type(path),
        };
        if ty.is_none() {
            debug!(model = self.name(), field = path, "Ignoring update of undeclared path");
        }
        ty
    }

    /// Applies `update` to `doc`. Returns whether the document changed;
    /// `updatedAt` is refreshed only then.
    pub fn apply_update(&self, doc: &mut Document, update: &Update) -> bool {
        let before = doc.body.clone();
        for (path, value) in &update.sets {
            paths::set(&mut doc.body, path, value.clone());
        }
        for path in &update.unsets {
            paths::remove(&mut doc.body, path);
        }
        let changed = doc.body != before;
        if changed && self.schema.behaviors.auto_timestamp {
            doc.body.insert(
                UPDATED_AT.to_string(),
                Value::String(Timestamp::now().to_rfc3339()),
            );
        }
        changed
    }

    /// Casts filter values to the storage types of the fields they target,
    /// so `"36"` compares as a number and dates compare in canonical form.
    /// Ids are validated; fields the schema does not declare pass through.
    /// Conditions that would compare against the password hash are rejected.
    pub fn cast_query(&self, query: &Query) -> EngineResult<Query> {
        let mut out = Query::new();
        for (field, condition) in query.conditions() {
            self.guard_password(field, "filter")?;
            let cast = if field == ID_FIELD {
                map_condition(condition, |v| self.check_id(v))?
            } else {
                match self.field_type(field) {
                    Some(StorageType::Array | StorageType::Object { .. }) | None => condition.clone(),
                    Some(ty) => map_condition(condition, |v| cast_value(self.name(), field, ty, v))?,
                }
            };
            out.set(field, cast);
        }
        Ok(out)
    }

    /// Rejects sort keys that would order documents by the password hash.
    pub fn check_sort(&self, sort: &[SortKey]) -> EngineResult<()> {
        sort.iter()
            .try_for_each(|key| self.guard_password(&key.field, "sort"))
    }

    /// Fails when `path` is the password field, lies inside it, or is an
    /// object containing it.
    fn guard_password(&self, path: &str, usage: &str) -> EngineResult<()> {
        let Some(password) = self.schema.behaviors.password_field.as_deref() else {
            return Ok(());
        };
        // Quotes are dropped when the store builds its JSON path.
        let path = path.replace('"', "");
        let overlaps = |a: &str, b: &str| {
            a.strip_prefix(b)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
        };
        if overlaps(path.as_str(), password) || overlaps(password, path.as_str()) {
            return Err(EngineError::invalid_value(
                self.name(),
                path,
                format!("the password field cannot be used in a {usage}"),
            ));
        }
        Ok(())
    }

    fn check_id(&self, value: Value) -> EngineResult<Value> {
        match &value {
            Value::String(raw) if EntityId::parse(raw).is_ok() => Ok(value),
            Value::String(raw) => Err(EngineError::invalid_id(self.name(), raw.as_str())),
            other => Err(EngineError::invalid_id(self.name(), other.to_string())),
        }
    }

    // ── Read path ────────────────────────────────────────────────

    /// JSON form of `doc` with `_id` and without the password field.
    pub fn sanitize(&self, doc: &Document) -> Map<String, Value> {
        let mut body = doc.body.clone();
        if let Some(path) = self.schema.behaviors.password_field.as_deref() {
            paths::remove(&mut body, path);
        }
        body.insert(ID_FIELD.to_string(), Value::String(doc.id.to_string()));
        body
    }

    /// Checks `candidate` against the stored password hash of `doc`.
    ///
    /// `false` when the model has no password field or `doc` has no hash.
    pub fn verify_password(&self, doc: &Document, candidate: &str) -> EngineResult<bool> {
        let Some(path) = self.schema.behaviors.password_field.as_deref() else {
            return Ok(false);
        };
        match doc.get_path(path) {
            Some(Value::String(hash)) if !hash.is_empty() => {
                Ok(self.hasher.verify(candidate, &hash)?)
            }
            _ => Ok(false),
        }
    }

    // ── Store access ─────────────────────────────────────────────

    pub fn get(&self, id: &EntityId) -> EngineResult<Option<Document>> {
        Ok(self.store.get(self.name(), id)?)
    }

    pub fn find(&self, query: &Query, sort: &[SortKey]) -> EngineResult<Vec<Document>> {
        Ok(self.store.find(self.name(), query, sort)?)
    }

    /// Fails with `DuplicateId` when the document's id is taken.
    pub fn insert(&self, doc: &Document) -> EngineResult<()> {
        self.store
            .insert(self.name(), doc)
            .map_err(|e| self.insert_error(e))
    }

    /// All or nothing; a taken id fails the whole batch with `DuplicateId`.
    pub fn insert_many(&self, docs: &[Document]) -> EngineResult<()> {
        self.store
            .insert_many(self.name(), docs)
            .map_err(|e| self.insert_error(e))
    }

    fn insert_error(&self, err: StorageError) -> EngineError {
        match err {
            StorageError::Conflict { id, .. } => EngineError::DuplicateId {
                model: self.name().to_string(),
                id,
            },
            other => other.into(),
        }
    }

    pub fn replace(&self, doc: &Document) -> EngineResult<bool> {
        Ok(self.store.replace(self.name(), doc)?)
    }

    pub fn replace_many(&self, docs: &[Document]) -> EngineResult<usize> {
        Ok(self.store.replace_many(self.name(), docs)?)
    }

    pub fn delete(&self, id: &EntityId) -> EngineResult<bool> {
        Ok(self.store.delete(self.name(), id)?)
    }

    pub fn delete_many(&self, query: &Query) -> EngineResult<usize> {
        Ok(self.store.delete_many(self.name(), query)?)
    }
}

fn map_condition(
    condition: &Condition,
    mut f: impl FnMut(Value) -> EngineResult<Value>,
) -> EngineResult<Condition> {
    Ok(match condition {
        Condition::Eq(v) => Condition::Eq(f(v.clone())?),
        Condition::Gt(v) => Condition::Gt(f(v.clone())?),
        Condition::Gte(v) => Condition::Gte(f(v.clone())?),
        Condition::Lt(v) => Condition::Lt(f(v.clone())?),
        Condition::Lte(v) => Condition::Lte(f(v.clone())?),
        Condition::In(values) => Condition::In(
            values
                .iter()
                .cloned()
                .map(&mut f)
                .collect::<EngineResult<Vec<_>>>()?,
        ),
    })
}
