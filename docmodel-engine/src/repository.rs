//! The generic entity repository.
//!
//! One set of operations serves every registered model: each request names
//! its model, the repository resolves it through the registry and translates
//! the envelope into store calls.

use crate::error::{EngineError, EngineResult};
use crate::filter::format_filter;
use crate::model::Model;
use crate::params::{
    AddEntitiesResponse, AddEntityResponse, DeleteEntitiesResponse, DeleteEntityResponse,
    EntityParams, GetEntitiesResponse, GetEntityResponse, UpdateEntitiesResponse,
    UpdateEntityResponse, OK,
};
use crate::populate::present;
use crate::registry::ModelRegistry;
use docmodel_storage::{Document, Query};
use docmodel_types::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Repository operations, named as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    AddEntity,
    AddEntities,
    GetEntity,
    GetEntities,
    UpdateEntity,
    UpdateEntities,
    DeleteEntity,
    DeleteEntities,
}

impl Operation {
    pub const ALL: [Operation; 8] = [
        Self::AddEntity,
        Self::AddEntities,
        Self::GetEntity,
        Self::GetEntities,
        Self::UpdateEntity,
        Self::UpdateEntities,
        Self::DeleteEntity,
        Self::DeleteEntities,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AddEntity => "addEntity",
            Self::AddEntities => "addEntities",
            Self::GetEntity => "getEntity",
            Self::GetEntities => "getEntities",
            Self::UpdateEntity => "updateEntity",
            Self::UpdateEntities => "updateEntities",
            Self::DeleteEntity => "deleteEntity",
            Self::DeleteEntities => "deleteEntities",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| EngineError::UnknownOperation(s.to_string()))
    }
}

/// Model-agnostic CRUD over the registry. Cheap to clone and `Send + Sync`;
/// async callers drive it through `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct EntityRepository {
    registry: Arc<ModelRegistry>,
}

impl EntityRepository {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Runs `op` and returns its response as JSON.
    pub fn execute(&self, op: Operation, params: &EntityParams) -> EngineResult<Value> {
        let response = match op {
            Operation::AddEntity => serde_json::to_value(self.add_entity(params)?),
            Operation::AddEntities => serde_json::to_value(self.add_entities(params)?),
            Operation::GetEntity => serde_json::to_value(self.get_entity(params)?),
            Operation::GetEntities => serde_json::to_value(self.get_entities(params)?),
            Operation::UpdateEntity => serde_json::to_value(self.update_entity(params)?),
            Operation::UpdateEntities => serde_json::to_value(self.update_entities(params)?),
            Operation::DeleteEntity => serde_json::to_value(self.delete_entity(params)?),
            Operation::DeleteEntities => serde_json::to_value(self.delete_entities(params)?),
        };
        Ok(response?)
    }

    /// Resolves the model, runs `f` and logs a failure once.
    fn run<T>(
        &self,
        op: Operation,
        params: &EntityParams,
        f: impl FnOnce(&Model) -> EngineResult<T>,
    ) -> EngineResult<T> {
        let result = self
            .registry
            .lookup(&params.model)
            .and_then(|model| f(model.as_ref()));
        if let Err(e) = &result {
            if e.is_internal() {
                error!(op = %op, model = %params.model, error = %e, "Operation failed");
            } else {
                warn!(op = %op, model = %params.model, error = %e, "Rejected request");
            }
        }
        result
    }

    // ── Create ───────────────────────────────────────────────────

    /// Inserts one entity. `value` is the stored document projected to
    /// `retFields`, or `{}` when none are requested.
    pub fn add_entity(&self, params: &EntityParams) -> EngineResult<AddEntityResponse> {
        self.run(Operation::AddEntity, params, |model| {
            let entity = params
                .entity
                .as_ref()
                .ok_or_else(|| missing_payload(model, "entity"))?;
            let doc = model.prepare_insert(entity)?;
            model.insert(&doc)?;
            debug!(model = model.name(), id = %doc.id, "Added entity");

            let value = match params.ret_fields() {
                [] => Value::Object(Map::new()),
                fields => match model.get(&doc.id)? {
                    Some(stored) => present(&self.registry, model, &stored, fields)?,
                    None => Value::Object(Map::new()),
                },
            };
            Ok(AddEntityResponse {
                ok: OK,
                id: doc.id.to_string(),
                value,
            })
        })
    }

    /// Inserts every entity in one transaction; ids come back in input order.
    pub fn add_entities(&self, params: &EntityParams) -> EngineResult<AddEntitiesResponse> {
        self.run(Operation::AddEntities, params, |model| {
            let entities = params
                .entities
                .as_ref()
                .ok_or_else(|| missing_payload(model, "entities"))?;
            let docs = entities
                .iter()
                .map(|entity| model.prepare_insert(entity))
                .collect::<EngineResult<Vec<_>>>()?;
            model.insert_many(&docs)?;
            debug!(model = model.name(), count = docs.len(), "Added entities");
            Ok(AddEntitiesResponse {
                ok: OK,
                ids: docs.iter().map(|doc| doc.id.to_string()).collect(),
            })
        })
    }

    // ── Read ─────────────────────────────────────────────────────

    /// Fetches one entity by id. `sort` has no effect on a single fetch.
    pub fn get_entity(&self, params: &EntityParams) -> EngineResult<GetEntityResponse> {
        self.run(Operation::GetEntity, params, |model| {
            let id = require_id(model, params, Operation::GetEntity)?;
            let entity = model
                .get(&id)?
                .map(|doc| present(&self.registry, model, &doc, params.ret_fields()))
                .transpose()?;
            Ok(GetEntityResponse { ok: OK, entity })
        })
    }

    /// Fetches entities by `ids`, else by `filter`, else the whole
    /// collection.
    pub fn get_entities(&self, params: &EntityParams) -> EngineResult<GetEntitiesResponse> {
        self.run(Operation::GetEntities, params, |model| {
            let query = selector(model, params)?.unwrap_or_default();
            let sort = params.sort.as_ref().map(|s| s.keys()).unwrap_or_default();
            model.check_sort(sort)?;
            let entities = model
                .find(&query, sort)?
                .iter()
                .map(|doc| present(&self.registry, model, doc, params.ret_fields()))
                .collect::<EngineResult<Vec<_>>>()?;
            Ok(GetEntitiesResponse { ok: OK, entities })
        })
    }

    // ── Update ───────────────────────────────────────────────────

    /// Partially updates one entity and returns it, or `null` if the id is
    /// unknown.
    pub fn update_entity(&self, params: &EntityParams) -> EngineResult<UpdateEntityResponse> {
        self.run(Operation::UpdateEntity, params, |model| {
            let id = require_id(model, params, Operation::UpdateEntity)?;
            let update = model.parse_update(
                params
                    .value
                    .as_ref()
                    .ok_or_else(|| missing_payload(model, "value"))?,
            )?;

            let Some(mut doc) = model.get(&id)? else {
                return Ok(UpdateEntityResponse {
                    ok: OK,
                    value: None,
                });
            };
            if model.apply_update(&mut doc, &update) {
                model.replace(&doc)?;
                debug!(model = model.name(), id = %doc.id, "Updated entity");
            }
            Ok(UpdateEntityResponse {
                ok: OK,
                value: Some(present(&self.registry, model, &doc, &[])?),
            })
        })
    }

    /// Applies one update to every entity selected by `ids` or `filter`.
    /// Only documents whose content changed count as modified.
    pub fn update_entities(&self, params: &EntityParams) -> EngineResult<UpdateEntitiesResponse> {
        self.run(Operation::UpdateEntities, params, |model| {
            let query = selector(model, params)?.ok_or_else(|| EngineError::MissingSelector {
                model: model.name().to_string(),
                operation: Operation::UpdateEntities.as_str(),
            })?;
            let update = model.parse_update(
                params
                    .value
                    .as_ref()
                    .ok_or_else(|| missing_payload(model, "value"))?,
            )?;

            let matched = model.find(&query, &[])?;
            let matched_count = matched.len();
            let changed: Vec<Document> = matched
                .into_iter()
                .filter_map(|mut doc| model.apply_update(&mut doc, &update).then_some(doc))
                .collect();
            let modified_count = if changed.is_empty() {
                0
            } else {
                model.replace_many(&changed)?
            };
            debug!(model = model.name(), matched_count, modified_count, "Updated entities");
            Ok(UpdateEntitiesResponse {
                matched_count,
                modified_count,
                ok: OK,
            })
        })
    }

    // ── Delete ───────────────────────────────────────────────────

    /// Deletes one entity. Deleting an unknown id still succeeds.
    pub fn delete_entity(&self, params: &EntityParams) -> EngineResult<DeleteEntityResponse> {
        self.run(Operation::DeleteEntity, params, |model| {
            let id = require_id(model, params, Operation::DeleteEntity)?;
            let existed = model.delete(&id)?;
            debug!(model = model.name(), id = %id, existed, "Deleted entity");
            Ok(DeleteEntityResponse { ok: OK })
        })
    }

    /// Deletes every entity selected by `ids` or `filter`.
    pub fn delete_entities(&self, params: &EntityParams) -> EngineResult<DeleteEntitiesResponse> {
        self.run(Operation::DeleteEntities, params, |model| {
            let query = selector(model, params)?.ok_or_else(|| EngineError::MissingSelector {
                model: model.name().to_string(),
                operation: Operation::DeleteEntities.as_str(),
            })?;
            let deleted_count = model.delete_many(&query)?;
            debug!(model = model.name(), deleted_count, "Deleted entities");
            Ok(DeleteEntitiesResponse {
                deleted_count,
                ok: OK,
            })
        })
    }
}

fn missing_payload(model: &Model, field: &'static str) -> EngineError {
    EngineError::MissingPayload {
        model: model.name().to_string(),
        field,
    }
}

fn parse_id(model: &Model, raw: &str) -> EngineResult<EntityId> {
    EntityId::parse(raw).map_err(|_| EngineError::invalid_id(model.name(), raw))
}

fn require_id(model: &Model, params: &EntityParams, op: Operation) -> EngineResult<EntityId> {
    match params.id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => parse_id(model, raw),
        _ => Err(EngineError::MissingId {
            model: model.name().to_string(),
            operation: op.as_str(),
        }),
    }
}

/// Query selected by `ids` (preferred) or `filter`; `None` when neither is
/// given.
fn selector(model: &Model, params: &EntityParams) -> EngineResult<Option<Query>> {
    if let Some(raw_ids) = &params.ids {
        let ids = raw_ids
            .iter()
            .map(|raw| parse_id(model, raw))
            .collect::<EngineResult<Vec<_>>>()?;
        return Ok(Some(Query::ids(&ids)));
    }
    match &params.filter {
        Some(filter) => Ok(Some(model.cast_query(&format_filter(filter))?)),
        None => Ok(None),
    }
}
