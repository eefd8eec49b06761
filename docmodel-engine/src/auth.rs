//! Credential lookups against the `user` model.
//!
//! This is the boundary an authentication layer builds on: it finds users
//! and checks passwords, and leaves token issuing to the caller.

use crate::error::{EngineError, EngineResult};
use crate::model::Model;
use crate::populate::present;
use crate::registry::ModelRegistry;
use docmodel_storage::{Condition, Query};
use docmodel_types::EntityId;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Name of the model holding user accounts.
pub const USER_MODEL: &str = "user";

#[derive(Debug, Clone)]
pub struct UserAccounts {
    registry: Arc<ModelRegistry>,
    model: Arc<Model>,
}

impl UserAccounts {
    /// Fails with `ModelNotFound` when no `user` model is registered.
    pub fn from_registry(registry: Arc<ModelRegistry>) -> EngineResult<Self> {
        let model = registry.lookup(USER_MODEL)?;
        Ok(Self { registry, model })
    }

    fn parse_id(&self, id: &str) -> EngineResult<EntityId> {
        EntityId::parse(id).map_err(|_| EngineError::invalid_id(self.model.name(), id))
    }

    /// The user with `id`, sanitized and populated.
    pub fn find_by_id(&self, id: &str) -> EngineResult<Option<Value>> {
        let id = self.parse_id(id)?;
        self.model
            .get(&id)?
            .map(|doc| present(&self.registry, &self.model, &doc, &[]))
            .transpose()
    }

    /// Whether `candidate` matches the stored password of user `id`.
    /// Unknown users do not match.
    pub fn verify_password(&self, id: &str, candidate: &str) -> EngineResult<bool> {
        let id = self.parse_id(id)?;
        match self.model.get(&id)? {
            Some(doc) => self.model.verify_password(&doc, candidate),
            None => Ok(false),
        }
    }

    /// Finds the first user whose `login_field` equals `login_value` and
    /// returns it if `candidate` matches its password.
    pub fn authenticate(
        &self,
        login_field: &str,
        login_value: &str,
        candidate: &str,
    ) -> EngineResult<Option<Value>> {
        let query = self.model.cast_query(
            &Query::new().with(login_field, Condition::Eq(Value::String(login_value.to_string()))),
        )?;
        let Some(doc) = self.model.find(&query, &[])?.into_iter().next() else {
            debug!(field = login_field, "No user for login");
            return Ok(None);
        };
        if !self.model.verify_password(&doc, candidate)? {
            debug!(id = %doc.id, "Password mismatch");
            return Ok(None);
        }
        present(&self.registry, &self.model, &doc, &[]).map(Some)
    }
}
