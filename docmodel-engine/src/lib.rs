//! Model registry and generic entity repository for docmodel.
//!
//! - [`ModelRegistry`] compiles every definition once and binds the schemas
//!   to a [`DocumentStore`](docmodel_storage::DocumentStore)
//! - [`EntityRepository`] serves add/get/update/delete for any registered
//!   model from one [`EntityParams`] envelope
//! - [`UserAccounts`] looks up users and checks passwords
//! - [`EngineConfig`] is the TOML configuration tying them together

mod auth;
mod cast;
mod config;
mod error;
mod filter;
mod model;
mod params;
mod paths;
mod populate;
mod project;
mod registry;
mod repository;

pub use auth::{UserAccounts, USER_MODEL};
pub use config::{DefinitionsConfig, EngineConfig, ReadConfig, StorageConfig};
pub use error::{EngineError, EngineResult};
pub use filter::{format_filter, Filter, FilterClause, Match};
pub use model::{Model, Update, CREATED_AT, UPDATED_AT};
pub use params::{
    AddEntitiesResponse, AddEntityResponse, DeleteEntitiesResponse, DeleteEntityResponse,
    EntityParams, GetEntitiesResponse, GetEntityResponse, Sort, UpdateEntitiesResponse,
    UpdateEntityResponse, OK,
};
pub use registry::{ModelRegistry, DEFAULT_POPULATE_DEPTH, MAX_POPULATE_DEPTH};
pub use repository::{EntityRepository, Operation};
