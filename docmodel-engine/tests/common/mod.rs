//! Shared fixtures for engine tests.

#![allow(dead_code)]

use docmodel_crypto::{HashParams, PasswordHasher};
use docmodel_engine::{EntityParams, EntityRepository, ModelRegistry};
use docmodel_model::{parse_definition, CompileOptions, ModelDefinition};
use docmodel_storage::DocumentStore;
use serde_json::Value;
use std::sync::Arc;

pub const PLAYER: &str = r#"{
  "name": "player",
  "fields": [
    { "name": "name", "type": "text" },
    { "name": "age", "type": "number" },
    { "name": "active", "type": "boolean" },
    { "name": "born", "type": "date" },
    { "name": "tags", "type": "array" },
    { "name": "team", "type": "model.team" },
    { "name": "stats", "type": "map", "children": [
      { "name": "points", "type": "number" },
      { "name": "best", "type": "date" }
    ] }
  ]
}"#;

pub const TEAM: &str = r#"{
  "name": "team",
  "fields": [
    { "name": "name", "type": "text" },
    { "name": "city", "type": "text" },
    { "name": "captain", "type": "model.player" }
  ]
}"#;

pub const USER: &str = r#"{
  "name": "user",
  "fields": [
    { "name": "account", "type": "text" },
    { "name": "password", "type": "password" },
    { "name": "profile", "type": "submodel.profile" }
  ],
  "submodels": [
    { "name": "profile", "fields": [
      { "name": "bio", "type": "textarea" },
      { "name": "friend", "type": "model.user" }
    ] }
  ]
}"#;

pub fn definitions() -> Vec<ModelDefinition> {
    [PLAYER, TEAM, USER]
        .iter()
        .map(|json| parse_definition(json).unwrap())
        .collect()
}

pub fn hasher() -> PasswordHasher {
    PasswordHasher::new(&HashParams::fast()).unwrap()
}

pub fn registry() -> Arc<ModelRegistry> {
    let store = DocumentStore::open_in_memory().unwrap();
    Arc::new(
        ModelRegistry::build(&definitions(), store, hasher(), &CompileOptions::default()).unwrap(),
    )
}

pub fn repo() -> EntityRepository {
    EntityRepository::new(registry())
}

/// A repository whose reads populate `depth` reference hops.
pub fn repo_with_depth(depth: usize) -> EntityRepository {
    let store = DocumentStore::open_in_memory().unwrap();
    let registry = ModelRegistry::build(&definitions(), store, hasher(), &CompileOptions::default())
        .unwrap()
        .with_populate_depth(depth);
    EntityRepository::new(Arc::new(registry))
}

/// Inserts `entity` into `model` and returns its id.
pub fn add(repo: &EntityRepository, model: &str, entity: Value) -> String {
    repo.add_entity(&EntityParams::new(model).with_entity(entity))
        .unwrap()
        .id
}

/// Fetches `id` from `model`, panicking if it is absent.
pub fn fetch(repo: &EntityRepository, model: &str, id: &str) -> Value {
    repo.get_entity(&EntityParams::new(model).with_id(id))
        .unwrap()
        .entity
        .unwrap()
}

/// Inserts the four-player roster used by the filter tests.
pub fn roster(repo: &EntityRepository) -> Vec<String> {
    [("Lebron", 34), ("Wade", 37), ("Bosh", 34), ("Luka", 19)]
        .into_iter()
        .map(|(name, age)| add(repo, "player", serde_json::json!({ "name": name, "age": age })))
        .collect()
}

pub fn names(entities: &[Value]) -> Vec<&str> {
    entities
        .iter()
        .map(|e| e["name"].as_str().unwrap())
        .collect()
}
