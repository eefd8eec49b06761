//! Library half of the `docmodel` binary: config loading, the `check`
//! report and one-shot request execution.

use anyhow::{Context, Result};
use docmodel_engine::{EngineConfig, EntityParams, EntityRepository, ModelRegistry, Operation};
use docmodel_model::{compile_all, load_dir, CompiledSchema, StorageType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub definitions: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub strict_password_fields: bool,
}

/// Loads `path` (or the defaults when absent) and applies `overrides`.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &overrides.definitions {
        config.definitions.dir = dir.clone();
    }
    if let Some(db) = &overrides.db {
        config.storage.path = Some(db.clone());
    }
    if overrides.strict_password_fields {
        config.compiler.strict_password_fields = true;
    }
    debug!(?config, "Effective config");
    Ok(config)
}

/// Output of `docmodel check`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CheckReport {
    pub models: Vec<ModelSummary>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelSummary {
    pub name: String,
    pub fields: BTreeMap<String, StorageType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_field: Option<String>,
    /// Reference path to target model.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub references: BTreeMap<String, String>,
}

impl From<&CompiledSchema> for ModelSummary {
    fn from(schema: &CompiledSchema) -> Self {
        Self {
            name: schema.name.clone(),
            fields: schema.storage_fields.clone(),
            password_field: schema.behaviors.password_field.clone(),
            references: schema
                .references()
                .into_iter()
                .map(|(path, target)| (path.to_string(), target.to_string()))
                .collect(),
        }
    }
}

/// Compiles the configured definition directory without touching storage.
pub fn check(config: &EngineConfig) -> Result<CheckReport> {
    let dir = &config.definitions.dir;
    let definitions = load_dir(dir)
        .with_context(|| format!("Failed to read definitions from {}", dir.display()))?;
    let mut schemas = compile_all(&definitions, &config.compiler)
        .context("Model definitions do not compile")?;
    schemas.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(CheckReport {
        models: schemas.iter().map(ModelSummary::from).collect(),
    })
}

/// Builds the registry and a repository over it.
pub fn open_repository(config: &EngineConfig) -> Result<EntityRepository> {
    let registry = ModelRegistry::from_config(config).context("Failed to build model registry")?;
    Ok(EntityRepository::new(Arc::new(registry)))
}

/// Parses a request envelope. Sort keys keep the order they are written in.
pub fn parse_request(body: &str) -> Result<EntityParams> {
    serde_json::from_str(body).context("Malformed request envelope")
}

/// Runs `operation` (its wire name) with the envelope in `body`.
pub fn execute(repo: &EntityRepository, operation: &str, body: &str) -> Result<Value> {
    let op: Operation = operation.parse()?;
    let params = parse_request(body)?;
    let response = repo
        .execute(op, &params)
        .with_context(|| format!("{op} on `{}` failed", params.model))?;
    Ok(response)
}
