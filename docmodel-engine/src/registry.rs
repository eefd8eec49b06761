//! The model registry.
//!
//! Built once at startup from every definition and read-only afterwards.
//! Construction is all-or-nothing: models are bound to the store only after
//! the whole definition set compiled and every reference resolved.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::model::Model;
use docmodel_crypto::PasswordHasher;
use docmodel_model::{compile_all, load_dir, CompileOptions, CompiledSchema, ModelDefinition};
use docmodel_storage::DocumentStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Reference hops populated on read unless configured otherwise.
pub const DEFAULT_POPULATE_DEPTH: usize = 2;

/// Upper bound on the configurable population depth.
pub const MAX_POPULATE_DEPTH: usize = 8;

#[derive(Debug)]
pub struct ModelRegistry {
    models: BTreeMap<String, Arc<Model>>,
    populate_depth: usize,
}

impl ModelRegistry {
    /// Compiles `definitions` and binds every resulting schema to `store`.
    pub fn build(
        definitions: &[ModelDefinition],
        store: DocumentStore,
        hasher: PasswordHasher,
        options: &CompileOptions,
    ) -> EngineResult<Self> {
        let schemas = compile_all(definitions, options)?;

        let mut models = BTreeMap::new();
        for schema in schemas {
            info!(model = %schema.name, "Registered model");
            let model = Model::new(schema, store.clone(), hasher.clone());
            models.insert(model.name().to_string(), Arc::new(model));
        }
        info!(
            definitions = definitions.len(),
            models = models.len(),
            "Model registry ready"
        );
        Ok(Self {
            models,
            populate_depth: DEFAULT_POPULATE_DEPTH,
        })
    }

    /// Sets how many reference hops a read populates, capped at
    /// [`MAX_POPULATE_DEPTH`]. `0` returns references as bare ids.
    pub fn with_populate_depth(mut self, depth: usize) -> Self {
        if depth > MAX_POPULATE_DEPTH {
            warn!(depth, max = MAX_POPULATE_DEPTH, "Population depth capped");
        }
        self.populate_depth = depth.min(MAX_POPULATE_DEPTH);
        self
    }

    pub fn populate_depth(&self) -> usize {
        self.populate_depth
    }

    /// Loads definitions from the configured directory and opens the
    /// configured store.
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let definitions = load_dir(&config.definitions.dir)?;
        let store = match &config.storage.path {
            Some(path) => DocumentStore::open(path)?,
            None => DocumentStore::open_in_memory()?,
        };
        let hasher = PasswordHasher::new(&config.password)?;
        Ok(Self::build(&definitions, store, hasher, &config.compiler)?
            .with_populate_depth(config.read.populate_depth))
    }

    pub fn lookup(&self, name: &str) -> EngineResult<Arc<Model>> {
        self.get(name)
            .cloned()
            .ok_or_else(|| EngineError::ModelNotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Model>> {
        self.models.get(name)
    }

    /// Registered model names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn schemas(&self) -> impl Iterator<Item = &CompiledSchema> {
        self.models.values().map(|model| model.schema())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
