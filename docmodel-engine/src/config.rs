//! Engine configuration, read from a TOML file.
//!
//! ```toml
//! [definitions]
//! dir = "models"
//!
//! [storage]
//! path = "docmodel.db"   # omit for an in-memory store
//!
//! [password]
//! memory_cost = 19456
//! time_cost = 2
//! parallelism = 1
//!
//! [compiler]
//! strict_password_fields = false
//!
//! [read]
//! populate_depth = 2     # reference hops populated per read
//! ```
//!
//! Every section is optional. Relative paths are resolved against the
//! directory holding the config file.

use crate::error::{EngineError, EngineResult};
use crate::registry::DEFAULT_POPULATE_DEPTH;
use docmodel_crypto::HashParams;
use docmodel_model::CompileOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub definitions: DefinitionsConfig,
    pub storage: StorageConfig,
    pub password: HashParams,
    pub compiler: CompileOptions,
    pub read: ReadConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefinitionsConfig {
    /// Directory holding one `*.json` definition per model.
    pub dir: PathBuf,
}

fn default_definitions_dir() -> PathBuf {
    PathBuf::from("models")
}

impl Default for DefinitionsConfig {
    fn default() -> Self {
        Self {
            dir: default_definitions_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file; `None` keeps documents in memory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// Reference hops populated on read; deeper references stay ids.
    pub populate_depth: usize,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            populate_depth: DEFAULT_POPULATE_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Parses a config held in memory. Paths are kept as written.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Loads the config file at `path`.
    pub fn load_from(path: &Path) -> EngineResult<Self> {
        let config_error = |reason: String| EngineError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let mut config = Self::from_toml_str(&contents).map_err(|e| config_error(e.to_string()))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        info!(path = %path.display(), "Loaded engine config");
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        if self.definitions.dir.is_relative() {
            self.definitions.dir = base.join(&self.definitions.dir);
        }
        if let Some(db) = self.storage.path.as_mut().filter(|p| p.is_relative()) {
            *db = base.join(&*db);
        }
    }
}
