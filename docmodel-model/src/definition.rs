//! Model definition documents and the directory loader.
//!
//! One JSON document describes one top-level model:
//!
//! ```json
//! { "name": "word",
//!   "fields": [ { "name": "text", "type": "text" },
//!               { "name": "group", "type": "submodel.group" } ],
//!   "submodels": [ { "name": "group", "fields": [ { "name": "title", "type": "text" } ] } ] }
//! ```
//!
//! The documents are produced by an offline build step; this module only
//! reads them.

use crate::error::{CompileError, CompileResult};
use crate::kind::{resolve, ResolvedKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFINITION_EXTENSION: &str = "json";

/// A top-level model as declared in its definition document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submodels: Vec<SubmodelDefinition>,
}

/// One field of a model, submodel or map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    /// Raw type token (`text`, `map`, `model.user`, `submodel.group`, ...).
    #[serde(rename = "type")]
    pub type_token: String,
    /// Nested fields. Only meaningful for `map`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FieldDefinition>,
}

/// A field tree declared inside a document and promoted to its own model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmodelDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submodels: Vec<SubmodelDefinition>,
}

impl FieldDefinition {
    /// Shorthand used by callers building definitions in code.
    pub fn new(name: impl Into<String>, type_token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_token: type_token.into(),
            children: Vec::new(),
        }
    }

    /// A `map` field with the given children.
    pub fn map(name: impl Into<String>, children: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            type_token: "map".into(),
            children,
        }
    }
}

impl ModelDefinition {
    /// Checks the structural rules serde cannot express.
    ///
    /// Type tokens are not checked here; the compiler reports those with the
    /// model and field they belong to.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("model name is empty".into());
        }
        validate_fields(&self.name, &self.fields)?;
        validate_submodels(&self.name, &self.submodels)
    }
}

fn validate_submodels(owner: &str, submodels: &[SubmodelDefinition]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for sub in submodels {
        if sub.name.trim().is_empty() {
            return Err(format!("`{owner}` declares a submodel without a name"));
        }
        if !seen.insert(sub.name.as_str()) {
            return Err(format!("`{owner}` declares submodel `{}` twice", sub.name));
        }
        validate_fields(&sub.name, &sub.fields)?;
        validate_submodels(&sub.name, &sub.submodels)?;
    }
    Ok(())
}

fn validate_fields(owner: &str, fields: &[FieldDefinition]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(format!("`{owner}` has a field without a name"));
        }
        if !seen.insert(field.name.as_str()) {
            return Err(format!("`{owner}` declares field `{}` twice", field.name));
        }
        if resolve(&field.type_token) == ResolvedKind::Map {
            if field.children.is_empty() {
                return Err(format!(
                    "`{owner}`: map field `{}` has no children",
                    field.name
                ));
            }
            validate_fields(&format!("{owner}.{}", field.name), &field.children)?;
        }
    }
    Ok(())
}

/// Parses one definition document held in memory.
pub fn parse_definition(json: &str) -> CompileResult<ModelDefinition> {
    parse_at(json, Path::new("<memory>"))
}

fn parse_at(json: &str, path: &Path) -> CompileResult<ModelDefinition> {
    let def: ModelDefinition =
        serde_json::from_str(json).map_err(|e| CompileError::read(path, e))?;
    def.validate().map_err(|reason| CompileError::read(path, reason))?;
    Ok(def)
}

fn read_file(path: &Path) -> CompileResult<ModelDefinition> {
    let json = fs::read_to_string(path).map_err(|e| CompileError::read(path, e))?;
    parse_at(&json, path)
}

/// Loads every `*.json` definition in `dir`, ordered by file name.
pub fn load_dir(dir: &Path) -> CompileResult<Vec<ModelDefinition>> {
    let entries = fs::read_dir(dir).map_err(|e| CompileError::read(dir, e))?;

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| CompileError::read(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == DEFINITION_EXTENSION) {
            paths.push(path);
        } else {
            debug!(path = %path.display(), "Skipping non-definition entry");
        }
    }
    paths.sort();

    paths.iter().map(|path| read_file(path)).collect()
}

/// Loads the definition named `name` from `dir`; `.json` is appended when
/// the name has no extension.
pub fn load_named(dir: &Path, name: &str) -> CompileResult<ModelDefinition> {
    let file = if name.ends_with(".json") {
        name.to_string()
    } else {
        format!("{name}.{DEFINITION_EXTENSION}")
    };
    read_file(&dir.join(file))
}
