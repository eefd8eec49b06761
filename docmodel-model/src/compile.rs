//! Schema compilation.
//!
//! A [`CompiledSchema`] is the long-lived artifact of a definition: concrete
//! storage types per field plus the behaviors the bound model applies on
//! every read and write. Field maps are `BTreeMap`s so compiling the same
//! definition twice yields identical schemas.

use crate::definition::{FieldDefinition, ModelDefinition};
use crate::error::{CompileError, CompileResult};
use crate::expand::expand;
use crate::kind::{resolve, ResolvedKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Concrete storage type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageType {
    String,
    Number,
    Boolean,
    Date,
    Array,
    /// Id of a document in the `target` collection.
    ObjectRef { target: String },
    /// Nested object compiled from a `map` field.
    Object { fields: BTreeMap<String, StorageType> },
}

/// Cross-cutting behaviors attached to every compiled schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Behaviors {
    /// Stamp `createdAt`/`updatedAt` on writes. Always on.
    pub auto_timestamp: bool,
    /// Dotted path of the field hashed on write and hidden on read.
    pub password_field: Option<String>,
    /// Dotted paths of reference fields populated on read.
    pub auto_populate_refs: Vec<String>,
}

/// A model's storage schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledSchema {
    pub name: String,
    pub storage_fields: BTreeMap<String, StorageType>,
    pub behaviors: Behaviors,
}

impl CompiledSchema {
    /// Storage type at a dotted path, descending through `map` objects.
    pub fn field_type(&self, path: &str) -> Option<&StorageType> {
        let mut segments = path.split('.');
        let mut current = self.storage_fields.get(segments.next()?)?;
        for segment in segments {
            match current {
                StorageType::Object { fields } => current = fields.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// `(path, target)` for every reference field.
    pub fn references(&self) -> Vec<(&str, &str)> {
        self.behaviors
            .auto_populate_refs
            .iter()
            .filter_map(|path| match self.field_type(path) {
                Some(StorageType::ObjectRef { target }) => Some((path.as_str(), target.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Whether `path` is the password field.
    pub fn is_password_path(&self, path: &str) -> bool {
        self.behaviors
            .password_field
            .as_deref()
            .is_some_and(|pw| pw == path)
    }
}

/// Knobs for a compilation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// Reject models with more than one password field instead of letting
    /// the last one win.
    #[serde(default)]
    pub strict_password_fields: bool,
}

/// Compiles one flattened field list into a schema named `schema_name`.
///
/// Fields must already be expanded: a remaining `submodel.<Name>` has no
/// document to resolve against and fails with `MissingSubmodel`.
pub fn compile(
    schema_name: &str,
    fields: &[FieldDefinition],
    options: &CompileOptions,
) -> CompileResult<CompiledSchema> {
    let mut state = SchemaState {
        schema: schema_name,
        passwords: Vec::new(),
        references: Vec::new(),
    };
    let storage_fields = state.compile_fields("", fields)?;

    let password_field = match state.passwords.len() {
        0 | 1 => state.passwords.pop(),
        _ if options.strict_password_fields => {
            return Err(CompileError::AmbiguousPasswordField {
                model: schema_name.to_string(),
                fields: state.passwords,
            });
        }
        _ => {
            warn!(
                model = schema_name,
                fields = ?state.passwords,
                "Multiple password fields, the last one is used"
            );
            state.passwords.pop()
        }
    };

    Ok(CompiledSchema {
        name: schema_name.to_string(),
        storage_fields,
        behaviors: Behaviors {
            auto_timestamp: true,
            password_field,
            auto_populate_refs: state.references,
        },
    })
}

struct SchemaState<'s> {
    schema: &'s str,
    passwords: Vec<String>,
    references: Vec<String>,
}

impl SchemaState<'_> {
    fn compile_fields(
        &mut self,
        prefix: &str,
        fields: &[FieldDefinition],
    ) -> CompileResult<BTreeMap<String, StorageType>> {
        let mut out = BTreeMap::new();
        for field in fields {
            let path = format!("{prefix}{}", field.name);
            let storage = self.compile_field(&path, field)?;
            out.insert(field.name.clone(), storage);
        }
        Ok(out)
    }

    fn compile_field(&mut self, path: &str, field: &FieldDefinition) -> CompileResult<StorageType> {
        match resolve(&field.type_token) {
            ResolvedKind::Primitive(primitive) => Ok(primitive.storage_type()),
            ResolvedKind::ModelRef(target) => {
                self.references.push(path.to_string());
                Ok(StorageType::ObjectRef {
                    target: target.to_string(),
                })
            }
            ResolvedKind::Map => Ok(StorageType::Object {
                fields: self.compile_fields(&format!("{path}."), &field.children)?,
            }),
            ResolvedKind::Password => {
                self.passwords.push(path.to_string());
                Ok(StorageType::String)
            }
            ResolvedKind::SubmodelRef(submodel) => Err(CompileError::MissingSubmodel {
                model: self.schema.to_string(),
                field: path.to_string(),
                submodel: submodel.to_string(),
            }),
            ResolvedKind::Unknown => Err(CompileError::UnknownType {
                model: self.schema.to_string(),
                field: path.to_string(),
                token: field.type_token.clone(),
            }),
        }
    }
}

/// Expands and compiles one definition. References are not checked; see
/// [`check_references`].
pub fn compile_definition(
    def: &ModelDefinition,
    options: &CompileOptions,
) -> CompileResult<Vec<CompiledSchema>> {
    let expansion = expand(def)?;
    expansion
        .iter()
        .map(|(name, fields)| compile(name, fields, options))
        .collect()
}

/// Fails on the first reference whose target is not among `schemas`.
///
/// Runs after every document is expanded, since references may point forward
/// to submodels or to other documents.
pub fn check_references(schemas: &[CompiledSchema]) -> CompileResult<()> {
    let known: HashSet<&str> = schemas.iter().map(|s| s.name.as_str()).collect();
    for schema in schemas {
        for (path, target) in schema.references() {
            if !known.contains(target) {
                return Err(CompileError::DanglingReference {
                    model: schema.name.clone(),
                    field: path.to_string(),
                    target: target.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Compiles a whole set of definitions. All-or-nothing: any error discards
/// every schema compiled so far.
pub fn compile_all(
    defs: &[ModelDefinition],
    options: &CompileOptions,
) -> CompileResult<Vec<CompiledSchema>> {
    let mut schemas: Vec<CompiledSchema> = Vec::new();
    let mut names = HashSet::new();
    for def in defs {
        for schema in compile_definition(def, options)? {
            if !names.insert(schema.name.clone()) {
                return Err(CompileError::DuplicateModel { name: schema.name });
            }
            debug!(model = %schema.name, fields = schema.storage_fields.len(), "Compiled schema");
            schemas.push(schema);
        }
    }
    check_references(&schemas)?;
    Ok(schemas)
}
