//! Model definitions and schema compilation for docmodel.
//!
//! Turns declarative model documents into storage schemas:
//! - [`ModelDefinition`]: one parsed definition document (fields + submodels)
//! - [`resolve`]: maps a field type token to a [`ResolvedKind`]
//! - [`expand`]: promotes nested submodels to independent named schemas
//! - [`compile`] / [`compile_all`]: build [`CompiledSchema`]s with their
//!   timestamp, password and reference-population behaviors
//!
//! Nothing here touches storage. The engine crate binds compiled schemas to a
//! document store.

mod compile;
mod definition;
mod error;
mod expand;
mod kind;

pub use compile::{
    check_references, compile, compile_all, compile_definition, Behaviors, CompileOptions,
    CompiledSchema, StorageType,
};
pub use definition::{
    load_dir, load_named, parse_definition, FieldDefinition, ModelDefinition, SubmodelDefinition,
};
pub use error::{CompileError, CompileResult};
pub use expand::{derived_name, expand, Expansion};
pub use kind::{resolve, PrimitiveType, ResolvedKind};
