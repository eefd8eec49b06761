//! Error types for definition loading and schema compilation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Errors that abort a compilation pass.
///
/// Every variant names the model (or file) and the field involved so a
/// definition can be fixed without reading logs.
#[derive(Debug, Error)]
pub enum CompileError {
    /// A definition file is unreadable or malformed.
    #[error("cannot read model definition {}: {reason}", path.display())]
    DefinitionRead { path: PathBuf, reason: String },

    /// A field uses a type token outside the vocabulary.
    #[error("model `{model}`: field `{field}` has unknown type `{token}`")]
    UnknownType {
        model: String,
        field: String,
        token: String,
    },

    /// `submodel.<Name>` names a submodel that is not declared in scope.
    #[error("model `{model}`: field `{field}` references undeclared submodel `{submodel}`")]
    MissingSubmodel {
        model: String,
        field: String,
        submodel: String,
    },

    /// `model.<Name>` names a model that no definition produces.
    #[error("model `{model}`: field `{field}` references unknown model `{target}`")]
    DanglingReference {
        model: String,
        field: String,
        target: String,
    },

    /// A submodel transitively references itself.
    #[error("model `{model}`: submodel cycle {chain}")]
    CyclicSubmodel { model: String, chain: String },

    /// More than one password field, rejected in strict mode.
    #[error("model `{model}`: more than one password field ({})", fields.join(", "))]
    AmbiguousPasswordField { model: String, fields: Vec<String> },

    /// Two definitions (or a definition and a promoted submodel) share a name.
    #[error("model `{name}` is defined more than once")]
    DuplicateModel { name: String },
}

impl CompileError {
    pub(crate) fn read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DefinitionRead {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
