//! Field type tokens.
//!
//! The part of a token before the first `.` selects the kind; the remainder
//! names the referenced model or submodel (`model.user`, `submodel.group`).

use crate::compile::StorageType;

/// Primitive tokens and the storage type each maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Text,
    Textarea,
    Number,
    Boolean,
    Date,
    Array,
}

impl PrimitiveType {
    /// The token as written in definitions.
    pub fn token(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Array => "array",
        }
    }

    /// Concrete storage type for this primitive.
    pub fn storage_type(self) -> StorageType {
        match self {
            Self::Text | Self::Textarea => StorageType::String,
            Self::Number => StorageType::Number,
            Self::Boolean => StorageType::Boolean,
            Self::Date => StorageType::Date,
            Self::Array => StorageType::Array,
        }
    }
}

/// What a type token resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedKind<'a> {
    Primitive(PrimitiveType),
    /// Reference to a top-level model (or an already promoted submodel).
    ModelRef(&'a str),
    /// Reference to a submodel declared in the same document.
    SubmodelRef(&'a str),
    Map,
    Password,
    Unknown,
}

/// Resolves a raw type token.
///
/// Reference kinds require a non-empty name after the dot; a bare `model` or
/// `submodel.` resolves to [`ResolvedKind::Unknown`]. Any suffix on the other
/// kinds is ignored.
pub fn resolve(token: &str) -> ResolvedKind<'_> {
    let (head, target) = match token.split_once('.') {
        Some((head, rest)) => (head, rest.trim()),
        None => (token, ""),
    };

    match head.trim() {
        "text" => ResolvedKind::Primitive(PrimitiveType::Text),
        "textarea" => ResolvedKind::Primitive(PrimitiveType::Textarea),
        "number" => ResolvedKind::Primitive(PrimitiveType::Number),
        "boolean" => ResolvedKind::Primitive(PrimitiveType::Boolean),
        "date" => ResolvedKind::Primitive(PrimitiveType::Date),
        "array" => ResolvedKind::Primitive(PrimitiveType::Array),
        "map" => ResolvedKind::Map,
        "password" => ResolvedKind::Password,
        "model" if !target.is_empty() => ResolvedKind::ModelRef(target),
        "submodel" if !target.is_empty() => ResolvedKind::SubmodelRef(target),
        _ => ResolvedKind::Unknown,
    }
}
