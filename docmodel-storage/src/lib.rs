//! SQLite document store for docmodel.
//!
//! Every compiled schema owns one logical collection. Documents are stored as
//! JSON text next to their id, and queries are translated to `json_extract`
//! predicates, so the store needs no per-model DDL.
//!
//! # Architecture
//!
//! - [`DocumentStore`] wraps one SQLite connection behind a mutex
//! - [`Query`] is a conjunction of per-field [`Condition`]s
//! - [`SortKey`]s order results; insertion order breaks ties

mod document;
mod error;
mod query;
mod store;

pub use document::{Document, ID_FIELD};
pub use error::{StorageError, StorageResult};
pub use query::{Condition, Query, SortDirection, SortKey};
pub use store::DocumentStore;
