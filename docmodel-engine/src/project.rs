//! `retFields` projection.

use crate::paths;
use docmodel_storage::ID_FIELD;
use serde_json::{Map, Value};

/// A parsed `retFields` list.
///
/// Entries select dotted paths; entries starting with `-` exclude them.
/// Space-separated entries (`"name -age"`) are split. With no selecting
/// entry every path is kept. `_id` is always returned.
#[derive(Debug, Default)]
pub(crate) struct Projection<'a> {
    include: Vec<&'a str>,
    exclude: Vec<&'a str>,
}

impl<'a> Projection<'a> {
    pub(crate) fn parse(ret_fields: &'a [String]) -> Self {
        let mut projection = Self::default();
        for token in ret_fields.iter().flat_map(|entry| entry.split_whitespace()) {
            match token.strip_prefix('-') {
                Some(path) if !path.is_empty() => projection.exclude.push(path),
                Some(_) => {}
                None => projection.include.push(token),
            }
        }
        projection
    }

    /// Whether anything at or below `path` can survive [`apply`](Self::apply).
    pub(crate) fn wants(&self, path: &str) -> bool {
        if self.exclude.iter().any(|ex| is_within(path, ex)) {
            return false;
        }
        self.include.is_empty()
            || self
                .include
                .iter()
                .any(|inc| is_within(path, inc) || is_within(inc, path))
    }

    pub(crate) fn apply(&self, doc: Map<String, Value>) -> Map<String, Value> {
        let mut out = if self.include.is_empty() {
            doc
        } else {
            let mut selected = Map::new();
            if let Some(id) = doc.get(ID_FIELD) {
                selected.insert(ID_FIELD.to_string(), id.clone());
            }
            for path in &self.include {
                if let Some(value) = paths::get(&doc, path) {
                    paths::set(&mut selected, path, value.clone());
                }
            }
            selected
        };

        for path in &self.exclude {
            if *path != ID_FIELD {
                paths::remove(&mut out, path);
            }
        }
        out
    }
}

/// `path` equals `ancestor` or lies below it.
fn is_within(path: &str, ancestor: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

#[cfg(test)]
pub(crate) fn project(doc: Map<String, Value>, ret_fields: &[String]) -> Map<String, Value> {
    Projection::parse(ret_fields).apply(doc)
}
