//! Reference population on read.

use crate::error::EngineResult;
use crate::model::Model;
use crate::paths;
use crate::project::Projection;
use crate::registry::ModelRegistry;
use docmodel_storage::Document;
use docmodel_types::EntityId;
use serde_json::{Map, Value};

/// Renders a stored document for a response: password removed, references
/// populated, projection applied.
///
/// Projection runs last so `retFields` can reach into populated documents
/// (`"team.city"`). References the projection drops are not fetched.
pub(crate) fn present(
    registry: &ModelRegistry,
    model: &Model,
    doc: &Document,
    ret_fields: &[String],
) -> EngineResult<Value> {
    let projection = Projection::parse(ret_fields);
    let mut populator = Populator {
        registry,
        chain: vec![(model.name().to_string(), doc.id)],
    };
    let body = populator.populate(
        model,
        model.sanitize(doc),
        registry.populate_depth(),
        &|path: &str| projection.wants(path),
    )?;
    Ok(Value::Object(projection.apply(body)))
}

struct Populator<'r> {
    registry: &'r ModelRegistry,
    /// Documents being populated, outermost first.
    chain: Vec<(String, EntityId)>,
}

impl Populator<'_> {
    /// Replaces reference ids in `body` with the referenced documents, up to
    /// `depth` hops. Deeper references, and references to a document already
    /// on the chain, stay bare ids. A missing document becomes `null`.
    fn populate(
        &mut self,
        model: &Model,
        mut body: Map<String, Value>,
        depth: usize,
        wanted: &dyn Fn(&str) -> bool,
    ) -> EngineResult<Map<String, Value>> {
        if depth == 0 {
            return Ok(body);
        }
        for (path, target) in model.schema().references() {
            if !wanted(path) {
                continue;
            }
            let Some(Value::String(raw)) = paths::get(&body, path) else {
                continue;
            };
            let Ok(id) = EntityId::parse(raw) else {
                continue;
            };
            if self
                .chain
                .iter()
                .any(|(name, seen)| name == target && *seen == id)
            {
                continue;
            }

            let target_model = self.registry.lookup(target)?;
            let populated = match target_model.get(&id)? {
                Some(found) => {
                    self.chain.push((target.to_string(), id));
                    let nested = self.populate(
                        &target_model,
                        target_model.sanitize(&found),
                        depth - 1,
                        &|_: &str| true,
                    );
                    self.chain.pop();
                    Value::Object(nested?)
                }
                None => Value::Null,
            };
            paths::set(&mut body, path, populated);
        }
        Ok(body)
    }
}
