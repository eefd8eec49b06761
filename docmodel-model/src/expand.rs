//! Submodel promotion.
//!
//! Every `submodel.<Name>` field is resolved against the submodels in scope,
//! the submodel is emitted as its own schema named `{parent}_{Name}`, and the
//! field is rewritten to `model.{parent}_{Name}`. The walk is depth-first and
//! covers `map` children, so a submodel referenced from inside a map is
//! promoted the same way.

use crate::definition::{FieldDefinition, ModelDefinition, SubmodelDefinition};
use crate::error::{CompileError, CompileResult};
use crate::kind::{resolve, ResolvedKind};
use std::collections::{BTreeMap, HashMap};
use std::ptr;

/// Flattened schemas of one document, keyed by schema name.
pub type Expansion = BTreeMap<String, Vec<FieldDefinition>>;

/// Name given to submodel `submodel` when promoted out of schema `parent`.
pub fn derived_name(parent: &str, submodel: &str) -> String {
    format!("{parent}_{submodel}")
}

/// Expands one definition into its top-level schema plus every promoted
/// submodel.
pub fn expand(def: &ModelDefinition) -> CompileResult<Expansion> {
    let mut expander = Expander {
        document: &def.name,
        out: BTreeMap::new(),
        origins: HashMap::new(),
        in_progress: Vec::new(),
    };
    let mut scopes = vec![def.submodels.as_slice()];
    let fields = expander.rewrite_fields(&def.name, "", &def.fields, &mut scopes)?;
    expander.emit(def.name.clone(), fields)?;
    Ok(expander.out)
}

struct Expander<'a> {
    document: &'a str,
    out: Expansion,
    /// Declaration each promoted schema came from; two declarations landing
    /// on one derived name is a collision.
    origins: HashMap<String, &'a SubmodelDefinition>,
    /// Declarations currently being expanded, outermost first. Compared by
    /// address: an inner declaration may reuse an ancestor's name.
    in_progress: Vec<&'a SubmodelDefinition>,
}

impl<'a> Expander<'a> {
    fn emit(&mut self, name: String, fields: Vec<FieldDefinition>) -> CompileResult<()> {
        if self.out.contains_key(&name) {
            return Err(CompileError::DuplicateModel { name });
        }
        self.out.insert(name, fields);
        Ok(())
    }

    fn rewrite_fields(
        &mut self,
        schema: &str,
        prefix: &str,
        fields: &'a [FieldDefinition],
        scopes: &mut Vec<&'a [SubmodelDefinition]>,
    ) -> CompileResult<Vec<FieldDefinition>> {
        fields
            .iter()
            .map(|field| self.rewrite_field(schema, prefix, field, scopes))
            .collect()
    }

    fn rewrite_field(
        &mut self,
        schema: &str,
        prefix: &str,
        field: &'a FieldDefinition,
        scopes: &mut Vec<&'a [SubmodelDefinition]>,
    ) -> CompileResult<FieldDefinition> {
        let path = format!("{prefix}{}", field.name);
        match resolve(&field.type_token) {
            ResolvedKind::SubmodelRef(name) => {
                let target = self.promote(schema, &path, name, scopes)?;
                Ok(FieldDefinition::new(&field.name, format!("model.{target}")))
            }
            ResolvedKind::Map => {
                let children =
                    self.rewrite_fields(schema, &format!("{path}."), &field.children, scopes)?;
                Ok(FieldDefinition::map(&field.name, children))
            }
            _ => Ok(field.clone()),
        }
    }

    /// Expands submodel `name` under `parent` (once) and returns its schema name.
    fn promote(
        &mut self,
        parent: &str,
        field: &str,
        name: &'a str,
        scopes: &mut Vec<&'a [SubmodelDefinition]>,
    ) -> CompileResult<String> {
        let declaration =
            find_in_scope(scopes, name).ok_or_else(|| CompileError::MissingSubmodel {
                model: parent.to_string(),
                field: field.to_string(),
                submodel: name.to_string(),
            })?;

        if self.in_progress.iter().any(|open| ptr::eq(*open, declaration)) {
            let mut chain: Vec<&str> = self.in_progress.iter().map(|d| d.name.as_str()).collect();
            chain.push(name);
            return Err(CompileError::CyclicSubmodel {
                model: self.document.to_string(),
                chain: chain.join(" -> "),
            });
        }

        let derived = derived_name(parent, name);
        if let Some(existing) = self.origins.get(&derived) {
            if ptr::eq(*existing, declaration) {
                return Ok(derived);
            }
            return Err(CompileError::DuplicateModel { name: derived });
        }
        self.origins.insert(derived.clone(), declaration);

        self.in_progress.push(declaration);
        scopes.push(declaration.submodels.as_slice());
        let fields = self.rewrite_fields(&derived, "", &declaration.fields, scopes);
        scopes.pop();
        self.in_progress.pop();

        self.emit(derived.clone(), fields?)?;
        Ok(derived)
    }
}

/// Innermost declaration wins.
fn find_in_scope<'a>(
    scopes: &[&'a [SubmodelDefinition]],
    name: &str,
) -> Option<&'a SubmodelDefinition> {
    scopes
        .iter()
        .rev()
        .find_map(|scope| scope.iter().find(|sub| sub.name == name))
}
