//! In-memory shell filtering
//!
//! Root-scope predicates must all hold for the shell. Submodel-scope
//! predicates must all hold within one submodel; shells keep only their
//! matching submodels. Stored shells are never modified: a shell whose
//! submodels all match is returned as the same shared value, otherwise a
//! narrowed copy is built.

use std::sync::Arc;

use crate::model::{ShellDescriptor, SubmodelDescriptor};
use crate::paths::{any_value, PathNode};
use crate::query::{GroupedQueries, Predicate};

/// Evaluates grouped predicates against stored shells
pub struct ShellFilter<'q> {
    queries: &'q GroupedQueries,
}

impl<'q> ShellFilter<'q> {
    pub fn new(queries: &'q GroupedQueries) -> Self {
        Self { queries }
    }

    /// Returns the shell as it appears in a search result, or `None` when it
    /// does not match.
    pub fn apply(&self, shell: &Arc<ShellDescriptor>) -> Option<Arc<ShellDescriptor>> {
        if !self.matches_root(shell) {
            return None;
        }
        if !self.queries.has_submodel_scope() {
            return Some(Arc::clone(shell));
        }

        let matching: Vec<&SubmodelDescriptor> = shell
            .submodel_descriptors
            .iter()
            .filter(|submodel| self.matches_submodel(submodel))
            .collect();

        if matching.is_empty() {
            None
        } else if matching.len() == shell.submodel_descriptors.len() {
            Some(Arc::clone(shell))
        } else {
            let submodel_descriptors = matching.into_iter().cloned().collect();
            Some(Arc::new(ShellDescriptor {
                submodel_descriptors,
                ..ShellDescriptor::clone(shell)
            }))
        }
    }

    fn matches_root(&self, shell: &ShellDescriptor) -> bool {
        self.queries
            .root
            .iter()
            .all(|predicate| holds(shell, predicate))
    }

    /// Every submodel-scope predicate must hold inside this one submodel
    fn matches_submodel(&self, submodel: &SubmodelDescriptor) -> bool {
        self.queries
            .submodel
            .iter()
            .all(|predicate| holds(submodel, predicate))
    }
}

fn holds(node: &dyn PathNode, predicate: &Predicate) -> bool {
    any_value(node, predicate.scoped_blocks(), |value, extension| {
        predicate.accepts(value, extension)
    })
}
