//! Query filter compilation
//!
//! Root predicates become top-level field conditions. Submodel predicates are
//! combined under a single `$elemMatch` on the submodel list, so they must
//! all hold for the same submodel. Array steps compile to nested
//! `$elemMatch`; an extension name is checked on the innermost extension
//! element the path walks through.

use serde_json::{json, Map, Value};

use super::mapping::{DocumentPath, LeafStep};
use crate::errors::RegistryResult;
use crate::paths::SUBMODEL_DESCRIPTORS;
use crate::query::{GroupedQueries, Predicate, ValueMatcher};

/// Compiles grouped predicates into one filter document
pub fn compile_filter(queries: &GroupedQueries) -> RegistryResult<Value> {
    let mut clauses = queries
        .root
        .iter()
        .map(predicate_clause)
        .collect::<RegistryResult<Vec<_>>>()?;

    if queries.has_submodel_scope() {
        let submodel = queries
            .submodel
            .iter()
            .map(predicate_clause)
            .collect::<RegistryResult<Vec<_>>>()?;
        clauses.push(field(SUBMODEL_DESCRIPTORS, json!({ "$elemMatch": all_of(submodel) })));
    }

    Ok(if clauses.is_empty() {
        json!({"_id": {"$exists": true}})
    } else {
        all_of(clauses)
    })
}

fn all_of(mut clauses: Vec<Value>) -> Value {
    if clauses.len() == 1 {
        clauses.remove(0)
    } else {
        json!({ "$and": clauses })
    }
}

fn predicate_clause(predicate: &Predicate) -> RegistryResult<Value> {
    let path = DocumentPath::from_blocks(predicate.scoped_blocks())?;
    let qualified = predicate
        .extension_name
        .as_deref()
        .zip(path.extension_step());

    let mut clause = leaf_clause(&path.leaf, &predicate.matcher);
    for (index, step) in path.lists.iter().enumerate().rev() {
        if let Some((name, _)) = qualified.filter(|(_, at)| *at == index) {
            clause = json!({ "$and": [clause, { "name": name }] });
        }
        clause = field(&step.field, json!({ "$elemMatch": clause }));
    }
    Ok(clause)
}

fn leaf_clause(leaf: &LeafStep, matcher: &ValueMatcher) -> Value {
    let condition = match (matcher, leaf.list) {
        (ValueMatcher::Exact(value), false) => json!(value),
        (ValueMatcher::Pattern(regex), false) => json!({ "$regex": regex.as_str() }),
        (ValueMatcher::Exact(value), true) => json!({ "$in": [value] }),
        (ValueMatcher::Pattern(regex), true) => json!({
            "$in": [{ "$regularExpression": { "pattern": regex.as_str(), "options": "" } }]
        }),
    };
    field(&leaf.field, condition)
}

fn field(name: &str, condition: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert(name.to_string(), condition);
    Value::Object(map)
}
