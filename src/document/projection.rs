//! Submodel narrowing stage
//!
//! When a query has submodel-scope predicates, matching shells are returned
//! with only the submodels that satisfy all of them. The stage rewrites the
//! submodel list with a `$filter` expression mirroring the filter clauses.

use serde_json::{json, Value};

use super::mapping::{DocumentPath, LeafStep, ListStep};
use crate::errors::RegistryResult;
use crate::paths::SUBMODEL_DESCRIPTORS;
use crate::query::{GroupedQueries, Predicate, ValueMatcher};

const SUBMODEL_VARIABLE: &str = "sm";

/// `$addFields` stage narrowing the submodel list, or `None` when the query
/// has no submodel-scope predicates
pub fn compile_projection(queries: &GroupedQueries) -> RegistryResult<Option<Value>> {
    if !queries.has_submodel_scope() {
        return Ok(None);
    }

    let mut variables = Variables::default();
    let mut conditions = queries
        .submodel
        .iter()
        .map(|predicate| predicate_condition(predicate, &mut variables))
        .collect::<RegistryResult<Vec<_>>>()?;

    let condition = if conditions.len() == 1 {
        conditions.remove(0)
    } else {
        json!({ "$and": conditions })
    };

    let mut fields = serde_json::Map::new();
    fields.insert(
        SUBMODEL_DESCRIPTORS.to_string(),
        json!({ "$filter": {
            "input": format!("${}", SUBMODEL_DESCRIPTORS),
            "as": SUBMODEL_VARIABLE,
            "cond": condition,
        }}),
    );
    Ok(Some(json!({ "$addFields": fields })))
}

/// Fresh `$filter` variable names
#[derive(Default)]
struct Variables {
    next: usize,
}

impl Variables {
    fn fresh(&mut self) -> String {
        let name = format!("v{}", self.next);
        self.next += 1;
        name
    }
}

fn predicate_condition(predicate: &Predicate, variables: &mut Variables) -> RegistryResult<Value> {
    let path = DocumentPath::from_blocks(predicate.scoped_blocks())?;
    let extension = predicate
        .extension_name
        .as_deref()
        .zip(path.extension_step());

    Ok(list_condition(
        &path.lists,
        0,
        &path.leaf,
        SUBMODEL_VARIABLE,
        &predicate.matcher,
        extension,
        variables,
    ))
}

fn list_condition(
    lists: &[ListStep],
    depth: usize,
    leaf: &LeafStep,
    variable: &str,
    matcher: &ValueMatcher,
    extension: Option<(&str, usize)>,
    variables: &mut Variables,
) -> Value {
    let Some((step, rest)) = lists.split_first() else {
        return leaf_condition(leaf, variable, matcher, variables);
    };

    let element = variables.fresh();
    let mut condition = list_condition(rest, depth + 1, leaf, &element, matcher, extension, variables);
    if let Some((name, _)) = extension.filter(|(_, at)| *at == depth) {
        condition = json!({ "$and": [
            condition,
            { "$eq": [format!("$${}.name", element), { "$literal": name }] }
        ]});
    }
    any_element(format!("$${}.{}", variable, step.field), &element, condition)
}

fn leaf_condition(leaf: &LeafStep, variable: &str, matcher: &ValueMatcher, variables: &mut Variables) -> Value {
    let reference = format!("$${}.{}", variable, leaf.field);
    if leaf.list {
        let element = variables.fresh();
        let condition = value_condition(format!("$${}", element), matcher);
        any_element(reference, &element, condition)
    } else {
        value_condition(reference, matcher)
    }
}

fn value_condition(reference: String, matcher: &ValueMatcher) -> Value {
    match matcher {
        ValueMatcher::Exact(value) => json!({ "$eq": [reference, { "$literal": value }] }),
        ValueMatcher::Pattern(regex) => {
            json!({ "$regexMatch": { "input": reference, "regex": regex.as_str() } })
        }
    }
}

/// True when some element of the array at `input` satisfies `condition`
fn any_element(input: String, element: &str, condition: Value) -> Value {
    json!({ "$ne": [
        { "$size": { "$ifNull": [
            { "$filter": { "input": input, "as": element, "cond": condition } },
            []
        ]}},
        0
    ]})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{anchored, ShellDescriptorQuery};

    fn compile(query: ShellDescriptorQuery) -> Option<Value> {
        compile_projection(&GroupedQueries::group(Some(&query)).unwrap()).unwrap()
    }

    fn condition(stage: &Value) -> &Value {
        &stage["$addFields"]["submodelDescriptors"]["$filter"]["cond"]
    }

    #[test]
    fn test_root_only_query_has_no_projection() {
        assert_eq!(compile(ShellDescriptorQuery::matching("idShort", "a")), None);
    }

    #[test]
    fn test_submodel_leaf_condition() {
        let stage = compile(ShellDescriptorQuery::matching("submodelDescriptors.idShort", "nameplate")).unwrap();
        assert_eq!(
            stage,
            json!({"$addFields": {"submodelDescriptors": {"$filter": {
                "input": "$submodelDescriptors",
                "as": "sm",
                "cond": {"$eq": ["$$sm.idShort", {"$literal": "nameplate"}]}
            }}}})
        );
    }

    #[test]
    fn test_submodel_id_and_regex() {
        let query = ShellDescriptorQuery::matching("submodelDescriptors.id", "sm1")
            .and(ShellDescriptorQuery::regex("submodelDescriptors.idShort", "name.*"));
        let stage = compile(query).unwrap();
        assert_eq!(
            condition(&stage),
            &json!({"$and": [
                {"$eq": ["$$sm._id", {"$literal": "sm1"}]},
                {"$regexMatch": {"input": "$$sm.idShort", "regex": anchored("name.*")}}
            ]})
        );
    }

    #[test]
    fn test_nested_lists_get_fresh_variables() {
        let stage = compile(ShellDescriptorQuery::matching(
            "submodelDescriptors.endpoints.protocolInformation.endpointProtocolVersion",
            "2.0",
        ))
        .unwrap();
        assert_eq!(
            condition(&stage),
            &json!({"$ne": [{"$size": {"$ifNull": [{"$filter": {
                "input": "$$sm.endpoints",
                "as": "v0",
                "cond": {"$ne": [{"$size": {"$ifNull": [{"$filter": {
                    "input": "$$v0.protocolInformation.endpointProtocolVersion",
                    "as": "v1",
                    "cond": {"$eq": ["$$v1", {"$literal": "2.0"}]}
                }}, []]}}, 0]}
            }}, []]}}, 0]})
        );
    }

    #[test]
    fn test_extension_name_checked_on_element() {
        let stage = compile(
            ShellDescriptorQuery::matching("submodelDescriptors.extensions.value", "x")
                .with_extension_name("tag"),
        )
        .unwrap();
        let inner = &condition(&stage)["$ne"][0]["$size"]["$ifNull"][0]["$filter"]["cond"];
        assert_eq!(
            inner,
            &json!({"$and": [
                {"$eq": ["$$v0.value", {"$literal": "x"}]},
                {"$eq": ["$$v0.name", {"$literal": "tag"}]}
            ]})
        );
    }
}
