//! Sort stage compilation
//!
//! A sort path is ordered by the first value it reaches in document order,
//! with the empty string standing in for no value. Each path gets a computed
//! key in an `$addFields` stage; the keys are sorted on and projected away.

use serde_json::{json, Map, Value};

use crate::errors::RegistryResult;
use crate::paths::{PathCache, SegmentBlock, SUBMODEL_DESCRIPTORS};
use crate::query::{SortDirection, Sorting};

const DOCUMENT_ID: &str = "_id";
const ID: &str = "id";
const SORT_KEY_PREFIX: &str = "_sortKey";

/// Stages ordering a search by `sorting`. Ties are always broken by
/// ascending id unless the id is itself a sort key.
pub fn compile_sort(sorting: Option<&Sorting>) -> RegistryResult<Vec<Value>> {
    let mut computed = Map::new();
    let mut keys = Map::new();

    if let Some(sorting) = sorting {
        let direction = match sorting.direction {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        };
        if sorting.path.is_empty() {
            keys.insert(DOCUMENT_ID.to_string(), json!(direction));
        }
        for path in &sorting.path {
            let resolved = PathCache::global().resolve(path)?;
            if resolved.canonical() == ID {
                keys.insert(DOCUMENT_ID.to_string(), json!(direction));
                continue;
            }
            let key = format!("{}{}", SORT_KEY_PREFIX, computed.len());
            computed.insert(key.clone(), first_value_key(resolved.blocks()));
            keys.insert(key, json!(direction));
        }
    }

    if !keys.contains_key(DOCUMENT_ID) {
        keys.insert(DOCUMENT_ID.to_string(), json!(1));
    }

    if computed.is_empty() {
        return Ok(vec![json!({ "$sort": keys })]);
    }
    let hidden: Map<String, Value> = computed.keys().map(|key| (key.clone(), json!(0))).collect();
    Ok(vec![
        json!({ "$addFields": computed }),
        json!({ "$sort": keys }),
        json!({ "$project": hidden }),
    ])
}

/// `{"$ifNull": [<first value>, ""]}` over the values `blocks` reach from
/// the shell root
fn first_value_key(blocks: &[SegmentBlock]) -> Value {
    json!({
        "$ifNull": [{ "$arrayElemAt": [values_along(blocks, "$", true, 0), 0] }, ""]
    })
}

/// Expression yielding every value along `blocks` in document order.
///
/// `base` prefixes field references (`$` at the root, `$$e<n>.` inside a
/// list element). `keyed` marks a base holding a shell or submodel, whose
/// `id` is stored as `_id`.
fn values_along(blocks: &[SegmentBlock], base: &str, keyed: bool, depth: usize) -> Value {
    let mut prefix: Vec<&str> = Vec::new();

    for (index, block) in blocks.iter().enumerate() {
        match block {
            SegmentBlock::Object { name, .. } => prefix.push(name),
            SegmentBlock::ObjectList { name, .. } => {
                let variable = format!("e{}", depth);
                let submodels = keyed && depth == 0 && prefix.is_empty() && *name == SUBMODEL_DESCRIPTORS;
                let element = values_along(
                    &blocks[index + 1..],
                    &format!("$${}.", variable),
                    submodels,
                    depth + 1,
                );
                return json!({
                    "$reduce": {
                        "input": {"$map": {
                            "input": {"$ifNull": [field(base, &prefix, name), []]},
                            "as": variable,
                            "in": element
                        }},
                        "initialValue": [],
                        "in": {"$concatArrays": ["$$value", "$$this"]}
                    }
                });
            }
            SegmentBlock::Leaf { name } => {
                let name = if keyed && prefix.is_empty() && *name == ID { DOCUMENT_ID } else { name };
                return json!({
                    "$filter": {
                        "input": [field(base, &prefix, name)],
                        "as": "v",
                        "cond": {"$ne": ["$$v", null]}
                    }
                });
            }
            SegmentBlock::LeafList { name } => {
                return json!({ "$ifNull": [field(base, &prefix, name), []] });
            }
        }
    }

    json!([])
}

fn field(base: &str, prefix: &[&str], name: &str) -> String {
    if prefix.is_empty() {
        format!("{}{}", base, name)
    } else {
        format!("{}{}.{}", base, prefix.join("."), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{run_pipeline, RegexCache};
    use crate::errors::RegistryError;

    fn sorted_ids(documents: Vec<Value>, sorting: Sorting) -> Vec<String> {
        let stages = compile_sort(Some(&sorting)).unwrap();
        run_pipeline(documents, &stages, &mut RegexCache::new())
            .unwrap()
            .into_iter()
            .map(|document| {
                assert!(document.get("_sortKey0").is_none());
                document["_id"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn test_no_sorting_orders_by_id() {
        assert_eq!(compile_sort(None).unwrap(), vec![json!({"$sort": {"_id": 1}})]);
    }

    #[test]
    fn test_paths_keep_order_and_tiebreak() {
        let stages = compile_sort(Some(&Sorting::desc(&["assetType", "idShort"]))).unwrap();
        assert_eq!(stages.len(), 3);
        let keys: Vec<(&String, &Value)> = stages[1]["$sort"].as_object().unwrap().iter().collect();
        assert_eq!(
            keys,
            vec![
                (&"_sortKey0".to_string(), &json!(-1)),
                (&"_sortKey1".to_string(), &json!(-1)),
                (&"_id".to_string(), &json!(1)),
            ]
        );
        assert_eq!(stages[2], json!({"$project": {"_sortKey0": 0, "_sortKey1": 0}}));
    }

    #[test]
    fn test_empty_paths_sort_by_id_in_direction() {
        let stages = compile_sort(Some(&Sorting::desc(&[]))).unwrap();
        assert_eq!(stages, vec![json!({"$sort": {"_id": -1}})]);
    }

    #[test]
    fn test_id_path_is_not_duplicated() {
        let stages = compile_sort(Some(&Sorting::desc(&["id"]))).unwrap();
        assert_eq!(stages, vec![json!({"$sort": {"_id": -1}})]);
    }

    #[test]
    fn test_absent_value_sorts_as_empty_string() {
        let documents = vec![
            json!({"_id": "a"}),
            json!({"_id": "b", "idShort": ""}),
            json!({"_id": "c", "idShort": "x"}),
        ];
        assert_eq!(sorted_ids(documents.clone(), Sorting::desc(&["idShort"])), vec!["c", "a", "b"]);
        assert_eq!(sorted_ids(documents, Sorting::asc(&["idShort"])), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_list_path_sorts_by_first_value() {
        let documents = vec![
            json!({"_id": "a", "extensions": [{"name": "n1", "value": "m"}, {"name": "n2", "value": "a"}]}),
            json!({"_id": "b", "extensions": [{"name": "n3", "value": "c"}]}),
        ];
        assert_eq!(sorted_ids(documents.clone(), Sorting::asc(&["extensions.value"])), vec!["b", "a"]);
        assert_eq!(sorted_ids(documents, Sorting::desc(&["extensions.value"])), vec!["a", "b"]);
    }

    #[test]
    fn test_nested_lists_skip_elements_without_values() {
        let documents = vec![
            json!({"_id": "a", "submodelDescriptors": [
                {"_id": "z1"},
                {"_id": "z2", "endpoints": [{"interface": "B"}]}
            ]}),
            json!({"_id": "b", "submodelDescriptors": [
                {"_id": "y1", "endpoints": [{"interface": "A"}, {"interface": "C"}]}
            ]}),
        ];
        let sorting = Sorting::asc(&["submodelDescriptors.endpoints.interface"]);
        assert_eq!(sorted_ids(documents.clone(), sorting), vec!["b", "a"]);

        let by_submodel_id = Sorting::asc(&["submodelDescriptors.id"]);
        assert_eq!(sorted_ids(documents, by_submodel_id), vec!["b", "a"]);
    }

    #[test]
    fn test_unknown_sort_path() {
        let err = compile_sort(Some(&Sorting::asc(&["unknown"]))).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidQuery(_)));
    }
}
