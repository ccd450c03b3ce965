//! Query filter evaluation
//!
//! Evaluates filter documents in the database's query syntax against a
//! single document. Field conditions see every value the dotted path
//! reaches; arrays match when the array itself or any element matches.

use serde_json::{Map, Value};

use super::errors::{EngineError, EngineResult};
use super::value::{
    compare_values, expand, is_truthy, query_values, same_type, values_equal, RegexCache,
};

/// Checks a document against a filter document
pub fn matches(document: &Value, filter: &Value, cache: &mut RegexCache) -> EngineResult<bool> {
    let Value::Object(conditions) = filter else {
        return Err(EngineError::malformed("filter", "expected an object"));
    };

    for (key, condition) in conditions {
        let holds = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(condition)? {
                    if !matches(document, clause, cache)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => any_clause(document, condition, cache)?,
            "$nor" => !any_clause(document, condition, cache)?,
            operator if operator.starts_with('$') => {
                return Err(EngineError::UnsupportedOperator(operator.to_string()))
            }
            path => field_matches(document, path, condition, cache)?,
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

fn clauses(condition: &Value) -> EngineResult<&Vec<Value>> {
    condition
        .as_array()
        .ok_or_else(|| EngineError::malformed("logical operator", "expected an array of clauses"))
}

fn any_clause(document: &Value, condition: &Value, cache: &mut RegexCache) -> EngineResult<bool> {
    for clause in clauses(condition)? {
        if matches(document, clause, cache)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Applies one field condition to the values at `path`
pub fn field_matches(
    document: &Value,
    path: &str,
    condition: &Value,
    cache: &mut RegexCache,
) -> EngineResult<bool> {
    let candidates = query_values(document, path);
    value_condition(&candidates, condition, cache)
}

fn value_condition(
    candidates: &[&Value],
    condition: &Value,
    cache: &mut RegexCache,
) -> EngineResult<bool> {
    if let Some((pattern, options)) = regex_literal(condition)? {
        return any_string_matches(candidates, pattern, options, cache);
    }

    match condition {
        Value::Object(operators) if is_operator_document(operators) => {
            for (operator, operand) in operators {
                if operator == "$options" {
                    continue;
                }
                if !apply_operator(candidates, operator, operand, operators, cache)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        expected => Ok(equals_any(candidates, expected)),
    }
}

fn is_operator_document(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.keys().all(|key| key.starts_with('$'))
}

/// Extended-JSON regex literal: `{"$regularExpression": {"pattern", "options"}}`
fn regex_literal(value: &Value) -> EngineResult<Option<(&str, &str)>> {
    let Some(literal) = value.as_object().and_then(|map| {
        (map.len() == 1).then(|| map.get("$regularExpression")).flatten()
    }) else {
        return Ok(None);
    };

    let pattern = literal
        .get("pattern")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::malformed("regular expression", "missing pattern"))?;
    let options = literal.get("options").and_then(Value::as_str).unwrap_or("");
    Ok(Some((pattern, options)))
}

fn any_string_matches(
    candidates: &[&Value],
    pattern: &str,
    options: &str,
    cache: &mut RegexCache,
) -> EngineResult<bool> {
    let regex = cache.get(pattern, options)?;
    Ok(expand(candidates)
        .into_iter()
        .filter_map(Value::as_str)
        .any(|candidate| regex.is_match(candidate)))
}

fn equals_any(candidates: &[&Value], expected: &Value) -> bool {
    if expected.is_null() && candidates.is_empty() {
        return true;
    }
    expand(candidates)
        .into_iter()
        .any(|candidate| values_equal(candidate, expected))
}

fn in_set(candidates: &[&Value], operand: &Value, cache: &mut RegexCache) -> EngineResult<bool> {
    let set = operand
        .as_array()
        .ok_or_else(|| EngineError::malformed("$in", "expected an array"))?;

    for member in set {
        let hit = match regex_literal(member)? {
            Some((pattern, options)) => any_string_matches(candidates, pattern, options, cache)?,
            None => equals_any(candidates, member),
        };
        if hit {
            return Ok(true);
        }
    }
    Ok(false)
}

fn apply_operator(
    candidates: &[&Value],
    operator: &str,
    operand: &Value,
    siblings: &Map<String, Value>,
    cache: &mut RegexCache,
) -> EngineResult<bool> {
    match operator {
        "$eq" => Ok(equals_any(candidates, operand)),
        "$ne" => Ok(!equals_any(candidates, operand)),
        "$gt" | "$gte" | "$lt" | "$lte" => Ok(expand(candidates).into_iter().any(|candidate| {
            same_type(candidate, operand) && {
                let ordering = compare_values(Some(candidate), Some(operand));
                match operator {
                    "$gt" => ordering.is_gt(),
                    "$gte" => ordering.is_ge(),
                    "$lt" => ordering.is_lt(),
                    _ => ordering.is_le(),
                }
            }
        })),
        "$in" => in_set(candidates, operand, cache),
        "$nin" => Ok(!in_set(candidates, operand, cache)?),
        "$exists" => Ok(is_truthy(operand) != candidates.is_empty()),
        "$regex" => {
            let (pattern, literal_options) = match regex_literal(operand)? {
                Some(literal) => literal,
                None => (
                    operand
                        .as_str()
                        .ok_or_else(|| EngineError::malformed("$regex", "expected a string"))?,
                    "",
                ),
            };
            let options = siblings
                .get("$options")
                .and_then(Value::as_str)
                .unwrap_or(literal_options);
            any_string_matches(candidates, pattern, options, cache)
        }
        "$elemMatch" => {
            for candidate in candidates {
                if let Value::Array(items) = candidate {
                    for item in items {
                        if elem_matches(item, operand, cache)? {
                            return Ok(true);
                        }
                    }
                }
            }
            Ok(false)
        }
        "$not" => Ok(!value_condition(candidates, operand, cache)?),
        "$size" => {
            let size = operand
                .as_u64()
                .ok_or_else(|| EngineError::malformed("$size", "expected a non-negative integer"))?;
            Ok(candidates
                .iter()
                .any(|candidate| candidate.as_array().is_some_and(|items| items.len() as u64 == size)))
        }
        other => Err(EngineError::UnsupportedOperator(other.to_string())),
    }
}

/// `$elemMatch` on one array element: operator conditions apply to the
/// element itself, anything else is a query on the element document.
pub fn elem_matches(item: &Value, condition: &Value, cache: &mut RegexCache) -> EngineResult<bool> {
    let value_operators = condition.as_object().is_some_and(|map| {
        is_operator_document(map) && !map.keys().any(|key| matches!(key.as_str(), "$and" | "$or" | "$nor"))
    });

    if value_operators {
        value_condition(&[item], condition, cache)
    } else if item.is_object() {
        matches(item, condition, cache)
    } else {
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(document: &Value, filter: Value) -> bool {
        matches(document, &filter, &mut RegexCache::new()).unwrap()
    }

    fn shell() -> Value {
        json!({
            "_id": "d1",
            "assetType": "Motor",
            "submodelDescriptors": [
                {
                    "_id": "sm1",
                    "idShort": "nameplate",
                    "extensions": [{"name": "tag", "value": "x"}],
                    "endpoints": [{
                        "interface": "SUBMODEL-3.0",
                        "protocolInformation": {"endpointProtocolVersion": ["1.0", "2.0"]}
                    }]
                },
                {"_id": "sm2", "idShort": "technical"}
            ]
        })
    }

    #[test]
    fn test_equality_and_missing_fields() {
        let doc = shell();
        assert!(check(&doc, json!({"assetType": "Motor"})));
        assert!(!check(&doc, json!({"assetType": "Pump"})));
        assert!(!check(&doc, json!({"assetKind": "Instance"})));
        assert!(check(&doc, json!({"assetKind": {"$exists": false}})));
        assert!(check(&doc, json!({"_id": {"$exists": true}})));
    }

    #[test]
    fn test_dotted_path_through_array() {
        let doc = shell();
        assert!(check(&doc, json!({"submodelDescriptors._id": "sm2"})));
        assert!(check(&doc, json!({"submodelDescriptors._id": {"$ne": "sm3"}})));
        assert!(!check(&doc, json!({"submodelDescriptors._id": {"$ne": "sm1"}})));
    }

    #[test]
    fn test_elem_match_needs_one_element() {
        let doc = shell();
        let same_element = json!({"submodelDescriptors": {"$elemMatch": {"$and": [
            {"idShort": "nameplate"},
            {"endpoints": {"$elemMatch": {"interface": "SUBMODEL-3.0"}}}
        ]}}});
        assert!(check(&doc, same_element));

        let split_across = json!({"submodelDescriptors": {"$elemMatch": {"$and": [
            {"idShort": "technical"},
            {"endpoints": {"$elemMatch": {"interface": "SUBMODEL-3.0"}}}
        ]}}});
        assert!(!check(&doc, split_across));
    }

    #[test]
    fn test_in_with_regex_literal() {
        let doc = shell();
        let filter = json!({"submodelDescriptors": {"$elemMatch": {"endpoints": {"$elemMatch": {
            "protocolInformation.endpointProtocolVersion": {"$in": [
                {"$regularExpression": {"pattern": "\\A(?:2\\..*)\\z", "options": ""}}
            ]}
        }}}}});
        assert!(check(&doc, filter));

        let plain = json!({"submodelDescriptors.endpoints.protocolInformation.endpointProtocolVersion": {"$in": ["3.0"]}});
        assert!(!check(&doc, plain));
    }

    #[test]
    fn test_regex_operator() {
        let doc = shell();
        assert!(check(&doc, json!({"assetType": {"$regex": "\\A(?:Mo.*)\\z"}})));
        assert!(check(&doc, json!({"assetType": {"$regex": "motor", "$options": "i"}})));
        assert!(!check(&doc, json!({"assetType": {"$regex": "\\A(?:o.*)\\z"}})));
    }

    #[test]
    fn test_comparison_stays_within_type() {
        let doc = json!({"_id": "b", "n": 5});
        assert!(check(&doc, json!({"_id": {"$gte": "a"}})));
        assert!(!check(&doc, json!({"_id": {"$gte": "c"}})));
        assert!(!check(&doc, json!({"n": {"$gt": "a"}})));
        assert!(check(&doc, json!({"n": {"$lt": 6}})));
    }

    #[test]
    fn test_logical_operators() {
        let doc = shell();
        assert!(check(&doc, json!({"$or": [{"assetType": "Pump"}, {"_id": "d1"}]})));
        assert!(!check(&doc, json!({"$nor": [{"assetType": "Motor"}]})));
        assert!(check(&doc, json!({"$and": []})));
    }

    #[test]
    fn test_unsupported_operator() {
        let err = matches(&shell(), &json!({"$where": "1"}), &mut RegexCache::new()).unwrap_err();
        assert_eq!(err, EngineError::UnsupportedOperator("$where".into()));
    }
}
