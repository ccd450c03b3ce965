//! Aggregation pipeline stages
//!
//! Stages run in order over an owned batch of documents. Supported stages are
//! `$match`, `$sort`, `$skip`, `$limit`, `$addFields`/`$set`, `$project`,
//! `$unwind` and `$replaceRoot`.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::errors::{EngineError, EngineResult};
use super::expr::{evaluate, Scope};
use super::query;
use super::value::{compare_values, get_path, query_values, set_path, RegexCache};

/// Runs `pipeline` over `documents`
pub fn run(documents: Vec<Value>, pipeline: &[Value], cache: &mut RegexCache) -> EngineResult<Vec<Value>> {
    pipeline
        .iter()
        .try_fold(documents, |batch, stage| apply_stage(batch, stage, cache))
}

/// Splits a one-key stage document into its name and specification
pub fn stage_name(stage: &Value) -> EngineResult<(&str, &Value)> {
    let map = stage
        .as_object()
        .ok_or_else(|| EngineError::malformed("pipeline stage", "expected an object"))?;
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some((name, body)), None) => Ok((name.as_str(), body)),
        _ => Err(EngineError::malformed("pipeline stage", "expected exactly one stage operator")),
    }
}

fn apply_stage(batch: Vec<Value>, stage: &Value, cache: &mut RegexCache) -> EngineResult<Vec<Value>> {
    let (name, body) = stage_name(stage)?;
    match name {
        "$match" => {
            let mut kept = Vec::with_capacity(batch.len());
            for document in batch {
                if query::matches(&document, body, cache)? {
                    kept.push(document);
                }
            }
            Ok(kept)
        }
        "$sort" => sort(batch, body),
        "$skip" => Ok(batch.into_iter().skip(count("$skip", body)?).collect()),
        "$limit" => Ok(batch.into_iter().take(count("$limit", body)?).collect()),
        "$addFields" | "$set" => batch
            .into_iter()
            .map(|document| add_fields(document, body, cache))
            .collect(),
        "$project" => batch
            .into_iter()
            .map(|document| project(&document, body, cache))
            .collect(),
        "$unwind" => unwind(batch, body),
        "$replaceRoot" => batch
            .into_iter()
            .map(|document| replace_root(&document, body, cache))
            .collect(),
        other => Err(EngineError::UnsupportedOperator(other.to_string())),
    }
}

fn count(stage: &'static str, body: &Value) -> EngineResult<usize> {
    body.as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| EngineError::malformed(stage, "expected a non-negative integer"))
}

fn fields<'a>(stage: &'static str, body: &'a Value) -> EngineResult<&'a Map<String, Value>> {
    body.as_object()
        .ok_or_else(|| EngineError::malformed(stage, "expected an object"))
}

// ==================
// Sort
// ==================

fn sort(batch: Vec<Value>, body: &Value) -> EngineResult<Vec<Value>> {
    let keys = fields("$sort", body)?
        .iter()
        .map(|(path, direction)| match direction.as_i64() {
            Some(1) => Ok((path.as_str(), false)),
            Some(-1) => Ok((path.as_str(), true)),
            _ => Err(EngineError::malformed("$sort", format!("direction of '{}' must be 1 or -1", path))),
        })
        .collect::<EngineResult<Vec<_>>>()?;

    let mut decorated: Vec<(Vec<Value>, Value)> = batch
        .into_iter()
        .map(|document| {
            let values = keys
                .iter()
                .map(|(path, descending)| sort_key(&document, path, *descending))
                .collect();
            (values, document)
        })
        .collect();

    decorated.sort_by(|(a, _), (b, _)| {
        keys.iter()
            .zip(a.iter().zip(b))
            .map(|((_, descending), (a, b))| {
                let ordering = compare_values(Some(a), Some(b));
                if *descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    Ok(decorated.into_iter().map(|(_, document)| document).collect())
}

/// Sort key of one document: arrays contribute their smallest element in
/// ascending order and their largest in descending order
fn sort_key(document: &Value, path: &str, descending: bool) -> Value {
    let mut values = Vec::new();
    for value in query_values(document, path) {
        match value {
            Value::Array(items) => values.extend(items.iter()),
            scalar => values.push(scalar),
        }
    }

    let pick = values.into_iter().reduce(|best, candidate| {
        let ordering = compare_values(Some(candidate), Some(best));
        let better = if descending { ordering.is_gt() } else { ordering.is_lt() };
        if better {
            candidate
        } else {
            best
        }
    });
    pick.cloned().unwrap_or(Value::Null)
}

// ==================
// Reshaping
// ==================

fn add_fields(mut document: Value, body: &Value, cache: &mut RegexCache) -> EngineResult<Value> {
    let mut computed = Vec::new();
    {
        let scope = Scope::root(&document);
        for (path, expression) in fields("$addFields", body)? {
            computed.push((path, evaluate(expression, &scope, cache)?));
        }
    }
    for (path, value) in computed {
        set_path(&mut document, path, value)?;
    }
    Ok(document)
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        _ => None,
    }
}

fn project(document: &Value, body: &Value, cache: &mut RegexCache) -> EngineResult<Value> {
    let body = fields("$project", body)?;
    let source = document
        .as_object()
        .ok_or_else(|| EngineError::malformed("$project", "document is not an object"))?;

    if body.values().all(|value| flag(value) == Some(false)) {
        let mut out = source.clone();
        for key in body.keys() {
            out.remove(key);
        }
        return Ok(Value::Object(out));
    }

    let mut out = Map::new();
    let keep_id = body.get("_id").and_then(flag).unwrap_or(true);
    if keep_id {
        if let Some(id) = source.get("_id") {
            out.insert("_id".to_string(), id.clone());
        }
    }

    let scope = Scope::root(document);
    for (key, value) in body.iter().filter(|(key, _)| key.as_str() != "_id") {
        match flag(value) {
            Some(true) => {
                if let Some(field) = get_path(document, key) {
                    out.insert(key.clone(), field.clone());
                }
            }
            Some(false) => {
                return Err(EngineError::malformed(
                    "$project",
                    format!("cannot exclude '{}' in an inclusion projection", key),
                ))
            }
            None => {
                out.insert(key.clone(), evaluate(value, &scope, cache)?);
            }
        }
    }
    Ok(Value::Object(out))
}

fn unwind(batch: Vec<Value>, body: &Value) -> EngineResult<Vec<Value>> {
    let reference = match body {
        Value::String(path) => path.as_str(),
        Value::Object(map) => map
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::malformed("$unwind", "missing path"))?,
        _ => return Err(EngineError::malformed("$unwind", "expected a field path")),
    };
    let path = reference
        .strip_prefix('$')
        .ok_or_else(|| EngineError::malformed("$unwind", "path must start with '$'"))?;

    let mut out = Vec::new();
    for document in batch {
        let items = match get_path(&document, path) {
            Some(Value::Array(items)) => Some(items.clone()),
            None | Some(Value::Null) => continue,
            Some(_) => None,
        };
        match items {
            Some(items) => {
                for item in items {
                    let mut copy = document.clone();
                    set_path(&mut copy, path, item)?;
                    out.push(copy);
                }
            }
            None => out.push(document),
        }
    }
    Ok(out)
}

fn replace_root(document: &Value, body: &Value, cache: &mut RegexCache) -> EngineResult<Value> {
    let expression = fields("$replaceRoot", body)?
        .get("newRoot")
        .ok_or_else(|| EngineError::malformed("$replaceRoot", "missing newRoot"))?;

    match evaluate(expression, &Scope::root(document), cache)? {
        root @ Value::Object(_) => Ok(root),
        _ => Err(EngineError::malformed("$replaceRoot", "newRoot must evaluate to an object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run_pipeline(documents: Vec<Value>, pipeline: Value) -> Vec<Value> {
        let stages = pipeline.as_array().unwrap().clone();
        run(documents, &stages, &mut RegexCache::new()).unwrap()
    }

    fn ids(documents: &[Value]) -> Vec<&str> {
        documents.iter().map(|d| d["_id"].as_str().unwrap()).collect()
    }

    #[test]
    fn test_match_sort_skip_limit() {
        let docs = vec![
            json!({"_id": "a", "idShort": "z"}),
            json!({"_id": "b"}),
            json!({"_id": "c", "idShort": "m"}),
            json!({"_id": "d", "idShort": "m"}),
        ];
        let out = run_pipeline(
            docs,
            json!([
                {"$match": {"_id": {"$exists": true}}},
                {"$sort": {"idShort": 1, "_id": 1}},
                {"$skip": 1},
                {"$limit": 2}
            ]),
        );
        assert_eq!(ids(&out), vec!["c", "d"]);
    }

    #[test]
    fn test_sort_descending_uses_array_maximum() {
        let docs = vec![
            json!({"_id": "a", "tags": ["b", "y"]}),
            json!({"_id": "b", "tags": ["x"]}),
        ];
        let desc = run_pipeline(docs.clone(), json!([{"$sort": {"tags": -1, "_id": 1}}]));
        assert_eq!(ids(&desc), vec!["a", "b"]);

        let asc = run_pipeline(docs, json!([{"$sort": {"tags": 1, "_id": 1}}]));
        assert_eq!(ids(&asc), vec!["a", "b"]);
    }

    #[test]
    fn test_unwind_and_replace_root() {
        let docs = vec![json!({"_id": "d1", "submodelDescriptors": [{"_id": "sm2"}, {"_id": "sm1"}]})];
        let out = run_pipeline(
            docs,
            json!([
                {"$unwind": "$submodelDescriptors"},
                {"$replaceRoot": {"newRoot": "$submodelDescriptors"}},
                {"$sort": {"_id": 1}}
            ]),
        );
        assert_eq!(out, vec![json!({"_id": "sm1"}), json!({"_id": "sm2"})]);
    }

    #[test]
    fn test_project_inclusion_and_expression() {
        let docs = vec![json!({"_id": "d1", "idShort": "x", "submodelDescriptors": [{"_id": "a"}, {"_id": "b"}]})];
        let out = run_pipeline(
            docs.clone(),
            json!([{"$project": {"_id": 0, "submodelDescriptors": {"$filter": {
                "input": "$submodelDescriptors", "as": "sm",
                "cond": {"$eq": ["$$sm._id", {"$literal": "b"}]}
            }}}}]),
        );
        assert_eq!(out, vec![json!({"submodelDescriptors": [{"_id": "b"}]})]);

        let ids_only = run_pipeline(docs, json!([{"$project": {"_id": 1}}]));
        assert_eq!(ids_only, vec![json!({"_id": "d1"})]);
    }

    #[test]
    fn test_add_fields_replaces_field() {
        let docs = vec![json!({"_id": "d1", "n": 1})];
        let out = run_pipeline(docs, json!([{"$addFields": {"n": {"$literal": 2}, "m": "$n"}}]));
        assert_eq!(out, vec![json!({"_id": "d1", "n": 2, "m": 1})]);
    }

    #[test]
    fn test_unknown_stage() {
        let err = run(vec![], &[json!({"$group": {}})], &mut RegexCache::new()).unwrap_err();
        assert_eq!(err, EngineError::UnsupportedOperator("$group".into()));
    }
}
