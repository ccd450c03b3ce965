//! Update application
//!
//! Operator updates support `$set` (with the positional `$` segment) and
//! `$push`. Pipeline updates accept the reshaping stages only.

use serde_json::Value;

use super::errors::{EngineError, EngineResult};
use super::pipeline::{self, stage_name};
use super::query::{elem_matches, field_matches};
use super::value::{get_path, get_path_mut, set_path, RegexCache};
use crate::document::Update;

const PIPELINE_UPDATE_STAGES: &[&str] = &["$set", "$addFields", "$project", "$replaceRoot"];

/// Returns the updated copy of `document`. `filter` is the filter that
/// selected it, used to resolve positional paths.
pub fn apply_update(
    document: &Value,
    filter: &Value,
    update: &Update,
    cache: &mut RegexCache,
) -> EngineResult<Value> {
    match update {
        Update::Operators(operators) => apply_operators(document.clone(), filter, operators, cache),
        Update::Pipeline(stages) => {
            for stage in stages {
                let (name, _) = stage_name(stage)?;
                if !PIPELINE_UPDATE_STAGES.contains(&name) {
                    return Err(EngineError::malformed(
                        "pipeline update",
                        format!("stage '{}' is not allowed in an update", name),
                    ));
                }
            }
            pipeline::run(vec![document.clone()], stages, cache)?
                .pop()
                .ok_or_else(|| EngineError::malformed("pipeline update", "pipeline removed the document"))
        }
    }
}

fn apply_operators(
    mut document: Value,
    filter: &Value,
    operators: &Value,
    cache: &mut RegexCache,
) -> EngineResult<Value> {
    let operators = operators
        .as_object()
        .ok_or_else(|| EngineError::malformed("update", "expected an operator document"))?;

    for (operator, assignments) in operators {
        let assignments = assignments
            .as_object()
            .ok_or_else(|| EngineError::malformed("update", format!("{} expects an object", operator)))?;

        for (path, value) in assignments {
            let path = resolve_positional(&document, filter, path, cache)?;
            match operator.as_str() {
                "$set" => set_path(&mut document, &path, value.clone())?,
                "$push" => push(&mut document, &path, value.clone())?,
                other => return Err(EngineError::UnsupportedOperator(other.to_string())),
            }
        }
    }
    Ok(document)
}

fn push(document: &mut Value, path: &str, value: Value) -> EngineResult<()> {
    match get_path_mut(document, path) {
        Some(Value::Array(items)) => {
            items.push(value);
            Ok(())
        }
        None | Some(Value::Null) => set_path(document, path, Value::Array(vec![value])),
        Some(_) => Err(EngineError::malformed(
            "$push",
            format!("field '{}' is not an array", path),
        )),
    }
}

/// Replaces a `$` segment with the index of the first array element the
/// filter's conditions on that array select.
fn resolve_positional(
    document: &Value,
    filter: &Value,
    path: &str,
    cache: &mut RegexCache,
) -> EngineResult<String> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some(position) = segments.iter().position(|segment| *segment == "$") else {
        return Ok(path.to_string());
    };

    let array_path = segments[..position].join(".");
    let index = positional_index(document, filter, &array_path, cache)?.ok_or_else(|| {
        EngineError::malformed(
            "positional update",
            format!("filter selects no element of '{}'", array_path),
        )
    })?;

    let mut resolved: Vec<String> = segments.iter().map(|segment| segment.to_string()).collect();
    resolved[position] = index.to_string();
    Ok(resolved.join("."))
}

enum ElementCondition<'f> {
    ElemMatch(&'f Value),
    Field(&'f str, &'f Value),
}

fn element_conditions<'f>(filter: &'f Value, array_path: &str, out: &mut Vec<ElementCondition<'f>>) {
    let Some(conditions) = filter.as_object() else {
        return;
    };
    let prefix = format!("{}.", array_path);

    for (key, condition) in conditions {
        if key == "$and" {
            for clause in condition.as_array().into_iter().flatten() {
                element_conditions(clause, array_path, out);
            }
        } else if key == array_path {
            if let Some(inner) = condition.get("$elemMatch") {
                out.push(ElementCondition::ElemMatch(inner));
            }
        } else if let Some(rest) = key.strip_prefix(&prefix) {
            out.push(ElementCondition::Field(rest, condition));
        }
    }
}

fn positional_index(
    document: &Value,
    filter: &Value,
    array_path: &str,
    cache: &mut RegexCache,
) -> EngineResult<Option<usize>> {
    let Some(Value::Array(items)) = get_path(document, array_path) else {
        return Ok(None);
    };

    let mut conditions = Vec::new();
    element_conditions(filter, array_path, &mut conditions);
    if conditions.is_empty() {
        return Ok(None);
    }

    'items: for (index, item) in items.iter().enumerate() {
        for condition in &conditions {
            let holds = match condition {
                ElementCondition::ElemMatch(inner) => elem_matches(item, inner, cache)?,
                ElementCondition::Field(path, inner) => field_matches(item, path, inner, cache)?,
            };
            if !holds {
                continue 'items;
            }
        }
        return Ok(Some(index));
    }
    Ok(None)
}
