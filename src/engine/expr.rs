//! Aggregation expression evaluation
//!
//! `$field` paths resolve against the current document, `$$name` paths
//! against variables bound by `$filter`. A missing value evaluates to null.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::errors::{EngineError, EngineResult};
use super::value::{compare_values, expr_path, is_truthy, values_equal, RegexCache};

/// Variable bindings of one evaluation, innermost first
pub struct Scope<'a> {
    root: &'a Value,
    binding: Option<(&'a str, &'a Value)>,
    parent: Option<&'a Scope<'a>>,
}

impl<'a> Scope<'a> {
    pub fn root(document: &'a Value) -> Self {
        Self {
            root: document,
            binding: None,
            parent: None,
        }
    }

    fn bind(parent: &'a Scope<'a>, name: &'a str, value: &'a Value) -> Self {
        Self {
            root: parent.root,
            binding: Some((name, value)),
            parent: Some(parent),
        }
    }

    fn variable(&self, name: &str) -> Option<&'a Value> {
        if matches!(name, "ROOT" | "CURRENT") {
            return Some(self.root);
        }
        match self.binding {
            Some((bound, value)) if bound == name => Some(value),
            _ => self.parent.and_then(|parent| parent.variable(name)),
        }
    }
}

/// Evaluates an expression in `scope`
pub fn evaluate(expression: &Value, scope: &Scope<'_>, cache: &mut RegexCache) -> EngineResult<Value> {
    match expression {
        Value::String(text) => resolve_reference(text, scope),
        Value::Array(items) => items
            .iter()
            .map(|item| evaluate(item, scope, cache))
            .collect::<EngineResult<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => match single_operator(map) {
            Some((operator, operand)) => apply_operator(operator, operand, scope, cache),
            None => {
                let mut out = Map::new();
                for (key, value) in map {
                    out.insert(key.clone(), evaluate(value, scope, cache)?);
                }
                Ok(Value::Object(out))
            }
        },
        literal => Ok(literal.clone()),
    }
}

fn single_operator(map: &Map<String, Value>) -> Option<(&str, &Value)> {
    let mut entries = map.iter();
    match (entries.next(), entries.next()) {
        (Some((key, value)), None) if key.starts_with('$') => Some((key.as_str(), value)),
        _ => None,
    }
}

fn resolve_reference(text: &str, scope: &Scope<'_>) -> EngineResult<Value> {
    if let Some(reference) = text.strip_prefix("$$") {
        let (name, rest) = match reference.split_once('.') {
            Some((name, rest)) => (name, Some(rest)),
            None => (reference, None),
        };
        let bound = scope
            .variable(name)
            .ok_or_else(|| EngineError::malformed("expression", format!("unknown variable '{}'", name)))?;
        let resolved = match rest {
            Some(path) => expr_path(bound, path),
            None => Some(bound.clone()),
        };
        Ok(resolved.unwrap_or(Value::Null))
    } else if let Some(path) = text.strip_prefix('$') {
        Ok(expr_path(scope.root, path).unwrap_or(Value::Null))
    } else {
        Ok(Value::String(text.to_string()))
    }
}

fn arguments(operand: &Value, scope: &Scope<'_>, cache: &mut RegexCache) -> EngineResult<Vec<Value>> {
    match operand {
        Value::Array(items) => items.iter().map(|item| evaluate(item, scope, cache)).collect(),
        single => Ok(vec![evaluate(single, scope, cache)?]),
    }
}

fn pair(
    operator: &'static str,
    operand: &Value,
    scope: &Scope<'_>,
    cache: &mut RegexCache,
) -> EngineResult<(Value, Value)> {
    let mut args = arguments(operand, scope, cache)?.into_iter();
    match (args.next(), args.next(), args.next()) {
        (Some(a), Some(b), None) => Ok((a, b)),
        _ => Err(EngineError::malformed(operator, "expected two arguments")),
    }
}

fn apply_operator(
    operator: &str,
    operand: &Value,
    scope: &Scope<'_>,
    cache: &mut RegexCache,
) -> EngineResult<Value> {
    let comparison = |ordering: Ordering| -> Option<bool> {
        Some(match operator {
            "$gt" => ordering.is_gt(),
            "$gte" => ordering.is_ge(),
            "$lt" => ordering.is_lt(),
            "$lte" => ordering.is_le(),
            _ => return None,
        })
    };

    match operator {
        "$literal" => Ok(operand.clone()),
        "$and" => {
            for value in arguments(operand, scope, cache)? {
                if !is_truthy(&value) {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        "$or" => {
            let args = arguments(operand, scope, cache)?;
            Ok(Value::Bool(args.iter().any(is_truthy)))
        }
        "$not" => {
            let args = arguments(operand, scope, cache)?;
            Ok(Value::Bool(!args.first().is_some_and(is_truthy)))
        }
        "$eq" => {
            let (a, b) = pair("$eq", operand, scope, cache)?;
            Ok(Value::Bool(values_equal(&a, &b)))
        }
        "$ne" => {
            let (a, b) = pair("$ne", operand, scope, cache)?;
            Ok(Value::Bool(!values_equal(&a, &b)))
        }
        "$gt" | "$gte" | "$lt" | "$lte" => {
            let (a, b) = pair("comparison", operand, scope, cache)?;
            let ordering = compare_values(Some(&a), Some(&b));
            Ok(Value::Bool(comparison(ordering).unwrap_or(false)))
        }
        "$in" => {
            let (needle, haystack) = pair("$in", operand, scope, cache)?;
            let items = haystack
                .as_array()
                .ok_or_else(|| EngineError::malformed("$in", "second argument must be an array"))?;
            Ok(Value::Bool(items.iter().any(|item| values_equal(item, &needle))))
        }
        "$size" => {
            let args = arguments(operand, scope, cache)?;
            match args.first() {
                Some(Value::Array(items)) => Ok(Value::from(items.len())),
                _ => Err(EngineError::malformed("$size", "argument must be an array")),
            }
        }
        "$ifNull" => {
            let args = arguments(operand, scope, cache)?;
            let last = args.len().saturating_sub(1);
            Ok(args
                .into_iter()
                .enumerate()
                .find(|(index, value)| !value.is_null() || *index == last)
                .map(|(_, value)| value)
                .unwrap_or(Value::Null))
        }
        "$arrayElemAt" => {
            let (array, index) = pair("$arrayElemAt", operand, scope, cache)?;
            let items = match array {
                Value::Null => return Ok(Value::Null),
                Value::Array(items) => items,
                _ => return Err(EngineError::malformed("$arrayElemAt", "first argument must be an array")),
            };
            let index = index
                .as_i64()
                .ok_or_else(|| EngineError::malformed("$arrayElemAt", "index must be an integer"))?;
            let position = if index < 0 { items.len() as i64 + index } else { index };
            Ok(usize::try_from(position)
                .ok()
                .and_then(|position| items.get(position).cloned())
                .unwrap_or(Value::Null))
        }
        "$concatArrays" => {
            let mut out = Vec::new();
            for value in arguments(operand, scope, cache)? {
                match value {
                    Value::Null => return Ok(Value::Null),
                    Value::Array(items) => out.extend(items),
                    _ => return Err(EngineError::malformed("$concatArrays", "arguments must be arrays")),
                }
            }
            Ok(Value::Array(out))
        }
        "$filter" => filter(operand, scope, cache),
        "$map" => map(operand, scope, cache),
        "$reduce" => reduce(operand, scope, cache),
        "$regexMatch" => regex_match(operand, scope, cache),
        other => Err(EngineError::UnsupportedOperator(other.to_string())),
    }
}

fn filter(operand: &Value, scope: &Scope<'_>, cache: &mut RegexCache) -> EngineResult<Value> {
    let args = operand
        .as_object()
        .ok_or_else(|| EngineError::malformed("$filter", "expected an object"))?;
    let input = args
        .get("input")
        .ok_or_else(|| EngineError::malformed("$filter", "missing input"))?;
    let condition = args
        .get("cond")
        .ok_or_else(|| EngineError::malformed("$filter", "missing cond"))?;
    let name = args.get("as").and_then(Value::as_str).unwrap_or("this");

    match evaluate(input, scope, cache)? {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => {
            let mut kept = Vec::new();
            for item in items {
                let keep = {
                    let inner = Scope::bind(scope, name, &item);
                    is_truthy(&evaluate(condition, &inner, cache)?)
                };
                if keep {
                    kept.push(item);
                }
            }
            Ok(Value::Array(kept))
        }
        _ => Err(EngineError::malformed("$filter", "input must be an array")),
    }
}

fn map(operand: &Value, scope: &Scope<'_>, cache: &mut RegexCache) -> EngineResult<Value> {
    let args = operand
        .as_object()
        .ok_or_else(|| EngineError::malformed("$map", "expected an object"))?;
    let input = args
        .get("input")
        .ok_or_else(|| EngineError::malformed("$map", "missing input"))?;
    let body = args
        .get("in")
        .ok_or_else(|| EngineError::malformed("$map", "missing in"))?;
    let name = args.get("as").and_then(Value::as_str).unwrap_or("this");

    match evaluate(input, scope, cache)? {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                let inner = Scope::bind(scope, name, item);
                out.push(evaluate(body, &inner, cache)?);
            }
            Ok(Value::Array(out))
        }
        _ => Err(EngineError::malformed("$map", "input must be an array")),
    }
}

/// `$reduce` binds the accumulator as `$$value` and the element as `$$this`
fn reduce(operand: &Value, scope: &Scope<'_>, cache: &mut RegexCache) -> EngineResult<Value> {
    let args = operand
        .as_object()
        .ok_or_else(|| EngineError::malformed("$reduce", "expected an object"))?;
    let input = args
        .get("input")
        .ok_or_else(|| EngineError::malformed("$reduce", "missing input"))?;
    let initial = args
        .get("initialValue")
        .ok_or_else(|| EngineError::malformed("$reduce", "missing initialValue"))?;
    let body = args
        .get("in")
        .ok_or_else(|| EngineError::malformed("$reduce", "missing in"))?;

    match evaluate(input, scope, cache)? {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => {
            let mut accumulator = evaluate(initial, scope, cache)?;
            for item in &items {
                let with_value = Scope::bind(scope, "value", &accumulator);
                let with_this = Scope::bind(&with_value, "this", item);
                let next = evaluate(body, &with_this, cache)?;
                accumulator = next;
            }
            Ok(accumulator)
        }
        _ => Err(EngineError::malformed("$reduce", "input must be an array")),
    }
}

fn regex_match(operand: &Value, scope: &Scope<'_>, cache: &mut RegexCache) -> EngineResult<Value> {
    let args = operand
        .as_object()
        .ok_or_else(|| EngineError::malformed("$regexMatch", "expected an object"))?;
    let pattern = args
        .get("regex")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::malformed("$regexMatch", "regex must be a string"))?;
    let options = args.get("options").and_then(Value::as_str).unwrap_or("");
    let input = match args.get("input") {
        Some(input) => evaluate(input, scope, cache)?,
        None => Value::Null,
    };

    match input {
        Value::Null => Ok(Value::Bool(false)),
        Value::String(text) => Ok(Value::Bool(cache.get(pattern, options)?.is_match(&text))),
        _ => Err(EngineError::malformed("$regexMatch", "input must be a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(document: &Value, expression: Value) -> Value {
        evaluate(&expression, &Scope::root(document), &mut RegexCache::new()).unwrap()
    }

    #[test]
    fn test_field_and_literal() {
        let doc = json!({"a": {"b": "x"}});
        assert_eq!(eval(&doc, json!("$a.b")), json!("x"));
        assert_eq!(eval(&doc, json!("$missing")), Value::Null);
        assert_eq!(eval(&doc, json!({"$literal": "$a"})), json!("$a"));
    }

    #[test]
    fn test_nested_filter_variables() {
        let doc = json!({"sms": [
            {"_id": "sm1", "endpoints": [{"interface": "A"}]},
            {"_id": "sm2", "endpoints": [{"interface": "B"}]},
            {"_id": "sm3"}
        ]});
        let expression = json!({"$filter": {
            "input": "$sms",
            "as": "sm",
            "cond": {"$ne": [
                {"$size": {"$ifNull": [
                    {"$filter": {
                        "input": "$$sm.endpoints",
                        "as": "v0",
                        "cond": {"$eq": ["$$v0.interface", {"$literal": "B"}]}
                    }},
                    []
                ]}},
                0
            ]}
        }});

        let kept = eval(&doc, expression);
        assert_eq!(kept, json!([{"_id": "sm2", "endpoints": [{"interface": "B"}]}]));
    }

    #[test]
    fn test_regex_match_on_missing_input_is_false() {
        let doc = json!({"name": "Motor"});
        assert_eq!(eval(&doc, json!({"$regexMatch": {"input": "$name", "regex": "\\A(?:Mo.*)\\z"}})), json!(true));
        assert_eq!(eval(&doc, json!({"$regexMatch": {"input": "$other", "regex": ".*"}})), json!(false));
    }

    #[test]
    fn test_logical_and_comparison() {
        let doc = json!({"n": 3});
        assert_eq!(eval(&doc, json!({"$and": [{"$gt": ["$n", 2]}, {"$lte": ["$n", 3]}]})), json!(true));
        assert_eq!(eval(&doc, json!({"$or": [false, {"$eq": ["$n", 4]}]})), json!(false));
        assert_eq!(eval(&doc, json!({"$not": [{"$in": ["$n", [1, 2]]}]})), json!(true));
    }

    #[test]
    fn test_map_reduce_flattens_nested_lists() {
        let doc = json!({"sms": [{"eps": ["a", "b"]}, {}, {"eps": ["c"]}]});
        let expression = json!({"$reduce": {
            "input": {"$map": {
                "input": "$sms",
                "as": "sm",
                "in": {"$ifNull": ["$$sm.eps", []]}
            }},
            "initialValue": [],
            "in": {"$concatArrays": ["$$value", "$$this"]}
        }});
        assert_eq!(eval(&doc, expression), json!(["a", "b", "c"]));
    }

    #[test]
    fn test_array_elem_at() {
        let doc = json!({"xs": ["a", "b"]});
        assert_eq!(eval(&doc, json!({"$arrayElemAt": ["$xs", 0]})), json!("a"));
        assert_eq!(eval(&doc, json!({"$arrayElemAt": ["$xs", -1]})), json!("b"));
        assert_eq!(eval(&doc, json!({"$arrayElemAt": ["$xs", 5]})), Value::Null);
        assert_eq!(eval(&doc, json!({"$arrayElemAt": ["$missing", 0]})), Value::Null);
    }

    #[test]
    fn test_unknown_variable_fails() {
        let doc = json!({});
        let err = evaluate(&json!("$$nope.x"), &Scope::root(&doc), &mut RegexCache::new()).unwrap_err();
        assert!(matches!(err, EngineError::Malformed { .. }));
    }
}
