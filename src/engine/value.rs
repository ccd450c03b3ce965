//! Document value helpers: path lookup, ordering, equality, regex cache

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use regex::Regex;
use serde_json::{Map, Value};

use super::errors::{EngineError, EngineResult};

// ==================
// Path Lookup
// ==================

/// Values reachable along a dotted path with query semantics.
///
/// Arrays met on the way are traversed element-wise; a numeric segment also
/// indexes into an array.
pub fn query_values<'a>(document: &'a Value, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    collect_query_values(document, &segments, &mut out);
    out
}

fn collect_query_values<'a>(value: &'a Value, segments: &[&str], out: &mut Vec<&'a Value>) {
    let Some((head, rest)) = segments.split_first() else {
        out.push(value);
        return;
    };

    match value {
        Value::Object(map) => {
            if let Some(child) = map.get(*head) {
                collect_query_values(child, rest, out);
            }
        }
        Value::Array(items) => {
            if let Ok(index) = head.parse::<usize>() {
                if let Some(item) = items.get(index) {
                    collect_query_values(item, rest, out);
                }
            }
            for item in items.iter().filter(|item| item.is_object()) {
                collect_query_values(item, segments, out);
            }
        }
        _ => {}
    }
}

/// Candidate values plus the elements of array candidates
pub fn expand<'a>(values: &[&'a Value]) -> Vec<&'a Value> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        out.push(*value);
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
    }
    out
}

/// Resolves a field path with expression semantics: a path through an array
/// of objects yields the array of the values found in its elements.
pub fn expr_path(value: &Value, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    walk_expr_path(value, &segments)
}

fn walk_expr_path(value: &Value, segments: &[&str]) -> Option<Value> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(value.clone());
    };

    match value {
        Value::Object(map) => map.get(*head).and_then(|child| walk_expr_path(child, rest)),
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .filter(|item| item.is_object())
                .filter_map(|item| walk_expr_path(item, segments))
                .collect(),
        )),
        _ => None,
    }
}

/// Follows object fields only
pub fn get_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |value, segment| value.as_object()?.get(segment))
}

/// Sets a dotted path, creating missing objects. Numeric segments index
/// into existing arrays.
pub fn set_path(document: &mut Value, path: &str, new_value: Value) -> EngineResult<()> {
    let segments: Vec<&str> = path.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return Err(EngineError::malformed("field path", "empty path"));
    };

    let mut current = document;
    for segment in parents {
        current = child_mut(current, segment, path)?;
    }

    match current {
        Value::Object(map) => {
            map.insert(last.to_string(), new_value);
            Ok(())
        }
        Value::Array(items) => {
            let slot = last
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get_mut(index))
                .ok_or_else(|| EngineError::malformed("field path", format!("no element '{}' in '{}'", last, path)))?;
            *slot = new_value;
            Ok(())
        }
        _ => Err(EngineError::malformed(
            "field path",
            format!("cannot set '{}' inside a scalar", path),
        )),
    }
}

/// Mutable access to a dotted path that must already exist
pub fn get_path_mut<'a>(document: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.').try_fold(document, |value, segment| match value {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    })
}

fn child_mut<'a>(value: &'a mut Value, segment: &str, path: &str) -> EngineResult<&'a mut Value> {
    match value {
        Value::Object(map) => Ok(map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()))),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|index| items.get_mut(index))
            .ok_or_else(|| EngineError::malformed("field path", format!("no element '{}' in '{}'", segment, path))),
        _ => Err(EngineError::malformed(
            "field path",
            format!("cannot traverse a scalar at '{}' in '{}'", segment, path),
        )),
    }
}

// ==================
// Ordering & Equality
// ==================

/// Canonical type order: null and missing, numbers, strings, objects,
/// arrays, booleans
fn type_order(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

/// True when both values fall in the same comparison bracket
pub fn same_type(a: &Value, b: &Value) -> bool {
    type_order(Some(a)) == type_order(Some(b))
}

/// Total order over document values; a missing value orders as null
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (a_type, b_type) = (type_order(a), type_order(b));
    if a_type != b_type {
        return a_type.cmp(&b_type);
    }

    match (a, b) {
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Array(a)), Some(Value::Array(b))) => a
            .iter()
            .zip(b)
            .map(|(a, b)| compare_values(Some(a), Some(b)))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        (Some(Value::Object(a)), Some(Value::Object(b))) => a
            .iter()
            .zip(b)
            .map(|((a_key, a_val), (b_key, b_val))| {
                a_key
                    .cmp(b_key)
                    .then_with(|| compare_values(Some(a_val), Some(b_val)))
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len())),
        _ => Ordering::Equal,
    }
}

/// Equality with numbers compared by value
pub fn values_equal(a: &Value, b: &Value) -> bool {
    same_type(a, b) && compare_values(Some(a), Some(b)) == Ordering::Equal
}

pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
        _ => true,
    }
}

// ==================
// Regex Cache
// ==================

/// Compiled patterns for the duration of one collection call
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: HashMap<(String, String), Regex>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `pattern` with the `imsx` subset of options
    pub fn get(&mut self, pattern: &str, options: &str) -> EngineResult<&Regex> {
        match self.compiled.entry((pattern.to_string(), options.to_string())) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => Ok(&*entry.insert(build_regex(pattern, options)?)),
        }
    }
}

fn build_regex(pattern: &str, options: &str) -> EngineResult<Regex> {
    let invalid = |reason: String| EngineError::InvalidRegex {
        pattern: pattern.to_string(),
        reason,
    };

    let mut flags = String::new();
    for option in options.chars() {
        match option {
            'i' | 'm' | 's' | 'x' => flags.push(option),
            other => return Err(invalid(format!("unsupported option '{}'", other))),
        }
    }

    let source = if flags.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{}){}", flags, pattern)
    };
    Regex::new(&source).map_err(|e| invalid(e.to_string()))
}
