//! Document-level constraint checks
//!
//! These checks run against the whole input object: required and typed
//! top-level fields, forbidden key names anywhere in the document, and the
//! nesting depth and array length ceilings.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use super::field_validators::type_mismatch;
use super::ValidationError;
use crate::error::Constraint;
use crate::types::ValueKind;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Every name in `required` must be a top-level key of `data`
pub fn validate_required(data: &Map<String, Value>, required: &[String]) -> Vec<ValidationError> {
    required
        .iter()
        .filter(|field| !data.contains_key(field.as_str()))
        .map(|field| {
            ValidationError::new(field.as_str(), Constraint::Required, "Required field is missing")
                .expected("field to be present")
        })
        .collect()
}

/// Present top-level fields must have their declared kind
pub fn validate_types(
    data: &Map<String, Value>,
    types: &BTreeMap<String, ValueKind>,
) -> Vec<ValidationError> {
    types
        .iter()
        .filter_map(|(field, kind)| {
            let value = data.get(field)?;
            (!kind.matches(value)).then(|| type_mismatch(field, *kind, value))
        })
        .collect()
}

/// No object key anywhere in `value` may be one of `forbidden`
pub fn validate_forbidden_fields(
    value: &Value,
    forbidden: &[String],
    stop_at_first: bool,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if !forbidden.is_empty() {
        walk(value, "", &mut |path, node| {
            if let Value::Object(map) = node {
                for key in map.keys() {
                    if forbidden.iter().any(|name| name == key) {
                        errors.push(
                            ValidationError::new(
                                join_path(path, key),
                                Constraint::Forbidden,
                                format!("Field name '{}' is forbidden", key),
                            )
                            .actual(key.clone()),
                        );
                        if stop_at_first {
                            return false;
                        }
                    }
                }
            }
            true
        });
    }
    errors
}

/// Nesting of objects and arrays must not exceed `max_depth`
///
/// A scalar has depth 0 and `{"a": 1}` has depth 1.
pub fn validate_depth(value: &Value, max_depth: usize) -> Option<ValidationError> {
    let depth = nesting_depth(value, max_depth + 1);
    (depth > max_depth).then(|| {
        ValidationError::new("$", Constraint::MaxDepth, "Input nesting is too deep")
            .expected(format!("≤ {} levels", max_depth))
            .actual(format!("more than {} levels", max_depth))
    })
}

/// No array anywhere in `value` may be longer than `max_length`
pub fn validate_array_lengths(
    value: &Value,
    max_length: usize,
    stop_at_first: bool,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    walk(value, "", &mut |path, node| {
        if let Value::Array(items) = node {
            if items.len() > max_length {
                errors.push(
                    ValidationError::new(
                        if path.is_empty() { "$" } else { path },
                        Constraint::MaxArrayLength,
                        "Array is too long",
                    )
                    .expected(format!("≤ {} elements", max_length))
                    .actual(format!("{} elements", items.len())),
                );
                if stop_at_first {
                    return false;
                }
            }
        }
        true
    });
    errors
}

/// Depth of `value`, counting no further than `limit`
fn nesting_depth(value: &Value, limit: usize) -> usize {
    if limit == 0 {
        return 0;
    }
    let children: Box<dyn Iterator<Item = &Value>> = match value {
        Value::Object(map) => Box::new(map.values()),
        Value::Array(items) => Box::new(items.iter()),
        _ => return 0,
    };
    1 + children
        .map(|child| nesting_depth(child, limit - 1))
        .max()
        .unwrap_or(0)
}

/// Pre-order walk; the visitor returns false to stop
fn walk<F>(value: &Value, path: &str, visit: &mut F) -> bool
where
    F: FnMut(&str, &Value) -> bool,
{
    if !visit(path, value) {
        return false;
    }
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if !walk(child, &join_path(path, key), visit) {
                    return false;
                }
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                if !walk(child, &format!("{}[{}]", path, index), visit) {
                    return false;
                }
            }
        }
        _ => {}
    }
    true
}

fn join_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}
