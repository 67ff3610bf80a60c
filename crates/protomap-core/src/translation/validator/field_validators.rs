//! Field-level constraint checks
//!
//! A `validation` block on a field mapping is evaluated in a fixed order and
//! stops at the first failure: empty-value rejection, string length, numeric
//! range, enumeration membership, then regex pattern.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use super::patterns::PatternCache;
use super::ValidationError;
use crate::error::Constraint;
use crate::types::{FieldValidation, ValueKind};
use crate::Result;
use serde_json::Value;

/// `null`, `""` and `[]` count as empty
pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Evaluate one constraint block against a value
///
/// Returns the first violated constraint, if any. An empty value accepted by
/// `allowEmpty` passes without running the remaining checks.
pub fn validate_field(
    field: &str,
    value: &Value,
    validation: &FieldValidation,
    patterns: &PatternCache,
) -> Result<Option<ValidationError>> {
    if is_empty(value) {
        if validation.allow_empty {
            return Ok(None);
        }
        return Ok(Some(
            ValidationError::new(field, Constraint::Empty, "Value must not be empty")
                .actual(value.to_string()),
        ));
    }

    if let Some(violation) = validate_length(field, value, validation) {
        return Ok(Some(violation));
    }

    if let Some(violation) = validate_range(field, value, validation) {
        return Ok(Some(violation));
    }

    if let Some(violation) = validate_allowed(field, value, validation) {
        return Ok(Some(violation));
    }

    validate_pattern(field, value, validation, patterns)
}

fn validate_length(field: &str, value: &Value, validation: &FieldValidation) -> Option<ValidationError> {
    let text = value.as_str()?;
    let length = text.chars().count();

    if let Some(min_length) = validation.min_length {
        if length < min_length {
            return Some(
                ValidationError::new(
                    field,
                    Constraint::MinLength,
                    format!("String is shorter than {} characters", min_length),
                )
                .expected(format!("≥ {} characters", min_length))
                .actual(format!("{} characters", length)),
            );
        }
    }

    if let Some(max_length) = validation.max_length {
        if length > max_length {
            return Some(
                ValidationError::new(
                    field,
                    Constraint::MaxLength,
                    format!("String exceeds maximum length of {} characters", max_length),
                )
                .expected(format!("≤ {} characters", max_length))
                .actual(format!("{} characters", length)),
            );
        }
    }

    None
}

fn validate_range(field: &str, value: &Value, validation: &FieldValidation) -> Option<ValidationError> {
    let number = value.as_f64()?;

    if let Some(min) = validation.min {
        if number < min {
            return Some(
                ValidationError::new(field, Constraint::Min, format!("{} is below minimum {}", value, min))
                    .expected(format!("≥ {}", min))
                    .actual(value.to_string()),
            );
        }
    }

    if let Some(max) = validation.max {
        if number > max {
            return Some(
                ValidationError::new(field, Constraint::Max, format!("{} exceeds maximum {}", value, max))
                    .expected(format!("≤ {}", max))
                    .actual(value.to_string()),
            );
        }
    }

    None
}

fn validate_allowed(field: &str, value: &Value, validation: &FieldValidation) -> Option<ValidationError> {
    let allowed = validation.allowed.as_ref()?;
    if allowed.iter().any(|candidate| values_equal(candidate, value)) {
        return None;
    }

    let listed = allowed
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Some(
        ValidationError::new(field, Constraint::Allowed, format!("{} is not an allowed value", value))
            .expected(format!("one of: {}", listed))
            .actual(value.to_string()),
    )
}

fn validate_pattern(
    field: &str,
    value: &Value,
    validation: &FieldValidation,
    patterns: &PatternCache,
) -> Result<Option<ValidationError>> {
    let (Some(pattern), Some(text)) = (validation.pattern.as_deref(), value.as_str()) else {
        return Ok(None);
    };

    let regex = patterns.get(pattern, "")?;
    if regex.is_match(text) {
        return Ok(None);
    }

    Ok(Some(
        ValidationError::new(field, Constraint::Pattern, format!("Value does not match pattern {}", pattern))
            .expected(format!("match for /{}/", pattern))
            .actual(format!("\"{}\"", text)),
    ))
}

/// Strict equality, treating `1` and `1.0` as the same number
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Violation for a value whose kind does not match the declared kind
pub fn type_mismatch(field: &str, expected: ValueKind, value: &Value) -> ValidationError {
    ValidationError::new(
        field,
        Constraint::Type,
        format!("Expected {}, got {}", expected, ValueKind::describe(value)),
    )
    .expected(expected.to_string())
    .actual(ValueKind::describe(value))
}
