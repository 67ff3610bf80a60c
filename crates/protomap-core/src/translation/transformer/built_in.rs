//! Built-in function transforms
//!
//! These are the statically compiled, pure value transformers available to
//! `function` transforms by name. Each takes the current value and context
//! and returns the transformed value.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use super::types::{FunctionError, TransformContext, TransformFn};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Number, Value};

/// Every built-in function with its registry name
pub const ALL: &[(&str, TransformFn)] = &[
    ("identity", identity),
    ("to_string", to_string),
    ("to_number", to_number),
    ("to_boolean", to_boolean),
    ("trim", trim),
    ("json_stringify", json_stringify),
    ("json_parse", json_parse),
    ("flatten_content", flatten_content),
    ("messages_to_prompt", messages_to_prompt),
    ("unix_to_iso8601", unix_to_iso8601),
    ("iso8601_to_unix", iso8601_to_unix),
    ("first_element", first_element),
    ("wrap_array", wrap_array),
    ("array_length", array_length),
];

pub fn identity(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    Ok(value.clone())
}

/// Render scalars as strings; strings pass through
pub fn to_string(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Null => Ok(Value::String(String::new())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        other => Err(FunctionError::new(format!(
            "cannot convert {} to string",
            kind_of(other)
        ))),
    }
}

pub fn to_number(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::Bool(b) => Ok(Value::from(u8::from(*b))),
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                return Ok(Value::from(n));
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| FunctionError::new(format!("'{}' is not a number", s)))
        }
        other => Err(FunctionError::new(format!(
            "cannot convert {} to number",
            kind_of(other)
        ))),
    }
}

pub fn to_boolean(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::Bool(n.as_f64().map_or(false, |f| f != 0.0))),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => Ok(Value::Bool(true)),
            "false" | "no" | "0" | "off" | "" => Ok(Value::Bool(false)),
            _ => Err(FunctionError::new(format!("'{}' is not a boolean", s))),
        },
        Value::Null => Ok(Value::Bool(false)),
        other => Err(FunctionError::new(format!(
            "cannot convert {} to boolean",
            kind_of(other)
        ))),
    }
}

pub fn trim(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    Ok(match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        other => other.clone(),
    })
}

pub fn json_stringify(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    serde_json::to_string(value)
        .map(Value::String)
        .map_err(|e| FunctionError::new(e.to_string()))
}

pub fn json_parse(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    match value {
        Value::String(s) => serde_json::from_str(s)
            .map_err(|e| FunctionError::new(format!("invalid JSON text: {}", e))),
        other => Ok(other.clone()),
    }
}

/// Collapse multi-part message content into plain text
///
/// Text parts are joined with newlines; non-text parts are dropped. String
/// content passes through.
pub fn flatten_content(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    match value {
        Value::Array(parts) => {
            let text = parts
                .iter()
                .filter_map(|part| match part {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(obj) => obj.get("text").and_then(Value::as_str),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            Ok(Value::String(text))
        }
        Value::Null => Ok(Value::String(String::new())),
        other => Ok(other.clone()),
    }
}

/// Render a chat message array as a single `role: content` transcript
pub fn messages_to_prompt(value: &Value, ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    let messages = value
        .as_array()
        .ok_or_else(|| FunctionError::new(format!("expected array, got {}", kind_of(value))))?;

    let mut lines = Vec::with_capacity(messages.len());
    for message in messages {
        let role = message.get("role").and_then(Value::as_str).unwrap_or("user");
        let content = match message.get("content") {
            Some(content) => flatten_content(content, ctx)?,
            None => Value::String(String::new()),
        };
        lines.push(format!("{}: {}", role, content.as_str().unwrap_or_default()));
    }
    Ok(Value::String(lines.join("\n")))
}

/// Unix seconds to an RFC 3339 timestamp
pub fn unix_to_iso8601(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    let seconds = value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .ok_or_else(|| FunctionError::new(format!("expected unix seconds, got {}", value)))?;
    Utc.timestamp_opt(seconds, 0)
        .single()
        .map(|dt| Value::String(dt.to_rfc3339()))
        .ok_or_else(|| FunctionError::new(format!("timestamp {} out of range", seconds)))
}

/// RFC 3339 timestamp to unix seconds
pub fn iso8601_to_unix(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    let text = value
        .as_str()
        .ok_or_else(|| FunctionError::new(format!("expected timestamp string, got {}", value)))?;
    DateTime::parse_from_rfc3339(text)
        .map(|dt| Value::from(dt.timestamp()))
        .map_err(|e| FunctionError::new(format!("invalid timestamp '{}': {}", text, e)))
}

pub fn first_element(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    Ok(match value {
        Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
        other => other.clone(),
    })
}

pub fn wrap_array(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    Ok(match value {
        Value::Array(_) => value.clone(),
        Value::Null => Value::Array(Vec::new()),
        other => Value::Array(vec![other.clone()]),
    })
}

pub fn array_length(value: &Value, _ctx: &TransformContext<'_>) -> Result<Value, FunctionError> {
    value
        .as_array()
        .map(|items| Value::from(items.len()))
        .ok_or_else(|| FunctionError::new(format!("expected array, got {}", kind_of(value))))
}

fn kind_of(value: &Value) -> &'static str {
    crate::types::ValueKind::describe(value)
}
