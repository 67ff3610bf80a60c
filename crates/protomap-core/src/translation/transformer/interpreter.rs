//! Transform interpreter
//!
//! Executes table transform definitions against a value and a context,
//! dispatching on the definition's `type`. Definitions compose: an
//! `array_transform` may map every element through an `object_transform`
//! whose fields reference other named transforms. Nesting is bounded by
//! `MAX_TRANSFORM_DEPTH`.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use super::registry::FunctionRegistry;
use super::types::{
    ObjectFieldSpec, StringOperation, TransformContext, TransformDefinition, TransformRef,
    MAX_TRANSFORM_DEPTH,
};
use crate::error::{Constraint, Error};
use crate::translation::validator::patterns::{is_global, PatternCache, DEFAULT_REPLACE_FLAGS};
use crate::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Tolerance used when comparing sums in `sum_equals_total`
const SUM_EPSILON: f64 = 1e-9;

/// Interpreter bound to one table's transforms, function registry and regexes
#[derive(Debug, Clone, Copy)]
pub struct TransformInterpreter<'t> {
    transforms: &'t HashMap<String, TransformDefinition>,
    registry: &'t FunctionRegistry,
    patterns: &'t PatternCache,
}

impl<'t> TransformInterpreter<'t> {
    pub fn new(
        transforms: &'t HashMap<String, TransformDefinition>,
        registry: &'t FunctionRegistry,
        patterns: &'t PatternCache,
    ) -> Self {
        Self {
            transforms,
            registry,
            patterns,
        }
    }

    /// Resolve a named transform from the owning table
    pub fn resolve(&self, name: &str) -> Result<&'t TransformDefinition> {
        self.transforms.get(name).ok_or_else(|| {
            Error::unknown_transform(name, Some("not defined in transformFunctions".to_string()))
        })
    }

    /// Apply the named transform to `value`
    pub fn apply(&self, name: &str, value: &Value, ctx: &TransformContext<'_>) -> Result<Value> {
        let definition = self.resolve(name)?;
        self.apply_definition(definition, value, ctx)
    }

    /// Apply a definition to `value`, dispatching on its type
    pub fn apply_definition(
        &self,
        definition: &TransformDefinition,
        value: &Value,
        ctx: &TransformContext<'_>,
    ) -> Result<Value> {
        if ctx.depth >= MAX_TRANSFORM_DEPTH {
            return Err(Error::configuration(format!(
                "Transform nesting for field '{}' exceeds the maximum depth of {}",
                ctx.field, MAX_TRANSFORM_DEPTH
            )));
        }

        match definition {
            TransformDefinition::Mapping {
                mappings,
                default_value,
            } => Ok(apply_mapping(mappings, default_value.as_ref(), value)),
            TransformDefinition::StringTransform {
                operation,
                value: operand,
                pattern,
                replacement,
                flags,
            } => self.apply_string(
                *operation,
                operand.as_deref(),
                pattern.as_deref(),
                replacement.as_deref(),
                flags.as_deref(),
                value,
            ),
            TransformDefinition::ArrayTransform { element_transform } => {
                self.apply_array(element_transform, value, ctx)
            }
            TransformDefinition::ObjectTransform { fields } => self.apply_object(fields, value, ctx),
            TransformDefinition::Function { function } => self.apply_function(function, value, ctx),
            TransformDefinition::Validation { rule, fields } => {
                apply_validation(rule, fields, value, ctx)?;
                Ok(value.clone())
            }
        }
    }

    /// Apply a named or inline transform reference
    pub fn apply_ref(&self, reference: &TransformRef, value: &Value, ctx: &TransformContext<'_>) -> Result<Value> {
        match reference {
            TransformRef::Named(name) => self.apply(name, value, ctx),
            TransformRef::Inline(definition) => self.apply_definition(definition, value, ctx),
        }
    }

    fn apply_string(
        &self,
        operation: StringOperation,
        operand: Option<&str>,
        pattern: Option<&str>,
        replacement: Option<&str>,
        flags: Option<&str>,
        value: &Value,
    ) -> Result<Value> {
        let Some(text) = value.as_str() else {
            return Ok(value.clone());
        };

        let result = match operation {
            StringOperation::Prefix => format!("{}{}", operand.unwrap_or_default(), text),
            StringOperation::Suffix => format!("{}{}", text, operand.unwrap_or_default()),
            StringOperation::Uppercase => text.to_uppercase(),
            StringOperation::Lowercase => text.to_lowercase(),
            StringOperation::Replace => {
                let Some(pattern) = pattern else {
                    return Ok(value.clone());
                };
                let flags = flags.unwrap_or(DEFAULT_REPLACE_FLAGS);
                let regex = self.patterns.get(pattern, flags)?;
                let replacement = replacement.unwrap_or_default();
                if is_global(flags) {
                    regex.replace_all(text, replacement).into_owned()
                } else {
                    regex.replace(text, replacement).into_owned()
                }
            }
        };
        Ok(Value::String(result))
    }

    fn apply_array(&self, element_transform: &TransformRef, value: &Value, ctx: &TransformContext<'_>) -> Result<Value> {
        let Value::Array(items) = value else {
            return Ok(value.clone());
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let element_ctx = ctx.for_element(index, item);
                self.apply_ref(element_transform, item, &element_ctx)
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::Array)
    }

    fn apply_object(
        &self,
        fields: &[(String, ObjectFieldSpec)],
        value: &Value,
        ctx: &TransformContext<'_>,
    ) -> Result<Value> {
        let Value::Object(input) = value else {
            return Ok(value.clone());
        };

        let mut output = Map::new();
        for (name, spec) in fields {
            let target = spec.target(name).to_string();
            let Some(field_value) = input.get(name) else {
                match spec {
                    ObjectFieldSpec::Detailed(detail) if detail.default_value.is_some() => {
                        output.insert(target, detail.default_value.clone().unwrap_or(Value::Null));
                    }
                    _ if spec.is_required() => {
                        return Err(Error::RequiredFieldMissing {
                            field: ctx.qualify(name),
                        });
                    }
                    _ => {}
                }
                continue;
            };

            let mapped = match spec {
                ObjectFieldSpec::Target(_) => field_value.clone(),
                ObjectFieldSpec::Detailed(detail) => {
                    let mut current = match &detail.mapping {
                        Some(mappings) => apply_mapping(mappings, None, field_value),
                        None => field_value.clone(),
                    };
                    if let Some(reference) = &detail.transform {
                        let field_ctx = ctx.for_field(value, name);
                        current = self.apply_ref(reference, &current, &field_ctx)?;
                    }
                    current
                }
            };
            output.insert(target, mapped);
        }
        Ok(Value::Object(output))
    }

    fn apply_function(&self, function: &str, value: &Value, ctx: &TransformContext<'_>) -> Result<Value> {
        let f = self.registry.get(function).ok_or_else(|| {
            Error::unknown_transform(function, Some("no such registered function".to_string()))
        })?;
        f(value, ctx).map_err(|e| Error::TransformExecution {
            transform: function.to_string(),
            message: e.to_string(),
        })
    }
}

/// Literal lookup of a value's key in `mappings`
///
/// Strings are looked up directly; other scalars by their JSON text.
pub fn apply_mapping(mappings: &Map<String, Value>, default_value: Option<&Value>, value: &Value) -> Value {
    let key = match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(_) | Value::Bool(_) | Value::Null => Some(value.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    };

    key.and_then(|k| mappings.get(&k))
        .or(default_value)
        .cloned()
        .unwrap_or_else(|| value.clone())
}

fn apply_validation(rule: &str, fields: &[String], value: &Value, ctx: &TransformContext<'_>) -> Result<()> {
    match rule {
        "sum_equals_total" => {
            let total = value.as_f64().ok_or_else(|| {
                Error::validation(
                    ctx.field,
                    Constraint::Rule(rule.to_string()),
                    format!("Expected a numeric total, got {}", value),
                )
            })?;
            let sum: f64 = fields
                .iter()
                .filter_map(|name| ctx.lookup(name).and_then(Value::as_f64))
                .sum();
            if (sum - total).abs() > SUM_EPSILON {
                return Err(Error::validation(
                    ctx.field,
                    Constraint::Rule(rule.to_string()),
                    format!("Sum of [{}] is {} but total is {}", fields.join(", "), sum, total),
                ));
            }
            Ok(())
        }
        "all_present" => {
            let missing: Vec<&str> = fields
                .iter()
                .filter(|name| ctx.parent.get(name.as_str()).is_none())
                .map(String::as_str)
                .collect();
            if missing.is_empty() {
                Ok(())
            } else {
                Err(Error::validation(
                    ctx.field,
                    Constraint::Rule(rule.to_string()),
                    format!("Missing fields: {}", missing.join(", ")),
                ))
            }
        }
        other => Err(Error::unknown_transform(
            other,
            Some("unknown validation rule".to_string()),
        )),
    }
}
