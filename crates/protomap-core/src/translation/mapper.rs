//! Field mapping applier
//!
//! Walks a mapping table's field entries against an input object in
//! declaration order, running each present value through its transform and
//! validation block and writing the result at its dot-separated target path.
//! Application is a pure function of `(data, table, options)`.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use super::table::MappingTable;
use super::transformer::TransformContext;
use super::validator::{ValidationMode, Validator};
use crate::error::{Constraint, Error};
use crate::types::{FieldMappingEntry, ModuleConfig, ValidationRules, ValueKind};
use crate::Result;
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Switches controlling how fields outside the table are treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Copy unmapped top-level input fields into the output unchanged
    pub preserve_unknown_fields: bool,
    /// Reject unmapped top-level input fields when they are not preserved
    pub strict_mapping: bool,
}

impl From<&ModuleConfig> for ApplyOptions {
    fn from(config: &ModuleConfig) -> Self {
        Self {
            preserve_unknown_fields: config.preserve_unknown_fields,
            strict_mapping: config.strict_mapping,
        }
    }
}

/// Applies one mapping table to input objects
#[derive(Debug, Clone, Copy)]
pub struct FieldMappingApplier<'t> {
    table: &'t MappingTable,
}

impl<'t> FieldMappingApplier<'t> {
    pub fn new(table: &'t MappingTable) -> Self {
        Self { table }
    }

    /// Convert `data`, failing on the first unrecoverable violation
    pub fn apply(&self, data: &Value, options: &ApplyOptions) -> Result<Value> {
        let input = require_object(data)?;

        let validator = Validator::new(self.table.patterns());
        Validator::enforce(validator.table_violations(input, &self.table_rules()))?;

        if options.strict_mapping && !options.preserve_unknown_fields {
            if let Some(field) = self.unmapped_fields(input).into_iter().next() {
                return Err(unmapped(&field));
            }
        }

        let mut output = Value::Object(Map::new());
        for entry in self.table.entries() {
            if let Some(value) = self.map_entry(entry, data, input, &validator)? {
                set_path(&mut output, &entry.mapping.target_field, value);
            }
        }

        if options.preserve_unknown_fields {
            if let Value::Object(out) = &mut output {
                for (key, value) in input {
                    if !self.table.is_known_field(key) {
                        out.insert(key.clone(), value.clone());
                    }
                }
            }
        }

        Ok(output)
    }

    /// Every violation `apply` could raise, without stopping at the first
    pub fn collect_errors(&self, data: &Value, options: &ApplyOptions) -> Vec<Error> {
        let input = match require_object(data) {
            Ok(input) => input,
            Err(err) => return vec![err],
        };

        let validator = Validator::with_mode(self.table.patterns(), ValidationMode::Lenient);
        let mut errors: Vec<Error> = validator
            .table_violations(input, &self.table_rules())
            .into_iter()
            .map(Error::from)
            .collect();

        if options.strict_mapping && !options.preserve_unknown_fields {
            errors.extend(self.unmapped_fields(input).iter().map(|field| unmapped(field)));
        }

        for entry in self.table.entries() {
            if let Err(err) = self.map_entry(entry, data, input, &validator) {
                errors.push(err);
            }
        }
        errors
    }

    /// Table rules minus `required` fields a required entry without a default
    /// already enforces, so a missing one surfaces as `RequiredFieldMissing`
    fn table_rules(&self) -> Cow<'t, ValidationRules> {
        let rules = self.table.validation_rules();
        let enforced_by_entry = |field: &String| {
            self.table.entries().iter().any(|entry| {
                entry.source_field == *field && entry.mapping.required && entry.mapping.default_value.is_none()
            })
        };
        if !rules.required.iter().any(enforced_by_entry) {
            return Cow::Borrowed(rules);
        }

        let mut trimmed = rules.clone();
        trimmed.required.retain(|field| !enforced_by_entry(field));
        Cow::Owned(trimmed)
    }

    /// Top-level input fields no entry covers, in input order
    pub fn unmapped_fields(&self, input: &Map<String, Value>) -> Vec<String> {
        input
            .keys()
            .filter(|key| !self.table.is_known_field(key))
            .cloned()
            .collect()
    }

    /// Value to write for one entry, or `None` when nothing is written
    fn map_entry(
        &self,
        entry: &FieldMappingEntry,
        root: &Value,
        input: &Map<String, Value>,
        validator: &Validator<'_>,
    ) -> Result<Option<Value>> {
        let source = entry.source_field.as_str();
        let mapping = &entry.mapping;

        let Some(value) = read_source(input, source) else {
            if let Some(default_value) = &mapping.default_value {
                tracing::debug!(field = source, target = %mapping.target_field, "Writing default value");
                return Ok(Some(default_value.clone()));
            }
            if mapping.required {
                return Err(Error::RequiredFieldMissing {
                    field: source.to_string(),
                });
            }
            return Ok(None);
        };

        let transformed = match &mapping.transform {
            Some(name) => {
                let ctx = TransformContext::new(root, source);
                self.table.interpreter().apply(name, value, &ctx)?
            }
            None => value.clone(),
        };

        if let Some(validation) = &mapping.validation {
            validator.check_field(source, &transformed, validation)?;
        }

        tracing::debug!(
            field = source,
            target = %mapping.target_field,
            transform = mapping.transform.as_deref().unwrap_or("-"),
            "Mapped field"
        );
        Ok(Some(transformed))
    }
}

fn require_object(data: &Value) -> Result<&Map<String, Value>> {
    data.as_object().ok_or_else(|| {
        Error::validation(
            "$",
            Constraint::Type,
            format!("Input must be a JSON object, got {}", ValueKind::describe(data)),
        )
    })
}

fn unmapped(field: &str) -> Error {
    Error::validation(
        field,
        Constraint::Unmapped,
        "Field is not declared in the mapping table",
    )
}

/// Read a source field by exact key, then as a dot path
pub fn read_source<'a>(input: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    if let Some(value) = input.get(field) {
        return Some(value);
    }
    if !field.contains('.') {
        return None;
    }
    let mut segments = field.split('.');
    let first = segments.next()?;
    segments.try_fold(input.get(first)?, |current, segment| current.as_object()?.get(segment))
}

/// Write `value` at a dot-separated path
///
/// Intermediate objects are created as needed; an intermediate value that is
/// not an object is replaced by one. Writing the same leaf twice keeps the
/// last value.
pub fn set_path(target: &mut Value, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = target;
    while let Some(segment) = segments.next() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Read a dot-separated path from any value
pub fn get_path<'a>(source: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(source, |current, segment| current.as_object()?.get(segment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(document: Value) -> MappingTable {
        MappingTable::from_value("test", &document).unwrap()
    }

    fn simple_table() -> MappingTable {
        table(json!({
            "version": "1.0",
            "description": "test",
            "formats": {"source": "openai", "target": "dashscope"},
            "fieldMappings": {"model": "model", "messages": "input.messages"}
        }))
    }

    #[test]
    fn test_concrete_example() {
        let input = json!({"model": "gpt-4", "messages": [{"role": "user", "content": "hi"}]});
        let out = FieldMappingApplier::new(&simple_table())
            .apply(&input, &ApplyOptions::default())
            .unwrap();
        assert_eq!(
            out,
            json!({"model": "gpt-4", "input": {"messages": [{"role": "user", "content": "hi"}]}})
        );
    }

    #[test]
    fn test_set_path_keeps_siblings_and_replaces_scalars() {
        let mut out = json!({});
        set_path(&mut out, "input.messages", json!([1]));
        set_path(&mut out, "input.other", json!(2));
        assert_eq!(out, json!({"input": {"messages": [1], "other": 2}}));

        set_path(&mut out, "input.other.deep", json!(3));
        assert_eq!(out, json!({"input": {"messages": [1], "other": {"deep": 3}}}));
    }

    #[test]
    fn test_read_source_prefers_exact_key() {
        let input = json!({"a.b": 1, "a": {"b": 2}});
        let map = input.as_object().unwrap();
        assert_eq!(read_source(map, "a.b"), Some(&json!(1)));

        let nested = json!({"a": {"b": 2}});
        assert_eq!(read_source(nested.as_object().unwrap(), "a.b"), Some(&json!(2)));
        assert_eq!(get_path(&nested, "a.c"), None);
    }

    #[test]
    fn test_non_object_input_rejected() {
        let err = FieldMappingApplier::new(&simple_table())
            .apply(&json!([1, 2]), &ApplyOptions::default())
            .unwrap_err();
        assert_eq!(err.field(), Some("$"));
        assert_eq!(err.constraint(), Some(&Constraint::Type));
    }

    #[test]
    fn test_unknown_fields_dropped_preserved_or_rejected() {
        let applier_table = simple_table();
        let applier = FieldMappingApplier::new(&applier_table);
        let input = json!({"model": "m", "x_vendor": true});

        let dropped = applier.apply(&input, &ApplyOptions::default()).unwrap();
        assert_eq!(dropped, json!({"model": "m"}));

        let preserve = ApplyOptions {
            preserve_unknown_fields: true,
            strict_mapping: false,
        };
        let kept = applier.apply(&input, &preserve).unwrap();
        assert_eq!(kept, json!({"model": "m", "x_vendor": true}));

        let strict = ApplyOptions {
            preserve_unknown_fields: false,
            strict_mapping: true,
        };
        let err = applier.apply(&input, &strict).unwrap_err();
        assert_eq!(err.field(), Some("x_vendor"));
        assert_eq!(err.constraint(), Some(&Constraint::Unmapped));
    }

    #[test]
    fn test_required_and_default() {
        let t = table(json!({
            "version": "1.0",
            "description": "test",
            "formats": {"source": "a", "target": "b"},
            "fieldMappings": {
                "model": {"targetField": "model", "required": true},
                "stream": {"targetField": "parameters.stream", "defaultValue": false}
            }
        }));
        let applier = FieldMappingApplier::new(&t);

        let err = applier.apply(&json!({}), &ApplyOptions::default()).unwrap_err();
        assert!(matches!(err, Error::RequiredFieldMissing { ref field } if field == "model"));

        let out = applier.apply(&json!({"model": "m"}), &ApplyOptions::default()).unwrap();
        assert_eq!(out, json!({"model": "m", "parameters": {"stream": false}}));
    }

    #[test]
    fn test_forbidden_field_rejected_before_mapping() {
        let input = json!({"model": "m", "messages": [{"role": "user", "__proto__": {}}]});
        let err = FieldMappingApplier::new(&simple_table())
            .apply(&input, &ApplyOptions::default())
            .unwrap_err();
        assert_eq!(err.field(), Some("messages[0].__proto__"));
        assert_eq!(err.constraint(), Some(&Constraint::Forbidden));
    }

    #[test]
    fn test_collect_errors_reports_everything() {
        let t = table(json!({
            "version": "1.0",
            "description": "test",
            "formats": {"source": "a", "target": "b"},
            "fieldMappings": {
                "model": {"targetField": "model", "required": true},
                "temperature": {"targetField": "t", "validation": {"max": 2}}
            }
        }));
        let errors = FieldMappingApplier::new(&t).collect_errors(
            &json!({"temperature": 3, "extra": 1}),
            &ApplyOptions {
                preserve_unknown_fields: false,
                strict_mapping: true,
            },
        );
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].constraint(), Some(&Constraint::Unmapped));
        assert_eq!(errors[1].constraint(), Some(&Constraint::Required));
        assert_eq!(errors[2].constraint(), Some(&Constraint::Max));
    }

    #[test]
    fn test_table_required_field_backed_by_required_entry() {
        let t = table(json!({
            "version": "1.0",
            "description": "test",
            "formats": {"source": "a", "target": "b"},
            "fieldMappings": {
                "model": {"targetField": "model", "required": true},
                "messages": {"targetField": "input.messages", "required": true, "defaultValue": []}
            },
            "validationRules": {"required": ["model", "messages", "user"]}
        }));
        let applier = FieldMappingApplier::new(&t);

        let err = applier.apply(&json!({"user": "u"}), &ApplyOptions::default()).unwrap_err();
        assert!(matches!(err, Error::RequiredFieldMissing { ref field } if field == "model"));

        // A default satisfies the entry, so the table rule still applies
        let err = applier.apply(&json!({"model": "m", "user": "u"}), &ApplyOptions::default()).unwrap_err();
        assert_eq!(err.field(), Some("messages"));
        assert!(matches!(err, Error::ValidationFailed { .. }));

        let errors = applier.collect_errors(&json!({"messages": []}), &ApplyOptions::default());
        let fields: Vec<_> = errors.iter().map(|e| e.field().unwrap_or_default().to_string()).collect();
        assert_eq!(fields, vec!["user", "model"]);
        assert!(matches!(errors[1], Error::RequiredFieldMissing { .. }));
    }
}
