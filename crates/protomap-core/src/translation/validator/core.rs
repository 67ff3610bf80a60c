//! Core validation engine
//!
//! The `Validator` orchestrates field-level and document-level checks. In
//! strict mode it stops at the first violation, which is what conversion
//! uses; lenient mode collects every violation for reporting.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use super::constraint_validators::{
    validate_array_lengths, validate_depth, validate_forbidden_fields, validate_required,
    validate_types,
};
use super::field_validators::validate_field;
use super::patterns::PatternCache;
use super::{ValidationError, ValidationMode};
use crate::types::{FieldValidation, ModuleValidation, ValidationRules};
use crate::Result;
use serde_json::{Map, Value};

/// Evaluates constraint blocks against values
pub struct Validator<'a> {
    patterns: &'a PatternCache,
    mode: ValidationMode,
}

impl<'a> Validator<'a> {
    /// Create a strict validator
    pub fn new(patterns: &'a PatternCache) -> Self {
        Self::with_mode(patterns, ValidationMode::Strict)
    }

    /// Create a validator with explicit validation mode
    pub fn with_mode(patterns: &'a PatternCache, mode: ValidationMode) -> Self {
        Self { patterns, mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Check one field value, failing on the first violated constraint
    pub fn check_field(&self, field: &str, value: &Value, validation: &FieldValidation) -> Result<()> {
        match validate_field(field, value, validation, self.patterns)? {
            Some(violation) => Err(violation.into()),
            None => Ok(()),
        }
    }

    /// Table-level rules against the whole input
    ///
    /// Structural checks (forbidden names, depth, array length) run before
    /// the required and type checks.
    pub fn table_violations(&self, data: &Map<String, Value>, rules: &ValidationRules) -> Vec<ValidationError> {
        let stop_at_first = self.mode == ValidationMode::Strict;
        let document = Value::Object(data.clone());
        let mut errors = Vec::new();

        errors.extend(validate_forbidden_fields(&document, &rules.forbidden_fields, stop_at_first));
        if self.should_stop(&errors) {
            return errors;
        }

        errors.extend(validate_depth(&document, rules.max_depth));
        if self.should_stop(&errors) {
            return errors;
        }

        errors.extend(validate_array_lengths(&document, rules.max_array_length, stop_at_first));
        if self.should_stop(&errors) {
            return errors;
        }

        errors.extend(validate_required(data, &rules.required));
        if self.should_stop(&errors) {
            errors.truncate(1);
            return errors;
        }

        errors.extend(validate_types(data, &rules.types));
        if stop_at_first {
            errors.truncate(1);
        }
        errors
    }

    /// Module-level `validation` block against the input
    pub fn module_violations(
        &self,
        data: &Map<String, Value>,
        validation: &ModuleValidation,
    ) -> Result<Vec<ValidationError>> {
        if !validation.enabled {
            return Ok(Vec::new());
        }

        let mut errors = validate_required(data, &validation.required);
        errors.extend(validate_types(data, &validation.types));
        if self.should_stop(&errors) {
            errors.truncate(1);
            return Ok(errors);
        }

        for (field, constraints) in &validation.constraints {
            if let Some(value) = data.get(field) {
                if let Some(violation) = validate_field(field, value, constraints, self.patterns)? {
                    errors.push(violation);
                    if self.mode == ValidationMode::Strict {
                        break;
                    }
                }
            }
        }
        Ok(errors)
    }

    /// Fail with the first collected violation
    pub fn enforce(errors: Vec<ValidationError>) -> Result<()> {
        match errors.into_iter().find(ValidationError::is_error) {
            Some(violation) => Err(violation.into()),
            None => Ok(()),
        }
    }

    fn should_stop(&self, errors: &[ValidationError]) -> bool {
        self.mode == ValidationMode::Strict && !errors.is_empty()
    }
}
