//! Tests for the validation system
//!
//! Field-level constraint blocks, document-level rules, and the strict and
//! lenient collection modes.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

#[cfg(test)]
mod tests {
    use super::super::constraint_validators::{
        validate_array_lengths, validate_depth, validate_forbidden_fields,
    };
    use super::super::field_validators::{is_empty, validate_field};
    use super::super::{PatternCache, ValidationError, ValidationMode, ValidationSeverity, Validator};
    use crate::error::{Constraint, Error};
    use crate::types::{FieldValidation, ModuleValidation, ValidationRules, ValueKind};
    use serde_json::{json, Map, Value};

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    fn violation(value: Value, validation: FieldValidation) -> Option<ValidationError> {
        validate_field("field", &value, &validation, &PatternCache::new()).unwrap()
    }

    #[test]
    fn test_empty_values() {
        assert!(is_empty(&json!(null)));
        assert!(is_empty(&json!("")));
        assert!(is_empty(&json!([])));
        assert!(!is_empty(&json!({})));
        assert!(!is_empty(&json!(0)));
        assert!(!is_empty(&json!(false)));
    }

    #[test]
    fn test_allow_empty_skips_remaining_checks() {
        let validation = FieldValidation {
            allow_empty: true,
            min_length: Some(3),
            ..FieldValidation::default()
        };
        assert!(violation(json!(""), validation.clone()).is_none());
        assert_eq!(
            violation(json!("ab"), validation).unwrap().constraint,
            Constraint::MinLength
        );

        let rejected = violation(json!([]), FieldValidation::default()).unwrap();
        assert_eq!(rejected.constraint, Constraint::Empty);
    }

    #[test]
    fn test_length_counts_characters() {
        let validation = FieldValidation {
            max_length: Some(3),
            ..FieldValidation::default()
        };
        assert!(violation(json!("héé"), validation.clone()).is_none());

        let err = violation(json!("abcd"), validation).unwrap();
        assert_eq!(err.constraint, Constraint::MaxLength);
        assert_eq!(err.actual.as_deref(), Some("4 characters"));
    }

    #[test]
    fn test_range_applies_to_numbers_only() {
        let validation = FieldValidation {
            min: Some(0.0),
            max: Some(2.0),
            ..FieldValidation::default()
        };
        assert!(violation(json!(2), validation.clone()).is_none());
        assert!(violation(json!("5"), validation.clone()).is_none());
        assert_eq!(violation(json!(-0.1), validation.clone()).unwrap().constraint, Constraint::Min);

        let err = violation(json!(5), validation).unwrap();
        assert_eq!(err.constraint, Constraint::Max);
        assert_eq!(err.field_path, "field");
        assert_eq!(err.message, "5 exceeds maximum 2");
    }

    #[test]
    fn test_allowed_values() {
        let validation = FieldValidation {
            allowed: Some(vec![json!("text"), json!("message"), json!(1)]),
            ..FieldValidation::default()
        };
        assert!(violation(json!("text"), validation.clone()).is_none());
        assert!(violation(json!(1.0), validation.clone()).is_none());

        let err = violation(json!("json"), validation).unwrap();
        assert_eq!(err.constraint, Constraint::Allowed);
        assert_eq!(err.expected.as_deref(), Some("one of: \"text\", \"message\", 1"));
    }

    #[test]
    fn test_pattern_matches_strings() {
        let validation = FieldValidation {
            pattern: Some("^gpt-".to_string()),
            ..FieldValidation::default()
        };
        assert!(violation(json!("gpt-4"), validation.clone()).is_none());
        assert!(violation(json!(4), validation.clone()).is_none());
        assert_eq!(
            violation(json!("qwen-max"), validation).unwrap().constraint,
            Constraint::Pattern
        );
    }

    #[test]
    fn test_invalid_pattern_is_configuration_error() {
        let validation = FieldValidation {
            pattern: Some("(".to_string()),
            ..FieldValidation::default()
        };
        let err = validate_field("field", &json!("x"), &validation, &PatternCache::new()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn test_forbidden_fields_are_found_at_any_depth() {
        let document = json!({
            "messages": [
                {"role": "user"},
                {"role": "user", "__proto__": {"polluted": true}}
            ],
            "constructor": 1
        });
        let forbidden = vec!["__proto__".to_string(), "constructor".to_string()];

        let all = validate_forbidden_fields(&document, &forbidden, false);
        let paths: Vec<_> = all.iter().map(|e| e.field_path.as_str()).collect();
        assert_eq!(paths, vec!["constructor", "messages[1].__proto__"]);

        let first = validate_forbidden_fields(&document, &forbidden, true);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_depth_limit() {
        let document = json!({"a": {"b": {"c": 1}}});
        assert!(validate_depth(&document, 3).is_none());
        let err = validate_depth(&document, 2).unwrap();
        assert_eq!(err.constraint, Constraint::MaxDepth);
        assert_eq!(err.field_path, "$");
    }

    #[test]
    fn test_array_length_limit_reports_path() {
        let document = json!({"input": {"messages": [1, 2, 3]}, "stop": [1]});
        assert!(validate_array_lengths(&document, 3, false).is_empty());

        let errors = validate_array_lengths(&document, 2, false);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field_path, "input.messages");
        assert_eq!(errors[0].actual.as_deref(), Some("3 elements"));
    }

    #[test]
    fn test_table_rules_order_and_modes() {
        let rules = ValidationRules {
            required: vec!["model".to_string(), "messages".to_string()],
            types: [("temperature".to_string(), ValueKind::Number)].into_iter().collect(),
            ..ValidationRules::default()
        };
        let data = object(json!({"temperature": "hot", "prototype": {}}));
        let patterns = PatternCache::new();

        let strict = Validator::new(&patterns).table_violations(&data, &rules);
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].constraint, Constraint::Forbidden);

        let lenient = Validator::with_mode(&patterns, ValidationMode::Lenient).table_violations(&data, &rules);
        let constraints: Vec<_> = lenient.iter().map(|e| e.constraint.clone()).collect();
        assert_eq!(
            constraints,
            vec![Constraint::Forbidden, Constraint::Required, Constraint::Required, Constraint::Type]
        );
    }

    #[test]
    fn test_module_validation() {
        let validation = ModuleValidation {
            enabled: true,
            required: vec!["model".to_string()],
            types: [("stream".to_string(), ValueKind::Boolean)].into_iter().collect(),
            constraints: [(
                "user".to_string(),
                FieldValidation {
                    max_length: Some(4),
                    ..FieldValidation::default()
                },
            )]
            .into_iter()
            .collect(),
        };
        let patterns = PatternCache::new();
        let validator = Validator::with_mode(&patterns, ValidationMode::Lenient);

        let data = object(json!({"model": "gpt-4", "stream": true, "user": "alice"}));
        let errors = validator.module_violations(&data, &validation).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field_path, "user");

        let disabled = ModuleValidation {
            enabled: false,
            ..validation
        };
        assert!(validator.module_violations(&object(json!({})), &disabled).unwrap().is_empty());
    }

    #[test]
    fn test_enforce_ignores_warnings() {
        let warning = ValidationError {
            severity: ValidationSeverity::Warning,
            ..ValidationError::new("stop", Constraint::MaxArrayLength, "long")
        };
        assert!(Validator::enforce(vec![warning.clone()]).is_ok());

        let error = ValidationError::new("model", Constraint::Required, "missing");
        let err = Validator::enforce(vec![warning, error]).unwrap_err();
        assert_eq!(err.field(), Some("model"));
        assert_eq!(err.constraint(), Some(&Constraint::Required));
    }

    #[test]
    fn test_check_field_converts_to_error() {
        let patterns = PatternCache::new();
        let validation = FieldValidation {
            min: Some(1.0),
            ..FieldValidation::default()
        };
        let err = Validator::new(&patterns)
            .check_field("max_tokens", &json!(0), &validation)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation failed for 'max_tokens' (min): 0 is below minimum 1 (expected ≥ 1, got 0)"
        );
    }
}
