//! Core validation types and enums
//!
//! This module contains the fundamental types used throughout the validation system,
//! including the violation record, severity levels, and validation modes.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use crate::error::{Constraint, Error};
use std::fmt;

/// Validation violation with detailed field path information
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field_path: String,
    pub constraint: Constraint,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub severity: ValidationSeverity,
}

impl ValidationError {
    /// An error-severity violation
    pub fn new(field_path: impl Into<String>, constraint: Constraint, message: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            constraint,
            message: message.into(),
            expected: None,
            actual: None,
            severity: ValidationSeverity::Error,
        }
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == ValidationSeverity::Error
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.field_path, self.constraint, self.message)?;
        if let Some(expected) = &self.expected {
            write!(f, "; expected {}", expected)?;
        }
        if let Some(actual) = &self.actual {
            write!(f, ", got {}", actual)?;
        }
        Ok(())
    }
}

impl From<ValidationError> for Error {
    fn from(violation: ValidationError) -> Self {
        let message = match (&violation.expected, &violation.actual) {
            (Some(expected), Some(actual)) => {
                format!("{} (expected {}, got {})", violation.message, expected, actual)
            }
            (Some(expected), None) => format!("{} (expected {})", violation.message, expected),
            _ => violation.message,
        };
        Error::ValidationFailed {
            field: violation.field_path,
            constraint: violation.constraint,
            message,
        }
    }
}

/// Severity levels for validation findings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Violation that fails the conversion
    Error,
    /// Finding that does not block conversion, such as a dropped field
    Warning,
}

/// Validation mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Stop at the first violation
    #[default]
    Strict,
    /// Collect every violation
    Lenient,
}
