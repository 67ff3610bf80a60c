//! Validation engine for mapped field values and input documents
//!
//! The validator is organized into focused modules:
//! - `types`: Core validation types and enums
//! - `patterns`: Compiled regex cache shared with the transform interpreter
//! - `core`: The `Validator` orchestrating all checks
//! - `field_validators`: Per-field constraint blocks
//! - `constraint_validators`: Document-level rules
//! - `tests`: Test suite
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

pub mod constraint_validators;
pub mod core;
pub mod field_validators;
pub mod patterns;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export public API
pub use self::core::Validator;
pub use patterns::PatternCache;
pub use types::{ValidationError, ValidationMode, ValidationSeverity};
