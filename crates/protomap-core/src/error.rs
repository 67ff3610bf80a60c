//! Error types for the protomap core library
//!
//! Every failure raised by the conversion engine is one of the variants below.
//! Errors are produced synchronously by the field mapping applier, the
//! transform interpreter, or the table store, and are never retried
//! internally: the engine is deterministic, so identical input reproduces the
//! identical error.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for protomap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed mapping table, or an invalid module configuration
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// A required source field (or object_transform sub-field) is absent with no default
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    /// A field-level or table-level constraint was violated
    #[error("Validation failed for '{field}' ({constraint}): {message}")]
    ValidationFailed {
        field: String,
        constraint: Constraint,
        message: String,
    },

    /// A referenced transform name, type tag, function, or rule does not exist
    #[error("Unknown transform type: {name}")]
    UnknownTransformType {
        name: String,
        context: Option<String>,
    },

    /// A registered function transform failed
    #[error("Transform '{transform}' failed: {message}")]
    TransformExecution { transform: String, message: String },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors while reading table files
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote table store errors
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        status_code: Option<u16>,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// The specific constraint a `ValidationFailed` error refers to
///
/// Displayed in the same camelCase spelling used by mapping table keys, so a
/// table author can find the offending entry directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Constraint {
    Empty,
    MinLength,
    MaxLength,
    Min,
    Max,
    Allowed,
    Pattern,
    Required,
    Type,
    Forbidden,
    MaxDepth,
    MaxArrayLength,
    Unmapped,
    /// A named cross-field rule from a `validation` transform
    Rule(String),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Empty => write!(f, "allowEmpty"),
            Constraint::MinLength => write!(f, "minLength"),
            Constraint::MaxLength => write!(f, "maxLength"),
            Constraint::Min => write!(f, "min"),
            Constraint::Max => write!(f, "max"),
            Constraint::Allowed => write!(f, "allowed"),
            Constraint::Pattern => write!(f, "pattern"),
            Constraint::Required => write!(f, "required"),
            Constraint::Type => write!(f, "type"),
            Constraint::Forbidden => write!(f, "forbiddenFields"),
            Constraint::MaxDepth => write!(f, "maxDepth"),
            Constraint::MaxArrayLength => write!(f, "maxArrayLength"),
            Constraint::Unmapped => write!(f, "strictMapping"),
            Constraint::Rule(name) => write!(f, "{}", name),
        }
    }
}

impl Error {
    /// Create a configuration error without an underlying cause
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a validation failure for a field and constraint
    pub fn validation(
        field: impl Into<String>,
        constraint: Constraint,
        message: impl Into<String>,
    ) -> Self {
        Error::ValidationFailed {
            field: field.into(),
            constraint,
            message: message.into(),
        }
    }

    /// Create an unknown-transform error
    pub fn unknown_transform(name: impl Into<String>, context: Option<String>) -> Self {
        Error::UnknownTransformType {
            name: name.into(),
            context,
        }
    }

    /// The field this error originated from, when there is one
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::RequiredFieldMissing { field } | Error::ValidationFailed { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }

    /// The violated constraint, for validation failures
    pub fn constraint(&self) -> Option<&Constraint> {
        match self {
            Error::ValidationFailed { constraint, .. } => Some(constraint),
            Error::RequiredFieldMissing { .. } => Some(&Constraint::Required),
            _ => None,
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Configuration {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http {
            message: err.to_string(),
            status_code: err.status().map(|s| s.as_u16()),
            source: Some(err.into()),
        }
    }
}
