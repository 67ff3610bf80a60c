//! Error types and handling for the CLI
//!
//! This module provides error types and utilities for handling
//! various failure modes in the CLI application.

use protomap_core::Error as CoreError;
use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from the conversion engine
    #[error("{0}")]
    Core(#[from] CoreError),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// Invalid file format
    #[error("Invalid file format for {}: expected {} format", path.display(), expected)]
    InvalidFormat { path: PathBuf, expected: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument combination
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// Input failed validation; details were already printed
    #[error("Input is not valid for mapping table '{table}' ({errors} error(s))")]
    ValidationFailed { table: String, errors: usize },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs(message.into())
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(core) => match core {
                CoreError::Configuration { .. } | CoreError::UnknownTransformType { .. } => 2,
                CoreError::RequiredFieldMissing { .. } | CoreError::ValidationFailed { .. } => 3,
                CoreError::TransformExecution { .. } => 4,
                _ => 2,
            },
            Self::FileNotFound { .. } => 5,
            Self::InvalidFormat { .. } => 6,
            Self::Config(_) => 7,
            Self::InvalidArgs(_) => 8,
            Self::ValidationFailed { .. } => 3,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::TomlDe(_) | Self::TomlSer(_) => 14,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::InvalidArgs(_))
    }
}

/// Format an error for display to the user
///
/// Validation failures from the engine get a second line naming the field
/// and the table key that rejected it.
pub fn format_error(error: &Error, use_color: bool) -> String {
    use colored::Colorize;

    let headline = if use_color {
        format!("{} {}", "Error:".red().bold(), error)
    } else {
        format!("Error: {}", error)
    };

    let Error::Core(core) = error else {
        return headline;
    };
    match (core.field(), core.constraint()) {
        (Some(field), Some(constraint)) => {
            let detail = format!("  field: {}  constraint: {}", field, constraint);
            if use_color {
                format!("{}\n{}", headline, detail.dimmed())
            } else {
                format!("{}\n{}", headline, detail)
            }
        }
        _ => headline,
    }
}
