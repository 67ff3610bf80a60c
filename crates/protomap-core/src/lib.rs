//! Protomap Core - Protocol compatibility engine for LLM gateways
//!
//! This crate converts request and response payloads between the wire formats
//! of different LLM vendor APIs. Conversions are described by declarative
//! mapping tables rather than per-vendor code.
//!
//! # Main Components
//!
//! - **Mapping tables**: field mappings, transform definitions and validation rules,
//!   compiled once and shared between conversions
//! - **Transform interpreter**: the closed vocabulary of value transforms
//! - **Validation engine**: per-field constraints and document-level rules
//! - **Compatibility modules**: a configured conversion with direction, strictness
//!   and optional content-based agent routing
//!
//! # Example
//!
//! ```
//! use protomap_core::{CompatibilityModule, ConversionContext, MappingTableStore, ModuleConfig};
//! use serde_json::json;
//!
//! fn example() -> protomap_core::Result<()> {
//!     let store = MappingTableStore::new();
//!     let module = CompatibilityModule::new(ModuleConfig::new("openai-dashscope"), &store)?;
//!
//!     let request = json!({
//!         "model": "gpt-4",
//!         "messages": [{"role": "user", "content": "hi"}],
//!         "temperature": 0.7
//!     });
//!     let converted = module.convert_request(&request, &ConversionContext::new())?;
//!     assert_eq!(converted["model"], json!("qwen-max"));
//!     assert_eq!(converted["parameters"]["temperature"], json!(0.7));
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

pub mod agents;
pub mod compatibility;
pub mod error;
pub mod translation;
pub mod types;

// Re-export main types for convenience
pub use agents::{AgentDispatcher, AgentKind};
pub use compatibility::CompatibilityModule;
pub use error::{Constraint, Error, Result};
pub use translation::{
    ApplyOptions, ConversionContext, DerivationWarning, FieldMappingApplier, FunctionRegistry,
    MappingTable, MappingTableStore, TableSource,
};
pub use types::{
    // Table records
    FieldEntry, FieldMapping, FieldMappingEntry, FieldValidation, Formats, ValidationRules,
    ValueKind,

    // Module configuration
    AgentConfig, Direction, ModuleConfig, ModuleValidation,

    // Results
    CompatibilityInfo, ValidationResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
