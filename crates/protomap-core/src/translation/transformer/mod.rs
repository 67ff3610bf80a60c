//! Declarative value transforms referenced by mapping tables
//!
//! A mapping table names its transforms under `transformFunctions`; a field
//! mapping refers to one by name and the interpreter applies it to the source
//! value before the value is validated and written.
//!
//! # Module Organization
//!
//! - [`types`] - Transform vocabulary, context, and function signature
//! - [`interpreter`] - Dispatch over transform kinds
//! - [`registry`] - Closed registry of named function transforms
//! - [`built_in`] - The statically compiled functions shipped with the registry
//!
//! # Examples
//!
//! ```
//! use protomap_core::translation::transformer::{
//!     FunctionRegistry, TransformContext, TransformDefinition, TransformInterpreter,
//! };
//! use protomap_core::translation::validator::PatternCache;
//! use serde_json::json;
//! use std::collections::HashMap;
//!
//! let mut transforms = HashMap::new();
//! transforms.insert(
//!     "model_names".to_string(),
//!     serde_json::from_value::<TransformDefinition>(json!({
//!         "type": "mapping",
//!         "mappings": {"gpt-4": "qwen-max"},
//!         "defaultValue": "qwen-turbo"
//!     }))
//!     .unwrap(),
//! );
//! let registry = FunctionRegistry::with_builtins();
//! let patterns = PatternCache::new();
//! let interpreter = TransformInterpreter::new(&transforms, &registry, &patterns);
//!
//! let root = json!({"model": "gpt-4"});
//! let ctx = TransformContext::new(&root, "model");
//! let mapped = interpreter.apply("model_names", &json!("gpt-4"), &ctx).unwrap();
//! assert_eq!(mapped, json!("qwen-max"));
//! ```
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

pub mod built_in;
pub mod interpreter;
pub mod registry;
pub mod types;


pub use interpreter::TransformInterpreter;
pub use registry::FunctionRegistry;
pub use types::{
    FunctionError, ObjectFieldDetail, ObjectFieldSpec, StringOperation, TransformContext,
    TransformDefinition, TransformFn, TransformRef, MAX_TRANSFORM_DEPTH,
};
