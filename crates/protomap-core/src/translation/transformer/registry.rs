//! Registry of named function transforms
//!
//! The registry is a closed set of statically compiled functions. Tables
//! refer to them by name and every reference is checked when the table is
//! loaded, so no code is ever evaluated at conversion time.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use super::built_in;
use super::types::TransformFn;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

static BUILTIN_REGISTRY: OnceLock<Arc<FunctionRegistry>> = OnceLock::new();

/// Name → function table used by `function` transforms
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: BTreeMap<String, TransformFn>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// A registry holding every built-in function
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for (name, function) in built_in::ALL {
            registry.functions.insert(name.to_string(), *function);
        }
        registry
    }

    /// Shared instance of the built-in registry
    pub fn builtin() -> Arc<FunctionRegistry> {
        BUILTIN_REGISTRY
            .get_or_init(|| Arc::new(Self::with_builtins()))
            .clone()
    }

    /// Add or replace a function
    pub fn register(mut self, name: impl Into<String>, function: TransformFn) -> Self {
        self.functions.insert(name.into(), function);
        self
    }

    pub fn get(&self, name: &str) -> Option<TransformFn> {
        self.functions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}
