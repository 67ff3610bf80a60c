//! Core types for the transform interpreter
//!
//! This module defines the declarative transform vocabulary a mapping table
//! can reference, the per-call context handed to transforms, and the function
//! signature used by the named function registry.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::ordered_map;

/// Maximum nesting of transform definitions, counting named references
pub const MAX_TRANSFORM_DEPTH: usize = 16;

/// Every `type` tag a transform definition may carry
pub const TRANSFORM_TYPES: &[&str] = &[
    "mapping",
    "string_transform",
    "array_transform",
    "object_transform",
    "function",
    "validation",
];

/// Cross-field rules understood by `validation` transforms
pub const VALIDATION_RULES: &[&str] = &["sum_equals_total", "all_present"];

/// String operations supported by `string_transform`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringOperation {
    Prefix,
    Suffix,
    Uppercase,
    Lowercase,
    Replace,
}

/// A reference to a transform: either a table transform name or an inline definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransformRef {
    Named(String),
    Inline(Box<TransformDefinition>),
}

/// Detailed spec for one field of an `object_transform`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectFieldDetail {
    /// Output key; defaults to the input key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_field: Option<String>,

    /// Literal value lookup applied to the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping: Option<Map<String, Value>>,

    /// Nested transform applied to the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(default)]
    pub required: bool,
}

/// One field of an `object_transform`: a new key name or a detailed spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ObjectFieldSpec {
    Target(String),
    Detailed(ObjectFieldDetail),
}

impl ObjectFieldSpec {
    /// Output key for the input field `name`
    pub fn target<'a>(&'a self, name: &'a str) -> &'a str {
        match self {
            ObjectFieldSpec::Target(target) => target,
            ObjectFieldSpec::Detailed(detail) => detail.target_field.as_deref().unwrap_or(name),
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, ObjectFieldSpec::Detailed(detail) if detail.required)
    }
}

/// A named transform definition, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformDefinition {
    /// Literal value lookup with a fallback for unmatched inputs
    Mapping {
        mappings: Map<String, Value>,
        #[serde(
            default,
            rename = "defaultValue",
            skip_serializing_if = "Option::is_none"
        )]
        default_value: Option<Value>,
    },

    /// Prefix, suffix, case change, or regex replace on strings
    StringTransform {
        operation: StringOperation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        replacement: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        flags: Option<String>,
    },

    /// Element-wise transform over arrays
    ArrayTransform {
        #[serde(rename = "elementTransform")]
        element_transform: TransformRef,
    },

    /// Builds a new object from declared fields of the input object
    ObjectTransform {
        #[serde(with = "ordered_map")]
        fields: Vec<(String, ObjectFieldSpec)>,
    },

    /// Named function from the registry
    Function {
        #[serde(alias = "name")]
        function: String,
    },

    /// Cross-field assertion; never changes the value
    Validation {
        rule: String,
        #[serde(default)]
        fields: Vec<String>,
    },
}

impl TransformDefinition {
    /// The `type` tag of this definition
    pub fn kind(&self) -> &'static str {
        match self {
            TransformDefinition::Mapping { .. } => "mapping",
            TransformDefinition::StringTransform { .. } => "string_transform",
            TransformDefinition::ArrayTransform { .. } => "array_transform",
            TransformDefinition::ObjectTransform { .. } => "object_transform",
            TransformDefinition::Function { .. } => "function",
            TransformDefinition::Validation { .. } => "validation",
        }
    }
}

/// Error returned by a registered function transform
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{0}")]
pub struct FunctionError(pub String);

impl FunctionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A pure value transformer resolved from the function registry
pub type TransformFn = fn(&Value, &TransformContext<'_>) -> Result<Value, FunctionError>;

/// Context information available to transforms
///
/// `parent` is the nearest enclosing object: the input document for a
/// top-level field, the object being rebuilt inside an `object_transform`,
/// or the current element inside an `array_transform`.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    /// Full source document
    pub root: &'a Value,
    /// Nearest enclosing object
    pub parent: &'a Value,
    /// Source field currently being transformed
    pub field: &'a str,
    /// Element index inside an `array_transform`
    pub index: Option<usize>,
    /// Raw element inside an `array_transform`
    pub item: Option<&'a Value>,
    /// Current definition nesting depth
    pub depth: usize,
}

impl<'a> TransformContext<'a> {
    /// Context for a top-level field of `root`
    pub fn new(root: &'a Value, field: &'a str) -> Self {
        Self {
            root,
            parent: root,
            field,
            index: None,
            item: None,
            depth: 0,
        }
    }

    /// Context for one element of an array
    pub fn for_element(&self, index: usize, item: &'a Value) -> TransformContext<'a> {
        TransformContext {
            root: self.root,
            parent: if item.is_object() { item } else { self.parent },
            field: self.field,
            index: Some(index),
            item: Some(item),
            depth: self.depth + 1,
        }
    }

    /// Context for one field of an object being rebuilt
    pub fn for_field(&self, parent: &'a Value, field: &'a str) -> TransformContext<'a> {
        TransformContext {
            root: self.root,
            parent,
            field,
            index: self.index,
            item: self.item,
            depth: self.depth + 1,
        }
    }

    /// Look a field up in the enclosing object, falling back to the root document
    ///
    /// Dotted names are resolved as paths.
    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        let resolve = |start: &'a Value| {
            name.split('.')
                .try_fold(start, |current, segment| current.as_object()?.get(segment))
        };
        resolve(self.parent).or_else(|| resolve(self.root))
    }

    /// Path of a sub-field relative to the current source field, for error messages
    pub fn qualify(&self, name: &str) -> String {
        match self.index {
            Some(index) => format!("{}[{}].{}", self.field, index, name),
            None => format!("{}.{}", self.field, name),
        }
    }
}
