//! Mapping-table driven payload conversion
//!
//! This module holds the pieces a compatibility module is assembled from:
//! compiled mapping tables and the store that loads them, the field mapping
//! applier, the transform interpreter, the validation engine, and reverse
//! table derivation.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

pub mod context;
pub mod mapper;
pub mod reverse;
pub mod store;
pub mod table;
pub mod transformer;
pub mod validator;

pub use context::ConversionContext;
pub use mapper::{ApplyOptions, FieldMappingApplier};
pub use reverse::{derive_entries, reverse_table, DerivationWarning, ReverseMapping};
pub use store::{MappingTableStore, TableSource, BUILTIN_TABLES};
pub use table::MappingTable;
pub use transformer::{FunctionRegistry, TransformContext, TransformDefinition, TransformInterpreter};
pub use validator::{PatternCache, ValidationError, ValidationMode, Validator};
