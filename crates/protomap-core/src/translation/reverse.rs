//! Reverse mapping derivation
//!
//! Builds the table used for the opposite conversion direction. A table may
//! author `reverseFieldMappings` itself; otherwise the inverse is derived
//! structurally by swapping each entry's source field and target path.
//! Transforms are not inverted: a derived entry carries its value through
//! unchanged, and every dropped transform is reported.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use super::table::MappingTable;
use crate::types::{FieldMapping, FieldMappingEntry, ValidationRules};
use crate::{Error, Result};
use std::fmt;

/// A lossy step taken while deriving a reverse table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DerivationWarning {
    /// The forward entry's transform was replaced by a pass-through
    TransformDropped {
        source_field: String,
        target_field: String,
        transform: String,
    },
    /// Two forward entries wrote the same target path; the later one wins
    TargetCollision {
        target_field: String,
        replaced: String,
        kept: String,
    },
}

impl fmt::Display for DerivationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivationWarning::TransformDropped {
                source_field,
                target_field,
                transform,
            } => write!(
                f,
                "transform '{}' on '{}' -> '{}' is not inverted; the reverse mapping passes values through unchanged",
                transform, source_field, target_field
            ),
            DerivationWarning::TargetCollision {
                target_field,
                replaced,
                kept,
            } => write!(
                f,
                "'{}' and '{}' both map to '{}'; reverse mapping restores '{}'",
                replaced, kept, target_field, kept
            ),
        }
    }
}

/// A reverse table and how it was obtained
#[derive(Debug, Clone)]
pub struct ReverseMapping {
    pub table: MappingTable,
    /// True when derived structurally, false when authored in the table
    pub derived: bool,
    pub warnings: Vec<DerivationWarning>,
}

/// Reverse table for `table`
///
/// With `strict`, a derivation that would drop a transform fails with a
/// configuration error instead of producing a lossy table.
pub fn reverse_table(table: &MappingTable, strict: bool) -> Result<ReverseMapping> {
    let name = format!("{}:reverse", table.name());
    let description = format!("Reverse of {}", table.description());
    let formats = table.formats().swapped();
    let rules = structural_rules(table.validation_rules());

    if let Some(entries) = table.reverse_entries() {
        tracing::debug!(table = %table.name(), "Using authored reverse field mappings");
        return Ok(ReverseMapping {
            table: MappingTable::from_parts(name, description, formats, entries.to_vec(), rules, table),
            derived: false,
            warnings: Vec::new(),
        });
    }

    let (entries, warnings) = derive_entries(table.entries());

    if strict {
        if let Some(DerivationWarning::TransformDropped {
            source_field,
            transform,
            ..
        }) = warnings
            .iter()
            .find(|w| matches!(w, DerivationWarning::TransformDropped { .. }))
        {
            return Err(Error::configuration(format!(
                "Mapping table '{}' cannot be reversed under strictMapping: transform '{}' on '{}' has no inverse; author reverseFieldMappings instead",
                table.name(),
                transform,
                source_field
            )));
        }
    }

    for warning in &warnings {
        tracing::warn!(table = %table.name(), "{}", warning);
    }

    Ok(ReverseMapping {
        table: MappingTable::from_parts(name, description, formats, entries, rules, table),
        derived: true,
        warnings,
    })
}

/// Swap source and target of every entry, keeping `required`
pub fn derive_entries(forward: &[FieldMappingEntry]) -> (Vec<FieldMappingEntry>, Vec<DerivationWarning>) {
    let mut entries: Vec<FieldMappingEntry> = Vec::with_capacity(forward.len());
    let mut warnings = Vec::new();

    for entry in forward {
        let target = &entry.mapping.target_field;

        if let Some(transform) = &entry.mapping.transform {
            warnings.push(DerivationWarning::TransformDropped {
                source_field: entry.source_field.clone(),
                target_field: target.clone(),
                transform: transform.clone(),
            });
        }

        let reversed = FieldMappingEntry {
            source_field: target.clone(),
            mapping: FieldMapping {
                required: entry.mapping.required,
                ..FieldMapping::rename(entry.source_field.clone())
            },
        };

        match entries.iter_mut().find(|e| &e.source_field == target) {
            Some(existing) => {
                warnings.push(DerivationWarning::TargetCollision {
                    target_field: target.clone(),
                    replaced: existing.mapping.target_field.clone(),
                    kept: entry.source_field.clone(),
                });
                *existing = reversed;
            }
            None => entries.push(reversed),
        }
    }

    (entries, warnings)
}

/// Structural limits carry over; field-level requirements do not
fn structural_rules(rules: &ValidationRules) -> ValidationRules {
    ValidationRules {
        forbidden_fields: rules.forbidden_fields.clone(),
        max_depth: rules.max_depth,
        max_array_length: rules.max_array_length,
        ..ValidationRules::default()
    }
}
