//! Mapping tables and their load-time compilation
//!
//! A mapping table is the declarative document describing how one wire shape
//! converts into another. Tables are compiled once when loaded: field entries
//! are normalized in declaration order, every transform definition is decoded
//! and checked against the function registry, regexes are compiled, and
//! transform nesting is bounded. The resulting `MappingTable` is immutable and
//! shared across requests.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use crate::translation::transformer::types::{
    StringOperation, TransformDefinition, TransformRef, MAX_TRANSFORM_DEPTH, TRANSFORM_TYPES,
    VALIDATION_RULES,
};
use crate::translation::transformer::{FunctionRegistry, ObjectFieldSpec, TransformInterpreter};
use crate::translation::validator::patterns::DEFAULT_REPLACE_FLAGS;
use crate::translation::validator::PatternCache;
use crate::types::{FieldEntry, FieldMapping, FieldMappingEntry, Formats, ValidationRules};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A compiled, immutable mapping table
#[derive(Debug, Clone)]
pub struct MappingTable {
    name: String,
    version: String,
    description: String,
    formats: Formats,
    entries: Vec<FieldMappingEntry>,
    reverse_entries: Option<Vec<FieldMappingEntry>>,
    validation_rules: ValidationRules,
    transforms: HashMap<String, TransformDefinition>,
    registry: Arc<FunctionRegistry>,
    patterns: PatternCache,
}

impl MappingTable {
    /// Compile a table from its JSON document using the built-in function registry
    pub fn from_value(name: &str, document: &Value) -> Result<Self> {
        Self::compile(name, document, FunctionRegistry::builtin())
    }

    /// Parse and compile a table from JSON text
    pub fn from_json_str(name: &str, text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text).map_err(|e| Error::Configuration {
            message: format!("Mapping table '{}' is not valid JSON", name),
            source: Some(e.into()),
        })?;
        Self::from_value(name, &document)
    }

    /// Compile a table against a specific function registry
    pub fn compile(name: &str, document: &Value, registry: Arc<FunctionRegistry>) -> Result<Self> {
        let root = document.as_object().ok_or_else(|| {
            Error::configuration(format!("Mapping table '{}' must be a JSON object", name))
        })?;

        let version = match root.get("version") {
            Some(Value::String(v)) => v.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(missing(name, "version")),
        };
        let description = root
            .get("description")
            .and_then(Value::as_str)
            .ok_or_else(|| missing(name, "description"))?
            .to_string();
        let formats = parse_formats(name, root.get("formats"))?;

        let field_mappings = root
            .get("fieldMappings")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Mapping table '{}' must declare 'fieldMappings' as an object",
                    name
                ))
            })?;
        let entries = parse_entries(name, "fieldMappings", field_mappings)?;

        let reverse_entries = match root.get("reverseFieldMappings") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(parse_entries(name, "reverseFieldMappings", map)?),
            Some(_) => {
                return Err(Error::configuration(format!(
                    "Mapping table '{}': 'reverseFieldMappings' must be an object",
                    name
                )))
            }
        };

        let validation_rules = match root.get("validationRules") {
            None | Some(Value::Null) => ValidationRules::default(),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| Error::Configuration {
                message: format!("Mapping table '{}': invalid validationRules: {}", name, e),
                source: Some(e.into()),
            })?,
        };

        let transforms = parse_transforms(name, root.get("transformFunctions"))?;

        let mut table = Self {
            name: name.to_string(),
            version,
            description,
            formats,
            entries,
            reverse_entries,
            validation_rules,
            transforms,
            registry,
            patterns: PatternCache::new(),
        };
        table.check_transforms()?;
        table.compile_patterns()?;
        table.check_nesting()?;

        tracing::debug!(
            table = %table.name,
            entries = table.entries.len(),
            transforms = table.transforms.len(),
            patterns = table.patterns.len(),
            "Compiled mapping table"
        );
        Ok(table)
    }

    /// Build a table from already compiled parts
    pub(crate) fn from_parts(
        name: String,
        description: String,
        formats: Formats,
        entries: Vec<FieldMappingEntry>,
        validation_rules: ValidationRules,
        base: &MappingTable,
    ) -> Self {
        Self {
            name,
            version: base.version.clone(),
            description,
            formats,
            entries,
            reverse_entries: None,
            validation_rules,
            transforms: base.transforms.clone(),
            registry: base.registry.clone(),
            patterns: base.patterns.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn formats(&self) -> &Formats {
        &self.formats
    }

    /// Field mappings in declaration order
    pub fn entries(&self) -> &[FieldMappingEntry] {
        &self.entries
    }

    /// Explicitly authored reverse mappings, when the table has them
    pub fn reverse_entries(&self) -> Option<&[FieldMappingEntry]> {
        self.reverse_entries.as_deref()
    }

    pub fn validation_rules(&self) -> &ValidationRules {
        &self.validation_rules
    }

    pub fn transforms(&self) -> &HashMap<String, TransformDefinition> {
        &self.transforms
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    /// Interpreter bound to this table's transforms
    pub fn interpreter(&self) -> TransformInterpreter<'_> {
        TransformInterpreter::new(&self.transforms, &self.registry, &self.patterns)
    }

    /// Whether a top-level input key is covered by a field mapping
    ///
    /// A key is known when it equals a mapping key or is the first segment
    /// of a dotted mapping key.
    pub fn is_known_field(&self, key: &str) -> bool {
        self.entries.iter().any(|entry| {
            entry.source_field == key || entry.source_field.split('.').next() == Some(key)
        })
    }

    /// The literal lookup applied to `model`, when the table maps model names
    pub fn model_mappings(&self) -> Map<String, Value> {
        let transform = self
            .entries
            .iter()
            .find(|entry| entry.source_field == "model")
            .and_then(|entry| entry.mapping.transform.as_deref())
            .and_then(|name| self.transforms.get(name));

        match transform {
            Some(TransformDefinition::Mapping { mappings, .. }) => mappings.clone(),
            _ => Map::new(),
        }
    }

    /// Every function and rule name must exist, and string operations need their operands
    fn check_transforms(&self) -> Result<()> {
        for (name, definition) in &self.transforms {
            let mut failure = None;
            visit_definitions(definition, &mut |def| {
                if failure.is_none() {
                    failure = self.check_definition(name, def).err();
                }
            });
            if let Some(err) = failure {
                return Err(err);
            }
        }

        for entry in self.entries.iter().chain(self.reverse_entries.iter().flatten()) {
            if let Some(transform) = &entry.mapping.transform {
                if !self.transforms.contains_key(transform) {
                    tracing::warn!(
                        table = %self.name,
                        field = %entry.source_field,
                        transform = %transform,
                        "Field mapping references an undefined transform"
                    );
                }
            }
        }
        Ok(())
    }

    fn check_definition(&self, owner: &str, definition: &TransformDefinition) -> Result<()> {
        let context = || Some(format!("transformFunctions.{} in table '{}'", owner, self.name));
        match definition {
            TransformDefinition::Function { function } if !self.registry.contains(function) => {
                Err(Error::unknown_transform(function.clone(), context()))
            }
            TransformDefinition::Validation { rule, .. } if !VALIDATION_RULES.contains(&rule.as_str()) => {
                Err(Error::unknown_transform(rule.clone(), context()))
            }
            TransformDefinition::StringTransform {
                operation: StringOperation::Prefix | StringOperation::Suffix,
                value: None,
                ..
            } => Err(Error::configuration(format!(
                "Transform '{}' in table '{}': prefix and suffix operations need a 'value'",
                owner, self.name
            ))),
            TransformDefinition::StringTransform {
                operation: StringOperation::Replace,
                pattern: None,
                ..
            } => Err(Error::configuration(format!(
                "Transform '{}' in table '{}': replace needs a 'pattern'",
                owner, self.name
            ))),
            _ => Ok(()),
        }
    }

    /// Compile every field `pattern` and every replace regex
    fn compile_patterns(&mut self) -> Result<()> {
        let mut patterns = PatternCache::new();

        for entry in self.entries.iter().chain(self.reverse_entries.iter().flatten()) {
            if let Some(pattern) = entry
                .mapping
                .validation
                .as_ref()
                .and_then(|v| v.pattern.as_deref())
            {
                patterns.insert(pattern, "")?;
            }
        }

        let mut result = Ok(());
        for definition in self.transforms.values() {
            visit_definitions(definition, &mut |def| {
                if let TransformDefinition::StringTransform {
                    operation: StringOperation::Replace,
                    pattern: Some(pattern),
                    flags,
                    ..
                } = def
                {
                    if result.is_ok() {
                        result = patterns.insert(pattern, flags.as_deref().unwrap_or(DEFAULT_REPLACE_FLAGS));
                    }
                }
            });
        }
        result?;

        self.patterns = patterns;
        Ok(())
    }

    /// Reject cyclic references and definitions nested deeper than `MAX_TRANSFORM_DEPTH`
    fn check_nesting(&self) -> Result<()> {
        let mut memo = HashMap::new();
        let mut names: Vec<&String> = self.transforms.keys().collect();
        names.sort();
        for name in names {
            let mut visiting = vec![name.clone()];
            let depth = self.named_depth(name, &mut visiting, &mut memo)?;
            if depth > MAX_TRANSFORM_DEPTH {
                return Err(Error::configuration(format!(
                    "Transform '{}' in table '{}' nests {} levels deep; the maximum is {}",
                    name, self.name, depth, MAX_TRANSFORM_DEPTH
                )));
            }
        }
        Ok(())
    }

    fn named_depth(
        &self,
        name: &str,
        visiting: &mut Vec<String>,
        memo: &mut HashMap<String, usize>,
    ) -> Result<usize> {
        if let Some(depth) = memo.get(name) {
            return Ok(*depth);
        }
        let Some(definition) = self.transforms.get(name) else {
            return Ok(0);
        };
        let depth = self.definition_depth(definition, visiting, memo)?;
        memo.insert(name.to_string(), depth);
        Ok(depth)
    }

    fn definition_depth(
        &self,
        definition: &TransformDefinition,
        visiting: &mut Vec<String>,
        memo: &mut HashMap<String, usize>,
    ) -> Result<usize> {
        if visiting.len() > MAX_TRANSFORM_DEPTH {
            return Ok(MAX_TRANSFORM_DEPTH + 1);
        }
        let nested = match definition {
            TransformDefinition::ArrayTransform { element_transform } => {
                self.ref_depth(element_transform, visiting, memo)?
            }
            TransformDefinition::ObjectTransform { fields } => {
                let mut deepest = 0;
                for (_, spec) in fields {
                    if let ObjectFieldSpec::Detailed(detail) = spec {
                        if let Some(reference) = &detail.transform {
                            deepest = deepest.max(self.ref_depth(reference, visiting, memo)?);
                        }
                    }
                }
                deepest
            }
            _ => 0,
        };
        Ok(1 + nested)
    }

    fn ref_depth(
        &self,
        reference: &TransformRef,
        visiting: &mut Vec<String>,
        memo: &mut HashMap<String, usize>,
    ) -> Result<usize> {
        match reference {
            TransformRef::Inline(definition) => self.definition_depth(definition, visiting, memo),
            TransformRef::Named(name) => {
                if visiting.iter().any(|seen| seen == name) {
                    let mut chain = visiting.clone();
                    chain.push(name.clone());
                    return Err(Error::configuration(format!(
                        "Cyclic transform reference in table '{}': {}",
                        self.name,
                        chain.join(" -> ")
                    )));
                }
                visiting.push(name.clone());
                let depth = self.named_depth(name, visiting, memo);
                visiting.pop();
                depth
            }
        }
    }
}

/// Call `visit` on a definition and every inline definition nested in it
fn visit_definitions<F>(definition: &TransformDefinition, visit: &mut F)
where
    F: FnMut(&TransformDefinition),
{
    visit(definition);
    match definition {
        TransformDefinition::ArrayTransform {
            element_transform: TransformRef::Inline(inner),
        } => visit_definitions(inner, visit),
        TransformDefinition::ObjectTransform { fields } => {
            for (_, spec) in fields {
                if let ObjectFieldSpec::Detailed(detail) = spec {
                    if let Some(TransformRef::Inline(inner)) = &detail.transform {
                        visit_definitions(inner, visit);
                    }
                }
            }
        }
        _ => {}
    }
}

fn missing(table: &str, key: &str) -> Error {
    Error::configuration(format!("Mapping table '{}' is missing '{}'", table, key))
}

fn parse_formats(table: &str, raw: Option<&Value>) -> Result<Formats> {
    let formats = raw.and_then(Value::as_object).ok_or_else(|| missing(table, "formats"))?;
    let source = formats
        .get("source")
        .and_then(Value::as_str)
        .ok_or_else(|| missing(table, "formats.source"))?;
    let target = formats
        .get("target")
        .and_then(Value::as_str)
        .ok_or_else(|| missing(table, "formats.target"))?;
    Ok(Formats {
        source: source.to_string(),
        target: target.to_string(),
    })
}

fn parse_entries(table: &str, section: &str, raw: &Map<String, Value>) -> Result<Vec<FieldMappingEntry>> {
    raw.iter()
        .map(|(source_field, value)| -> Result<FieldMappingEntry> {
            let entry: FieldEntry = serde_json::from_value(value.clone()).map_err(|e| Error::Configuration {
                message: format!(
                    "Mapping table '{}': {}.{} must be a target path or a field mapping record",
                    table, section, source_field
                ),
                source: Some(e.into()),
            })?;
            Ok(FieldMappingEntry {
                source_field: source_field.clone(),
                mapping: FieldMapping::from(entry),
            })
        })
        .collect()
}

fn parse_transforms(table: &str, raw: Option<&Value>) -> Result<HashMap<String, TransformDefinition>> {
    let definitions = match raw {
        None | Some(Value::Null) => return Ok(HashMap::new()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(Error::configuration(format!(
                "Mapping table '{}': 'transformFunctions' must be an object",
                table
            )))
        }
    };

    let mut transforms = HashMap::with_capacity(definitions.len());
    for (name, raw_definition) in definitions {
        check_type_tags(table, name, raw_definition)?;
        let definition: TransformDefinition = serde_json::from_value(raw_definition.clone())
            .map_err(|e| Error::Configuration {
                message: format!("Mapping table '{}': invalid transform '{}': {}", table, name, e),
                source: Some(e.into()),
            })?;
        transforms.insert(name.clone(), definition);
    }
    Ok(transforms)
}

/// Reject unknown `type` tags before decoding so the error names the tag
fn check_type_tags(table: &str, owner: &str, raw: &Value) -> Result<()> {
    let Some(object) = raw.as_object() else {
        return Ok(());
    };

    if let Some(tag) = object.get("type") {
        let known = tag.as_str().map_or(false, |t| TRANSFORM_TYPES.contains(&t));
        if !known {
            let name = tag.as_str().map(str::to_string).unwrap_or_else(|| tag.to_string());
            return Err(Error::unknown_transform(
                name,
                Some(format!("transformFunctions.{} in table '{}'", owner, table)),
            ));
        }
    }

    if let Some(element) = object.get("elementTransform") {
        check_type_tags(table, owner, element)?;
    }
    if let Some(Value::Object(fields)) = object.get("fields") {
        for field in fields.values() {
            if let Some(nested) = field.get("transform") {
                check_type_tags(table, owner, nested)?;
            }
        }
    }
    Ok(())
}
