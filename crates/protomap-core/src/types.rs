//! Core types and data structures for the protomap conversion engine
//!
//! This module defines the declarative records a mapping table is made of,
//! the module configuration surface, and the result types handed back to
//! callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::agents::AgentKind;

/// Per-field constraint block evaluated by the validation engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    /// Accept `null`, `""` and `[]`
    #[serde(default)]
    pub allow_empty: bool,

    /// Minimum string length (characters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    /// Maximum string length (characters)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Minimum numeric value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    /// Maximum numeric value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    /// Enumeration of accepted values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,

    /// Regular expression strings must match
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// How a single source field is carried into the output object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    /// Dot-separated output path, e.g. `input.messages`
    pub target_field: String,

    /// Name of a table transform applied before writing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,

    /// Value written when the source field is absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// Fail when the source field is absent and no default exists
    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,
}

impl FieldMapping {
    /// A plain rename with no transform, default, or validation
    pub fn rename(target_field: impl Into<String>) -> Self {
        Self {
            target_field: target_field.into(),
            transform: None,
            default_value: None,
            required: false,
            validation: None,
        }
    }
}

/// A `fieldMappings` value as authored: either a bare target name or a full record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldEntry {
    Rename(String),
    Mapping(FieldMapping),
}

impl From<FieldEntry> for FieldMapping {
    fn from(entry: FieldEntry) -> Self {
        match entry {
            FieldEntry::Rename(target) => FieldMapping::rename(target),
            FieldEntry::Mapping(mapping) => mapping,
        }
    }
}

/// A normalized field mapping paired with its source field name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMappingEntry {
    pub source_field: String,
    #[serde(flatten)]
    pub mapping: FieldMapping,
}

/// Identifiers of the two wire shapes a table converts between
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Formats {
    pub source: String,
    pub target: String,
}

impl Formats {
    /// The same pair with source and target exchanged
    pub fn swapped(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
        }
    }
}

/// JSON value kinds accepted by `types` constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    Null,
}

impl ValueKind {
    /// Whether `value` is of this kind
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ValueKind::String => value.is_string(),
            ValueKind::Number => value.is_number(),
            ValueKind::Integer => value.is_i64() || value.is_u64(),
            ValueKind::Boolean => value.is_boolean(),
            ValueKind::Array => value.is_array(),
            ValueKind::Object => value.is_object(),
            ValueKind::Null => value.is_null(),
        }
    }

    /// Kind name of an arbitrary value, for error messages
    pub fn describe(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(n) if n.is_f64() => "number",
            Value::Number(_) => "integer",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Null => "null",
        };
        write!(f, "{}", name)
    }
}

pub const DEFAULT_MAX_DEPTH: usize = 32;
pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 10_000;

fn default_forbidden_fields() -> Vec<String> {
    vec![
        "__proto__".to_string(),
        "constructor".to_string(),
        "prototype".to_string(),
    ]
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_array_length() -> usize {
    DEFAULT_MAX_ARRAY_LENGTH
}

/// Table-level constraints applied to the whole input object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    /// Top-level fields that must be present
    #[serde(default)]
    pub required: Vec<String>,

    /// Expected kind per top-level field
    #[serde(default)]
    pub types: BTreeMap<String, ValueKind>,

    /// Field names rejected anywhere in the input
    #[serde(default = "default_forbidden_fields")]
    pub forbidden_fields: Vec<String>,

    /// Maximum object/array nesting depth
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum length of any array in the input
    #[serde(default = "default_max_array_length")]
    pub max_array_length: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            required: Vec::new(),
            types: BTreeMap::new(),
            forbidden_fields: default_forbidden_fields(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
        }
    }
}

/// Outcome of a non-failing validation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformed_data: Option<Value>,
}

/// Conversion direction of a compatibility module
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Requests converted source → target; responses untouched
    #[default]
    #[serde(rename = "a-to-b")]
    AToB,
    /// Requests converted target → source; responses untouched
    #[serde(rename = "b-to-a")]
    BToA,
    /// Requests converted source → target, responses target → source
    #[serde(rename = "bidirectional")]
    Bidirectional,
}

impl Direction {
    /// Whether this direction needs a reverse table
    pub fn needs_reverse(&self) -> bool {
        matches!(self, Direction::BToA | Direction::Bidirectional)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AToB => write!(f, "a-to-b"),
            Direction::BToA => write!(f, "b-to-a"),
            Direction::Bidirectional => write!(f, "bidirectional"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a-to-b" => Ok(Direction::AToB),
            "b-to-a" => Ok(Direction::BToA),
            "bidirectional" => Ok(Direction::Bidirectional),
            other => Err(crate::Error::configuration(format!(
                "Unknown direction '{}', expected one of: a-to-b, b-to-a, bidirectional",
                other
            ))),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Module-level input validation, applied before mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleValidation {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub types: BTreeMap<String, ValueKind>,
    #[serde(default)]
    pub constraints: BTreeMap<String, FieldValidation>,
}

impl Default for ModuleValidation {
    fn default() -> Self {
        Self {
            enabled: true,
            required: Vec::new(),
            types: BTreeMap::new(),
            constraints: BTreeMap::new(),
        }
    }
}

/// Which content agents are enabled and which one catches everything else
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    #[serde(default = "default_true")]
    pub enable_image_agent: bool,
    #[serde(default = "default_true")]
    pub enable_code_agent: bool,
    #[serde(default = "default_true")]
    pub enable_tool_agent: bool,
    #[serde(default)]
    pub default_agent: AgentKind,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enable_image_agent: true,
            enable_code_agent: true,
            enable_tool_agent: true,
            default_agent: AgentKind::General,
        }
    }
}

/// Configuration surface of one compatibility module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleConfig {
    /// Name of the mapping table to load
    pub mapping_table: String,

    #[serde(default)]
    pub strict_mapping: bool,

    #[serde(default)]
    pub preserve_unknown_fields: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ModuleValidation>,

    #[serde(default)]
    pub direction: Direction,

    #[serde(default)]
    pub enable_agents: bool,

    #[serde(default)]
    pub agent_config: AgentConfig,
}

impl ModuleConfig {
    /// Configuration with defaults for everything but the table name
    pub fn new(mapping_table: impl Into<String>) -> Self {
        Self {
            mapping_table: mapping_table.into(),
            strict_mapping: false,
            preserve_unknown_fields: false,
            validation: None,
            direction: Direction::default(),
            enable_agents: false,
            agent_config: AgentConfig::default(),
        }
    }
}

/// Snapshot describing a configured compatibility module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompatibilityInfo {
    pub direction: Direction,
    pub mapping_table: String,
    pub model_mappings: Map<String, Value>,
    pub supported_conversions: Vec<String>,
    pub agent_enabled: bool,
    pub available_agents: Vec<String>,
}

/// Serde helpers for JSON objects whose key order is significant
///
/// Entries are kept as `(key, value)` pairs in document order.
pub(crate) mod ordered_map {
    use serde::de::{DeserializeOwned, Error as _};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::{Map, Value};

    pub fn serialize<S, T>(entries: &[(String, T)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(key, value)| {
                serde_json::from_value(value)
                    .map(|parsed| (key.clone(), parsed))
                    .map_err(|e| D::Error::custom(format!("field '{}': {}", key, e)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_entry_accepts_rename_and_record() {
        let rename: FieldEntry = serde_json::from_value(json!("input.messages")).unwrap();
        assert_eq!(
            FieldMapping::from(rename),
            FieldMapping::rename("input.messages")
        );

        let record: FieldEntry = serde_json::from_value(json!({
            "targetField": "parameters.temperature",
            "required": true,
            "validation": {"min": 0, "max": 2}
        }))
        .unwrap();
        let mapping = FieldMapping::from(record);
        assert_eq!(mapping.target_field, "parameters.temperature");
        assert!(mapping.required);
        assert_eq!(mapping.validation.unwrap().max, Some(2.0));
    }

    #[test]
    fn test_direction_serde_spelling() {
        assert_eq!(serde_json::to_value(Direction::AToB).unwrap(), json!("a-to-b"));
        let parsed: Direction = serde_json::from_value(json!("bidirectional")).unwrap();
        assert_eq!(parsed, Direction::Bidirectional);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_module_config_defaults() {
        let config: ModuleConfig =
            serde_json::from_value(json!({"mappingTable": "openai-dashscope"})).unwrap();
        assert!(!config.strict_mapping);
        assert!(!config.preserve_unknown_fields);
        assert_eq!(config.direction, Direction::AToB);
        assert!(config.agent_config.enable_image_agent);
        assert_eq!(config.agent_config.default_agent, AgentKind::General);
    }

    #[test]
    fn test_value_kind_integer_vs_number() {
        assert!(ValueKind::Integer.matches(&json!(3)));
        assert!(!ValueKind::Integer.matches(&json!(3.5)));
        assert!(ValueKind::Number.matches(&json!(3)));
        assert_eq!(ValueKind::describe(&json!([1])), "array");
    }

    #[test]
    fn test_validation_rules_defaults() {
        let rules: ValidationRules = serde_json::from_value(json!({"required": ["model"]})).unwrap();
        assert_eq!(rules.required, vec!["model".to_string()]);
        assert!(rules.forbidden_fields.contains(&"__proto__".to_string()));
        assert_eq!(rules.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_module_validation_default_matches_serde() {
        let parsed: ModuleValidation = serde_json::from_value(json!({})).unwrap();
        assert_eq!(ModuleValidation::default(), parsed);
        assert!(ModuleValidation::default().enabled);

        let partial = ModuleValidation {
            required: vec!["user".to_string()],
            ..Default::default()
        };
        assert!(partial.enabled);
    }
}
