//! Compatibility modules
//!
//! A `CompatibilityModule` is one configured conversion between a client wire
//! format and a vendor wire format. It owns the compiled forward table, the
//! reverse table when its direction needs one, and the agent dispatcher when
//! agents are enabled. All of these are built once at configuration time;
//! conversions afterwards are pure and may run concurrently.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use crate::agents::AgentDispatcher;
use crate::translation::mapper::{ApplyOptions, FieldMappingApplier};
use crate::translation::reverse::{reverse_table, DerivationWarning, ReverseMapping};
use crate::translation::validator::{PatternCache, ValidationMode, Validator};
use crate::translation::{ConversionContext, MappingTable, MappingTableStore};
use crate::types::{
    CompatibilityInfo, Direction, FieldMappingEntry, ModuleConfig, ValidationResult,
};
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// A configured, ready-to-use conversion between two wire formats
#[derive(Debug, Clone)]
pub struct CompatibilityModule {
    config: ModuleConfig,
    forward: Arc<MappingTable>,
    reverse: Option<ReverseMapping>,
    dispatcher: Option<AgentDispatcher>,
    module_patterns: PatternCache,
}

impl CompatibilityModule {
    /// Configure a module from tables available without network access
    pub fn new(config: ModuleConfig, store: &MappingTableStore) -> Result<Self> {
        check_config(&config)?;
        let table = store.load_sync(&config.mapping_table)?;
        Self::build(config, table)
    }

    /// Configure a module, loading its table from any source
    pub async fn initialize(config: ModuleConfig, store: &MappingTableStore) -> Result<Self> {
        check_config(&config)?;
        let table = store.load(&config.mapping_table).await?;
        Self::build(config, table)
    }

    /// Configure a module around an already compiled table
    pub fn with_table(config: ModuleConfig, table: Arc<MappingTable>) -> Result<Self> {
        check_config(&config)?;
        Self::build(config, table)
    }

    fn build(config: ModuleConfig, forward: Arc<MappingTable>) -> Result<Self> {
        let reverse = if config.direction.needs_reverse() {
            Some(reverse_table(&forward, config.strict_mapping)?)
        } else {
            None
        };

        let dispatcher = config
            .enable_agents
            .then(|| AgentDispatcher::from_config(&config.agent_config));

        let mut module_patterns = PatternCache::new();
        if let Some(validation) = &config.validation {
            for constraints in validation.constraints.values() {
                if let Some(pattern) = &constraints.pattern {
                    module_patterns.insert(pattern, "")?;
                }
            }
        }

        tracing::info!(
            table = %forward.name(),
            direction = %config.direction,
            agents = config.enable_agents,
            reverse_derived = reverse.as_ref().map_or(false, |r| r.derived),
            "Configured compatibility module"
        );

        Ok(Self {
            config,
            forward,
            reverse,
            dispatcher,
            module_patterns,
        })
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn direction(&self) -> Direction {
        self.config.direction
    }

    /// The forward table as loaded
    pub fn table(&self) -> &MappingTable {
        &self.forward
    }

    /// The reverse table, for directions that use one
    pub fn reverse_table(&self) -> Option<&MappingTable> {
        self.reverse.as_ref().map(|r| &r.table)
    }

    /// Lossy steps taken while deriving the reverse table
    pub fn derivation_warnings(&self) -> &[DerivationWarning] {
        match &self.reverse {
            Some(reverse) => &reverse.warnings,
            None => &[],
        }
    }

    /// Forward field mappings in declaration order
    pub fn field_mappings(&self) -> &[FieldMappingEntry] {
        self.forward.entries()
    }

    fn options(&self) -> ApplyOptions {
        ApplyOptions::from(&self.config)
    }

    /// Table requests are mapped with
    fn request_table(&self) -> &MappingTable {
        match (self.config.direction, &self.reverse) {
            (Direction::BToA, Some(reverse)) => &reverse.table,
            _ => &self.forward,
        }
    }

    /// Convert a client request into the provider's shape
    #[tracing::instrument(
        name = "convert_request",
        skip_all,
        fields(
            table = %self.forward.name(),
            direction = %self.config.direction,
            request_id = %ctx.request_id(),
            model = ctx.model_for(input).unwrap_or("-"),
        )
    )]
    pub fn convert_request(&self, input: &Value, ctx: &ConversionContext) -> Result<Value> {
        if let Some(validation) = &self.config.validation {
            let validator = Validator::new(&self.module_patterns);
            Validator::enforce(validator.module_violations(require_object(input)?, validation)?)?;
        }

        let applier = FieldMappingApplier::new(self.request_table());
        let options = self.options();
        match &self.dispatcher {
            Some(dispatcher) => {
                let (agent, output) = dispatcher.process(input, &applier, &options)?;
                tracing::debug!(agent = agent.name(), "Request handled by agent");
                Ok(output)
            }
            None => applier.apply(input, &options),
        }
    }

    /// Convert a provider response back into the client's shape
    ///
    /// Only bidirectional modules map responses; the other directions return
    /// the response unchanged.
    #[tracing::instrument(
        name = "convert_response",
        skip_all,
        fields(
            table = %self.forward.name(),
            direction = %self.config.direction,
            request_id = %ctx.request_id(),
        )
    )]
    pub fn convert_response(&self, input: &Value, ctx: &ConversionContext) -> Result<Value> {
        match (self.config.direction, &self.reverse) {
            (Direction::Bidirectional, Some(reverse)) => {
                FieldMappingApplier::new(&reverse.table).apply(input, &self.options())
            }
            _ => Ok(input.clone()),
        }
    }

    /// Describe this module's configuration
    pub fn compatibility_info(&self) -> CompatibilityInfo {
        let formats = self.forward.formats();
        let forward = format!("{}->{}", formats.source, formats.target);
        let backward = format!("{}->{}", formats.target, formats.source);
        let supported_conversions = match self.config.direction {
            Direction::AToB => vec![forward],
            Direction::BToA => vec![backward],
            Direction::Bidirectional => vec![forward, backward],
        };

        CompatibilityInfo {
            direction: self.config.direction,
            mapping_table: self.config.mapping_table.clone(),
            model_mappings: self.forward.model_mappings(),
            supported_conversions,
            agent_enabled: self.dispatcher.is_some(),
            available_agents: self
                .dispatcher
                .as_ref()
                .map(|d| d.available().iter().map(|a| a.name().to_string()).collect())
                .unwrap_or_default(),
        }
    }

    /// Check a request without failing fast
    ///
    /// Every violation is reported. Fields that would be silently dropped
    /// appear as warnings, and the converted request is attached when
    /// conversion succeeds.
    pub fn validate(&self, input: &Value) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let options = self.options();
        let table = self.request_table();
        let applier = FieldMappingApplier::new(table);

        if let (Some(validation), Some(object)) = (&self.config.validation, input.as_object()) {
            let validator = Validator::with_mode(&self.module_patterns, ValidationMode::Lenient);
            match validator.module_violations(object, validation) {
                Ok(violations) => errors.extend(violations.into_iter().map(|v| Error::from(v).to_string())),
                Err(err) => errors.push(err.to_string()),
            }
        }

        errors.extend(
            applier
                .collect_errors(input, &options)
                .into_iter()
                .map(|e| e.to_string()),
        );

        if let Some(object) = input.as_object() {
            if !options.preserve_unknown_fields && !options.strict_mapping {
                warnings.extend(applier.unmapped_fields(object).into_iter().map(|field| {
                    format!("Field '{}' is not in mapping table '{}' and will be dropped", field, table.name())
                }));
            }
        }

        let transformed_data = if errors.is_empty() {
            match self.convert_request(input, &ConversionContext::new()) {
                Ok(output) => Some(output),
                Err(err) => {
                    errors.push(err.to_string());
                    None
                }
            }
        } else {
            None
        };

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
            transformed_data,
        }
    }
}

fn check_config(config: &ModuleConfig) -> Result<()> {
    if config.mapping_table.trim().is_empty() {
        return Err(Error::configuration(
            "Module configuration must name a mappingTable",
        ));
    }
    Ok(())
}

fn require_object(input: &Value) -> Result<&serde_json::Map<String, Value>> {
    input.as_object().ok_or_else(|| {
        Error::validation(
            "$",
            crate::error::Constraint::Type,
            "Input must be a JSON object",
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Constraint;
    use crate::types::ModuleValidation;
    use serde_json::json;

    fn module(config: ModuleConfig) -> CompatibilityModule {
        CompatibilityModule::new(config, &MappingTableStore::new()).unwrap()
    }

    fn chat_request() -> Value {
        json!({
            "model": "gpt-4",
            "messages": [{"role": "user", "content": "hi"}],
            "temperature": 0.7
        })
    }

    #[test]
    fn test_a_to_b_maps_requests_and_passes_responses() {
        let m = module(ModuleConfig::new("openai-dashscope"));
        let out = m.convert_request(&chat_request(), &ConversionContext::new()).unwrap();
        assert_eq!(out["model"], json!("qwen-max"));
        assert_eq!(out["input"]["messages"][0]["content"], json!("hi"));
        assert_eq!(out["parameters"]["temperature"], json!(0.7));
        assert_eq!(out["parameters"]["result_format"], json!("message"));

        let response = json!({"output": {"text": "hello"}});
        assert_eq!(
            m.convert_response(&response, &ConversionContext::new()).unwrap(),
            response
        );
        assert!(m.reverse_table().is_none());
    }

    #[test]
    fn test_bidirectional_uses_authored_reverse_for_responses() {
        let mut config = ModuleConfig::new("openai-dashscope");
        config.direction = Direction::Bidirectional;
        config.strict_mapping = true;
        let m = module(config);
        assert!(m.derivation_warnings().is_empty());

        let response = json!({
            "request_id": "r-1",
            "output": {"choices": [{"finish_reason": null, "message": {"role": "assistant", "content": "hello"}}]},
            "usage": {"input_tokens": 5, "output_tokens": 2, "total_tokens": 7}
        });
        let out = m.convert_response(&response, &ConversionContext::new()).unwrap();
        assert_eq!(out["id"], json!("r-1"));
        assert_eq!(out["choices"][0]["finish_reason"], json!("stop"));
        assert_eq!(out["usage"]["prompt_tokens"], json!(5));
        assert_eq!(out["usage"]["total_tokens"], json!(7));
    }

    #[test]
    fn test_bidirectional_rejects_inconsistent_usage() {
        let mut config = ModuleConfig::new("openai-dashscope");
        config.direction = Direction::Bidirectional;
        let m = module(config);
        let response = json!({
            "request_id": "r-1",
            "usage": {"input_tokens": 5, "output_tokens": 2, "total_tokens": 9}
        });
        let err = m.convert_response(&response, &ConversionContext::new()).unwrap_err();
        assert_eq!(err.constraint(), Some(&Constraint::Rule("sum_equals_total".to_string())));
    }

    #[test]
    fn test_b_to_a_maps_requests_with_reverse_table() {
        let mut config = ModuleConfig::new("openai-agent-task");
        config.direction = Direction::BToA;
        let m = module(config);
        let vendor = json!({
            "agent": {"model": "gpt-4"},
            "task": {"messages": [{"role": "user", "content": "hi"}], "config": {"stream": true}}
        });
        let out = m.convert_request(&vendor, &ConversionContext::new()).unwrap();
        assert_eq!(out["model"], json!("gpt-4"));
        assert_eq!(out["messages"][0]["content"], json!("hi"));
        assert_eq!(out["stream"], json!(true));
        assert_eq!(
            m.compatibility_info().supported_conversions,
            vec!["agent-task->openai-chat".to_string()]
        );
    }

    #[test]
    fn test_agents_tag_output() {
        let mut config = ModuleConfig::new("openai-agent-task");
        config.enable_agents = true;
        let m = module(config);
        let mut request = chat_request();
        request["tools"] = json!([{"type": "function", "function": {"name": "search"}}]);
        let out = m.convert_request(&request, &ConversionContext::new()).unwrap();
        assert_eq!(out["metadata"]["agent"], json!("tool"));
        assert_eq!(out["task"]["tools"][0]["function"]["name"], json!("search"));

        let info = m.compatibility_info();
        assert!(info.agent_enabled);
        assert_eq!(info.available_agents, vec!["image", "code", "tool", "general"]);
    }

    #[test]
    fn test_compatibility_info_reports_model_mappings() {
        let info = module(ModuleConfig::new("openai-dashscope")).compatibility_info();
        assert_eq!(info.model_mappings.get("gpt-4"), Some(&json!("qwen-max")));
        assert_eq!(info.supported_conversions, vec!["openai-chat->dashscope-generation".to_string()]);
        assert!(!info.agent_enabled);
        assert!(info.available_agents.is_empty());
    }

    #[test]
    fn test_module_validation_runs_before_mapping() {
        let mut config = ModuleConfig::new("openai-dashscope");
        config.validation = Some(ModuleValidation {
            required: vec!["user".to_string()],
            ..ModuleValidation::default()
        });
        let m = module(config);
        let err = m.convert_request(&chat_request(), &ConversionContext::new()).unwrap_err();
        assert_eq!(err.field(), Some("user"));
        assert_eq!(err.constraint(), Some(&Constraint::Required));
    }

    #[test]
    fn test_validate_collects_errors_and_warnings() {
        let m = module(ModuleConfig::new("openai-dashscope"));

        let mut ok = chat_request();
        ok["logit_bias"] = json!({});
        let result = m.validate(&ok);
        assert!(result.is_valid);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("logit_bias"));
        assert!(result.transformed_data.is_some());

        let bad = json!({"temperature": 5, "top_p": 3});
        let result = m.validate(&bad);
        assert!(!result.is_valid);
        assert!(result.errors.len() >= 4);
        assert!(result.transformed_data.is_none());
    }

    #[test]
    fn test_validate_reports_missing_model_once() {
        let m = module(ModuleConfig::new("openai-dashscope"));
        let result = m.validate(&json!({"messages": [{"role": "user", "content": "hi"}]}));
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["Required field missing: model".to_string()]);
        assert!(result.transformed_data.is_none());
    }

    #[test]
    fn test_empty_table_name_rejected() {
        let err = CompatibilityModule::new(ModuleConfig::new(" "), &MappingTableStore::new()).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_initialize_async() {
        let m = CompatibilityModule::initialize(
            ModuleConfig::new("openai-agent-task"),
            &MappingTableStore::new(),
        )
        .await
        .unwrap();
        assert_eq!(m.field_mappings()[0].source_field, "model");
    }
}
