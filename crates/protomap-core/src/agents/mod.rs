//! Content-based agent dispatch
//!
//! Agent-oriented providers route each request to one of a fixed set of
//! content handlers. Classification is a linear scan in priority order
//! (`image`, `code`, `tool`) over the enabled agents; the first match wins and
//! the configured default agent catches everything else. The chosen agent
//! wraps the field mapping applier and tags the output with its metadata.
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use crate::translation::mapper::{ApplyOptions, FieldMappingApplier};
use crate::types::AgentConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;


/// The content handlers a request can be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Image,
    Code,
    Tool,
    #[default]
    General,
}

impl AgentKind {
    /// Classification order; earlier entries win
    pub const PRIORITY: [AgentKind; 4] = [
        AgentKind::Image,
        AgentKind::Code,
        AgentKind::Tool,
        AgentKind::General,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Image => "image",
            AgentKind::Code => "code",
            AgentKind::Tool => "tool",
            AgentKind::General => "general",
        }
    }

    /// Tag written to `metadata.processingType`
    pub fn processing_type(&self) -> &'static str {
        match self {
            AgentKind::Image => "multimodal",
            AgentKind::Code => "code_analysis",
            AgentKind::Tool => "tool_execution",
            AgentKind::General => "general_chat",
        }
    }

    /// Named tool set advertised in `metadata.agentTools`
    pub fn tools(&self) -> &'static [&'static str] {
        match self {
            AgentKind::Image => &["image_analysis", "ocr"],
            AgentKind::Code => &["code_execution", "syntax_check"],
            AgentKind::Tool => &["function_calling"],
            AgentKind::General => &[],
        }
    }

    /// Whether this agent should handle `request`
    pub fn classify(&self, request: &Value) -> bool {
        match self {
            AgentKind::Image => has_image_content(request),
            AgentKind::Code => has_code_content(request),
            AgentKind::Tool => requests_tools(request),
            AgentKind::General => true,
        }
    }

    /// Tag `output` with this agent's metadata
    ///
    /// Keys are merged into an existing `metadata` object; any other
    /// `metadata` value is replaced.
    pub fn overlay_metadata(&self, output: &mut Value) {
        let Value::Object(root) = output else {
            return;
        };
        let metadata = root
            .entry("metadata".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !metadata.is_object() {
            *metadata = Value::Object(Map::new());
        }
        if let Value::Object(metadata) = metadata {
            metadata.insert("agent".to_string(), Value::from(self.name()));
            metadata.insert(
                "processingType".to_string(),
                Value::from(self.processing_type()),
            );
            if !self.tools().is_empty() {
                metadata.insert("agentTools".to_string(), Value::from(self.tools().to_vec()));
            }
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AgentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AgentKind::PRIORITY
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Unknown agent '{}', expected one of: image, code, tool, general",
                    s
                ))
            })
    }
}

/// Selects and runs the agent for each request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDispatcher {
    enabled: Vec<AgentKind>,
    default_agent: AgentKind,
}

impl AgentDispatcher {
    /// Dispatcher over the agents enabled in `config`
    pub fn from_config(config: &AgentConfig) -> Self {
        let enabled = AgentKind::PRIORITY
            .iter()
            .copied()
            .filter(|kind| match kind {
                AgentKind::Image => config.enable_image_agent,
                AgentKind::Code => config.enable_code_agent,
                AgentKind::Tool => config.enable_tool_agent,
                AgentKind::General => false,
            })
            .collect();
        Self {
            enabled,
            default_agent: config.default_agent,
        }
    }

    /// Agents this dispatcher can select, in priority order
    pub fn available(&self) -> Vec<AgentKind> {
        let mut agents = self.enabled.clone();
        if !agents.contains(&self.default_agent) {
            agents.push(self.default_agent);
        }
        agents
    }

    pub fn default_agent(&self) -> AgentKind {
        self.default_agent
    }

    /// First enabled agent whose classifier matches, else the default agent
    pub fn select(&self, request: &Value) -> AgentKind {
        self.enabled
            .iter()
            .copied()
            .find(|kind| kind.classify(request))
            .unwrap_or(self.default_agent)
    }

    /// Map `request` through the applier and tag it with the selected agent
    pub fn process(
        &self,
        request: &Value,
        applier: &FieldMappingApplier<'_>,
        options: &ApplyOptions,
    ) -> Result<(AgentKind, Value)> {
        let agent = self.select(request);
        tracing::debug!(agent = agent.name(), "Selected agent");
        let mut output = applier.apply(request, options)?;
        agent.overlay_metadata(&mut output);
        Ok((agent, output))
    }
}

fn messages(request: &Value) -> impl Iterator<Item = &Value> {
    request
        .get("messages")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

/// A multi-part message with an `image_url` part, or text mentioning an image
fn has_image_content(request: &Value) -> bool {
    messages(request).any(|message| match message.get("content") {
        Some(Value::Array(parts)) => parts.iter().any(|part| {
            part.get("type").and_then(Value::as_str) == Some("image_url")
                || part.get("image_url").is_some()
                || part
                    .get("text")
                    .and_then(Value::as_str)
                    .map_or(false, mentions_image)
        }),
        Some(Value::String(text)) => mentions_image(text),
        _ => false,
    })
}

fn mentions_image(text: &str) -> bool {
    text.to_lowercase().contains("image")
}

/// String content with a fenced code block or a `function`/`class` keyword
fn has_code_content(request: &Value) -> bool {
    messages(request).any(|message| {
        message
            .get("content")
            .and_then(Value::as_str)
            .map_or(false, |text| {
                text.contains("```")
                    || text
                        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                        .any(|word| word == "function" || word == "class")
            })
    })
}

/// A non-empty `tools` array, or a `tool_choice` other than `"auto"`
fn requests_tools(request: &Value) -> bool {
    let has_tools = request
        .get("tools")
        .and_then(Value::as_array)
        .map_or(false, |tools| !tools.is_empty());
    let forced_choice = match request.get("tool_choice") {
        None | Some(Value::Null) => false,
        Some(choice) => choice.as_str() != Some("auto"),
    };
    has_tools || forced_choice
}
