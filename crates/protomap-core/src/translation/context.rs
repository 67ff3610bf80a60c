//! Per-call conversion context
//!
//! Copyright (c) 2025 Protomap Team
//! Licensed under the Apache-2.0 license

use serde_json::Value;
use std::collections::HashMap;

/// Caller-supplied information carried alongside one conversion
///
/// The context never changes what a conversion produces; it identifies the
/// call in tracing spans and lets callers attach hints for their own use.
#[derive(Debug, Clone, Default)]
pub struct ConversionContext {
    /// Correlates the request and response passes of one exchange
    pub request_id: Option<String>,

    /// Model named by the caller, when known ahead of mapping
    pub model: Option<String>,

    /// Provider the converted payload is routed to
    pub provider: Option<String>,

    /// Custom context data for tracking state
    pub custom_data: HashMap<String, Value>,
}

impl ConversionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Request id, or `-` when the caller gave none
    pub fn request_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or("-")
    }

    /// Model hint, falling back to the payload's `model` field
    pub fn model_for<'a>(&'a self, payload: &'a Value) -> Option<&'a str> {
        self.model
            .as_deref()
            .or_else(|| payload.get("model").and_then(Value::as_str))
    }

    /// Add custom data to the context
    pub fn set_custom_data(&mut self, key: impl Into<String>, value: Value) {
        self.custom_data.insert(key.into(), value);
    }

    /// Get custom data from the context
    pub fn get_custom_data(&self, key: &str) -> Option<&Value> {
        self.custom_data.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_hint_falls_back_to_payload() {
        let payload = json!({"model": "gpt-4"});
        assert_eq!(ConversionContext::new().model_for(&payload), Some("gpt-4"));
        assert_eq!(
            ConversionContext::new().with_model("qwen-max").model_for(&payload),
            Some("qwen-max")
        );
    }

    #[test]
    fn test_custom_data() {
        let mut ctx = ConversionContext::new().with_request_id("req-1");
        ctx.set_custom_data("attempt", json!(2));
        assert_eq!(ctx.request_id(), "req-1");
        assert_eq!(ctx.get_custom_data("attempt"), Some(&json!(2)));
        assert_eq!(ConversionContext::new().request_id(), "-");
    }
}
