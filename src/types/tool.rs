//! Tool calling definitions shared by every provider adapter

use serde::{Deserialize, Serialize};

/// Tool definition (for function calling)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// JSON Schema of the arguments object.
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    pub fn with_parameters(mut self, schema: serde_json::Value) -> Self {
        self.parameters = schema;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("field name: required".to_string());
        }
        if self
            .name
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        {
            return Err(format!(
                "field name: {:?} must only contain [a-zA-Z0-9_-]",
                self.name
            ));
        }
        if !self.parameters.is_null() && !self.parameters.is_object() {
            return Err("field parameters: must be a JSON schema object".to_string());
        }
        Ok(())
    }
}

/// Whether the model may, must or must not call tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    #[default]
    Any,
    Required,
    None,
}

/// Tool call (invocation from model)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier, needed for parallel calls. Some providers only set the name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Raw JSON text of the arguments, exactly as streamed by the provider.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub arguments: String,
    /// Provider-specific payload that must be echoed back on the next turn.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub opaque: serde_json::Map<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
            opaque: serde_json::Map::new(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.id.is_empty() && self.name.is_empty() && self.arguments.is_empty()
    }

    /// An empty `arguments` string is accepted as "no arguments".
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() && self.name.is_empty() {
            return Err("at least one of field id or name is required".to_string());
        }
        if !self.arguments.trim().is_empty() {
            serde_json::from_str::<serde_json::Value>(&self.arguments)
                .map_err(|e| format!("field arguments: {}", e))?;
        }
        Ok(())
    }

    /// Decode the arguments into a typed value.
    pub fn decode_arguments<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        if self.arguments.trim().is_empty() {
            return serde_json::from_str("{}");
        }
        serde_json::from_str(&self.arguments)
    }
}

/// Tool result (response to tool call)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool_use_id: String,
    pub content: serde_json::Value,
    #[serde(default)]
    pub is_error: bool,
}
