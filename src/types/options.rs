//! Generation options shared by all providers.
//!
//! Adapters translate what they support and report the rest through
//! [`UnsupportedOptions`](crate::error::UnsupportedOptions).

use crate::types::tool::{ToolChoice, ToolDefinition};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const MAX_TOKENS_LIMIT: u64 = 1024 * 1024 * 1024;

/// Options for one text generation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Only sample among the N most likely candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system_prompt: String,

    /// Any valid JSON. The prompt should still ask for JSON.
    #[serde(default)]
    pub reply_as_json: bool,
    /// JSON schema the reply must follow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decode_as: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub tool_choice: ToolChoice,

    /// Return per-token log probabilities.
    #[serde(default)]
    pub logprobs: bool,
    /// Number of alternatives to return per token position, when `logprobs` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_logprobs: Option<u32>,
}

impl GenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn temperature(mut self, t: f64) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn max_tokens(mut self, n: u64) -> Self {
        self.max_tokens = Some(n);
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = choice;
        self
    }

    pub fn logprobs(mut self, top: Option<u32>) -> Self {
        self.logprobs = true;
        self.top_logprobs = top;
        self
    }

    /// Check ranges and tool consistency. Errors are phrased for the caller.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(seed) = self.seed {
            if seed < 0 {
                return Err("field seed: must be non-negative".to_string());
            }
        }
        if let Some(t) = self.temperature {
            if !(0.0..=100.0).contains(&t) {
                return Err("field temperature: must be [0, 100]".to_string());
            }
        }
        if let Some(n) = self.max_tokens {
            if n > MAX_TOKENS_LIMIT {
                return Err("field max_tokens: must be [0, 1 GiB]".to_string());
            }
        }
        if let Some(p) = self.top_p {
            if !(0.0..=1.0).contains(&p) {
                return Err("field top_p: must be [0, 1]".to_string());
            }
        }
        if let Some(k) = self.top_k {
            if k > 1024 {
                return Err("field top_k: must be [0, 1024]".to_string());
            }
        }
        if let Some(schema) = &self.decode_as {
            if !schema.is_object() {
                return Err("field decode_as: must be a JSON schema object".to_string());
            }
        }
        if self.top_logprobs.is_some() && !self.logprobs {
            return Err("field top_logprobs: requires logprobs".to_string());
        }
        let mut names: HashMap<&str, usize> = HashMap::new();
        for (i, t) in self.tools.iter().enumerate() {
            t.validate().map_err(|e| format!("tool {}: {}", i, e))?;
            if let Some(j) = names.insert(t.name.as_str(), i) {
                return Err(format!(
                    "tool {}: has name {:?} which is the same as tool {}",
                    i, t.name, j
                ));
            }
        }
        if self.tools.is_empty() && self.tool_choice == ToolChoice::Required {
            return Err("field tool_choice is required: tools are required".to_string());
        }
        Ok(())
    }
}
