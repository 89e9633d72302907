//! Canonical message format handed to provider adapters

use serde::{Deserialize, Serialize};

/// Unified message structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn with_content(role: MessageRole, content: MessageContent) -> Self {
        Self { role, content }
    }

    /// Plain text of the message, concatenating text blocks.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(s) => s.clone(),
            MessageContent::Blocks(bs) => bs
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn contains_image(&self) -> bool {
        match &self.content {
            MessageContent::Text(_) => false,
            MessageContent::Blocks(bs) => {
                bs.iter().any(|b| matches!(b, ContentBlock::Image { .. }))
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match &self.content {
            MessageContent::Text(s) if s.is_empty() => Err("content: required".to_string()),
            MessageContent::Text(_) => Ok(()),
            MessageContent::Blocks(bs) if bs.is_empty() => Err("content: required".to_string()),
            MessageContent::Blocks(bs) => {
                for (i, b) in bs.iter().enumerate() {
                    b.validate().map_err(|e| format!("block {}: {}", i, e))?;
                    if self.role == MessageRole::System && !matches!(b, ContentBlock::Text { .. })
                    {
                        return Err(format!("block {}: system messages only accept text", i));
                    }
                }
                Ok(())
            }
        }
    }
}

/// Validate a conversation before it is handed to a request initializer.
pub fn validate_messages(messages: &[Message]) -> Result<(), String> {
    if messages.is_empty() {
        return Err("at least one message is required".to_string());
    }
    for (i, m) in messages.iter().enumerate() {
        m.validate().map_err(|e| format!("message {}: {}", i, e))?;
    }
    Ok(())
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Message content (can be string or array of content blocks)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    pub fn text(text: impl Into<String>) -> Self {
        MessageContent::Text(text.into())
    }

    pub fn blocks(blocks: Vec<ContentBlock>) -> Self {
        MessageContent::Blocks(blocks)
    }
}

/// Content block (for multimodal input or tool round trips)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ImageSource },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: serde_json::Value,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        ContentBlock::Image {
            source: ImageSource {
                source_type: "url".to_string(),
                media_type: None,
                data: url.into(),
            },
        }
    }

    pub fn image_base64(data: String, media_type: Option<String>) -> Self {
        ContentBlock::Image {
            source: ImageSource {
                source_type: "base64".to_string(),
                media_type,
                data,
            },
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            ContentBlock::Text { text } if text.is_empty() => Err("text: required".to_string()),
            ContentBlock::Image { source } if source.data.is_empty() => {
                Err("image: data required".to_string())
            }
            ContentBlock::ToolUse { id, name, .. } if id.is_empty() && name.is_empty() => {
                Err("tool_use: id or name required".to_string())
            }
            ContentBlock::ToolResult { tool_use_id, .. } if tool_use_id.is_empty() => {
                Err("tool_result: tool_use_id required".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub data: String, // base64 encoded or URL
}
