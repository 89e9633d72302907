//! Incremental output units produced while streaming.

use crate::types::tool::ToolCall;
use serde::{Deserialize, Serialize};

/// A reference backing part of a text reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Cited span of the reply, when the provider echoes it.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<CitationSource>,
}

impl Citation {
    pub fn validate(&self) -> Result<(), String> {
        if self.text.is_empty() && self.sources.is_empty() {
            return Err("citation: text or sources required".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_index, self.end_index) {
            if start > end {
                return Err(format!(
                    "citation: start_index {} is after end_index {}",
                    start, end
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CitationSource {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub snippet: String,
}

/// A generated file, either inline or by reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

impl Document {
    pub fn validate(&self) -> Result<(), String> {
        if self.url.is_empty() && self.data.is_empty() {
            return Err("document: url or data required".to_string());
        }
        if !self.url.is_empty() && !self.data.is_empty() {
            return Err("document: url and data are mutually exclusive".to_string());
        }
        Ok(())
    }
}

/// One incremental unit of streamed output.
///
/// At most one category is populated: text, reasoning (with its opaque payload), a completed
/// tool call, a citation or a document. The zero value carries nothing and is never delivered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reasoning: String,
    /// Provider payload attached to reasoning, e.g. a thinking signature.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub opaque: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
}

impl Fragment {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            reasoning: text.into(),
            ..Default::default()
        }
    }

    pub fn tool_call(tc: ToolCall) -> Self {
        Self {
            tool_call: Some(tc),
            ..Default::default()
        }
    }

    pub fn citation(c: Citation) -> Self {
        Self {
            citation: Some(c),
            ..Default::default()
        }
    }

    pub fn document(d: Document) -> Self {
        Self {
            document: Some(d),
            ..Default::default()
        }
    }

    pub fn with_opaque(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.opaque.insert(key.into(), value);
        self
    }

    fn categories(&self) -> Vec<&'static str> {
        let mut c = Vec::new();
        if !self.text.is_empty() {
            c.push("text");
        }
        if !self.reasoning.is_empty() || !self.opaque.is_empty() {
            c.push("reasoning");
        }
        if self.tool_call.as_ref().is_some_and(|t| !t.is_zero()) {
            c.push("tool_call");
        }
        if self.citation.is_some() {
            c.push("citation");
        }
        if self.document.is_some() {
            c.push("document");
        }
        c
    }

    pub fn is_empty(&self) -> bool {
        self.categories().is_empty()
    }

    pub fn validate(&self) -> Result<(), String> {
        let cats = self.categories();
        if cats.len() > 1 {
            return Err(format!("fragment mixes {}", cats.join(" and ")));
        }
        if let Some(tc) = self.tool_call.as_ref().filter(|t| !t.is_zero()) {
            tc.validate().map_err(|e| format!("tool_call: {}", e))?;
        }
        if let Some(c) = &self.citation {
            c.validate()?;
        }
        if let Some(d) = &self.document {
            d.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_fragment_is_empty_and_valid() {
        let f = Fragment::default();
        assert!(f.is_empty());
        assert!(f.validate().is_ok());
        let f = Fragment::tool_call(ToolCall::default());
        assert!(f.is_empty());
    }

    #[test]
    fn tool_call_cannot_share_a_fragment() {
        let mut f = Fragment::tool_call(ToolCall::new("1", "f", "{}"));
        assert!(f.validate().is_ok());
        f.text = "hi".into();
        let err = f.validate().unwrap_err();
        assert!(err.contains("text and tool_call"), "{}", err);
    }

    #[test]
    fn reasoning_may_carry_opaque() {
        let f = Fragment::reasoning("hmm").with_opaque("signature", serde_json::json!("abc"));
        assert!(f.validate().is_ok());
        let f = Fragment::default().with_opaque("signature", serde_json::json!("abc"));
        assert!(!f.is_empty());
        assert!(f.validate().is_ok());
    }

    #[test]
    fn invalid_tool_call_is_reported() {
        let f = Fragment::tool_call(ToolCall::new("1", "f", "{not json"));
        assert!(f.validate().unwrap_err().starts_with("tool_call:"));
    }

    #[test]
    fn document_needs_exactly_one_source() {
        assert!(Document::default().validate().is_err());
        let d = Document {
            url: "https://x".into(),
            data: vec![1],
            ..Default::default()
        };
        assert!(d.validate().is_err());
    }
}
