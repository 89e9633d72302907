//! The canonical outcome of one generation call.

use crate::client::decoder::Strictness;
use crate::error::{DecodeErrorKind, ErrorContext};
use crate::types::fragment::{Citation, Document, Fragment};
use crate::types::tool::ToolCall;
use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::SystemTime;

/// Why the model stopped generating tokens.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    /// Only for asynchronous jobs that have not completed yet.
    Pending,
    /// Unrecognized value passed through in lenient mode.
    Other(String),
}

impl FinishReason {
    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
            FinishReason::Pending => "pending",
            FinishReason::Other(s) => s,
        }
    }

    /// Map a provider's finish reason string.
    ///
    /// Unknown values are kept as [`FinishReason::Other`] in lenient mode and rejected in strict mode.
    pub fn from_raw(raw: &str, strictness: Strictness) -> Result<Self> {
        match Self::known(raw) {
            Some(r) => Ok(r),
            None if strictness == Strictness::Lenient => Ok(FinishReason::Other(raw.to_string())),
            None => Err(Error::decode(
                DecodeErrorKind::Malformed(format!("unknown finish reason {:?}", raw)),
                ErrorContext::new()
                    .with_field_path("finish_reason")
                    .with_source("finish_reason"),
            )),
        }
    }

    fn known(raw: &str) -> Option<Self> {
        let r = match raw.trim().to_ascii_lowercase().as_str() {
            "stop" | "end_turn" | "stop_sequence" | "eos" | "complete" | "finish" => {
                FinishReason::Stop
            }
            "length" | "max_tokens" | "model_length" => FinishReason::Length,
            "tool_calls" | "tool_use" | "function_call" | "tool_call" => FinishReason::ToolCalls,
            "content_filter" | "safety" | "recitation" | "blocklist" | "prohibited_content"
            | "refusal" => FinishReason::ContentFilter,
            "pending" => FinishReason::Pending,
            _ => return None,
        };
        Some(r)
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FinishReason {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FinishReason {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(Self::known(&raw).unwrap_or(FinishReason::Other(raw)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitKind {
    Requests,
    Tokens,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitPeriod {
    Minute,
    Day,
    Month,
    /// Rolling or unspecified window.
    Other,
}

/// Snapshot of one provider rate limit taken from response headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub kind: RateLimitKind,
    pub period: RateLimitPeriod,
    pub limit: i64,
    pub remaining: i64,
    pub reset: SystemTime,
}

impl RateLimit {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.limit <= 0 {
            return Err(format!("rate limit: limit must be positive, got {}", self.limit));
        }
        if self.remaining < 0 {
            return Err(format!(
                "rate limit: remaining must be non-negative, got {}",
                self.remaining
            ));
        }
        Ok(())
    }
}

/// Token accounting for one call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub input_cached_tokens: u64,
    #[serde(default)]
    pub reasoning_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limits: Vec<RateLimit>,
}

impl Usage {
    /// True when every token counter is zero.
    pub fn counters_are_zero(&self) -> bool {
        self.input_tokens == 0
            && self.input_cached_tokens == 0
            && self.reasoning_tokens == 0
            && self.output_tokens == 0
            && self.total_tokens == 0
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in: {} (cached {}), reasoning: {}, out: {}, total: {}",
            self.input_tokens,
            self.input_cached_tokens,
            self.reasoning_tokens,
            self.output_tokens,
            self.total_tokens
        )
    }
}

/// Log probability of one token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Logprob {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub text: String,
    pub logprob: f64,
}

/// A completed unit of the reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        citations: Vec<Citation>,
    },
    Reasoning {
        text: String,
        #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
        opaque: serde_json::Map<String, serde_json::Value>,
    },
    ToolCall(ToolCall),
    Document(Document),
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply::Text {
            text: text.into(),
            citations: Vec::new(),
        }
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            Reply::Text { text, citations } => {
                if text.is_empty() && citations.is_empty() {
                    return Err("empty text reply".to_string());
                }
                for (i, c) in citations.iter().enumerate() {
                    c.validate().map_err(|e| format!("citation {}: {}", i, e))?;
                }
                Ok(())
            }
            Reply::Reasoning { text, opaque } => {
                if text.is_empty() && opaque.is_empty() {
                    return Err("empty reasoning reply".to_string());
                }
                Ok(())
            }
            Reply::ToolCall(tc) => tc.validate().map_err(|e| format!("tool_call: {}", e)),
            Reply::Document(d) => d.validate(),
        }
    }
}

/// Final result of a generation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    #[serde(default)]
    pub replies: Vec<Reply>,
    #[serde(default)]
    pub usage: Usage,
    /// Per token position; index 0 is the sampled token, the rest are alternatives.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub logprobs: Vec<Vec<Logprob>>,
}

impl GenerationResult {
    /// Fold one fragment into the replies.
    ///
    /// Consecutive text and consecutive reasoning merge. Tool calls and documents each start
    /// a new reply, except raw document data which extends the previous inline document.
    pub fn accumulate(&mut self, f: &Fragment) -> std::result::Result<(), String> {
        f.validate()?;
        if !f.reasoning.is_empty() || !f.opaque.is_empty() {
            if let Some(Reply::Reasoning { text, opaque }) = self.replies.last_mut() {
                text.push_str(&f.reasoning);
                opaque.extend(f.opaque.clone());
            } else {
                self.replies.push(Reply::Reasoning {
                    text: f.reasoning.clone(),
                    opaque: f.opaque.clone(),
                });
            }
            return Ok(());
        }
        if !f.text.is_empty() {
            if let Some(Reply::Text { text, .. }) = self.replies.last_mut() {
                text.push_str(&f.text);
            } else {
                self.replies.push(Reply::text(f.text.clone()));
            }
            return Ok(());
        }
        if let Some(c) = &f.citation {
            if let Some(Reply::Text { citations, .. }) = self.replies.last_mut() {
                citations.push(c.clone());
            } else {
                self.replies.push(Reply::Text {
                    text: String::new(),
                    citations: vec![c.clone()],
                });
            }
            return Ok(());
        }
        if let Some(tc) = f.tool_call.as_ref().filter(|t| !t.is_zero()) {
            self.replies.push(Reply::ToolCall(tc.clone()));
            return Ok(());
        }
        if let Some(d) = &f.document {
            if d.url.is_empty() {
                if let Some(Reply::Document(last)) = self.replies.last_mut() {
                    if last.url.is_empty() && (d.filename.is_empty() || d.filename == last.filename) {
                        last.data.extend_from_slice(&d.data);
                        return Ok(());
                    }
                }
            }
            self.replies.push(Reply::Document(d.clone()));
        }
        Ok(())
    }

    /// Self-consistency check run on every result before it reaches the caller.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (i, r) in self.replies.iter().enumerate() {
            r.validate().map_err(|e| format!("reply {}: {}", i, e))?;
        }
        for (i, l) in self.usage.limits.iter().enumerate() {
            l.validate().map_err(|e| format!("limit {}: {}", i, e))?;
        }
        match &self.usage.finish_reason {
            None => return Err("missing finish reason".to_string()),
            Some(FinishReason::Pending) => {
                return Err("finish reason pending is only valid for asynchronous jobs".to_string())
            }
            Some(FinishReason::Length) | Some(FinishReason::ContentFilter) => {}
            Some(_) if self.replies.is_empty() => return Err("no replies".to_string()),
            Some(_) => {}
        }
        Ok(())
    }

    /// All text replies, concatenated.
    pub fn text(&self) -> String {
        self.replies
            .iter()
            .filter_map(|r| match r {
                Reply::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn reasoning(&self) -> String {
        self.replies
            .iter()
            .filter_map(|r| match r {
                Reply::Reasoning { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.replies
            .iter()
            .filter_map(|r| match r {
                Reply::ToolCall(tc) => Some(tc),
                _ => None,
            })
            .collect()
    }

    /// Decode the text reply as JSON, for calls made with `reply_as_json` or `decode_as`.
    pub fn decode_text<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        let text = self.text();
        serde_json::from_str(&text).map_err(|e| {
            Error::decode(
                DecodeErrorKind::Malformed(e.to_string()),
                ErrorContext::new().with_source("decode_text"),
            )
        })
    }

    /// Replay the replies as the fragments that would have produced them.
    pub fn to_fragments(&self) -> Vec<Fragment> {
        let mut out = Vec::new();
        for r in &self.replies {
            match r {
                Reply::Text { text, citations } => {
                    if !text.is_empty() {
                        out.push(Fragment::text(text.clone()));
                    }
                    out.extend(citations.iter().cloned().map(Fragment::citation));
                }
                Reply::Reasoning { text, opaque } => out.push(Fragment {
                    reasoning: text.clone(),
                    opaque: opaque.clone(),
                    ..Default::default()
                }),
                Reply::ToolCall(tc) => out.push(Fragment::tool_call(tc.clone())),
                Reply::Document(d) => out.push(Fragment::document(d.clone())),
            }
        }
        out
    }
}
