//! Canonical data model shared by the orchestrator and provider adapters.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Conversation input with role and content |
//! | [`GenOptions`] | Provider-independent generation options |
//! | [`Fragment`] | One incremental unit of streamed output |
//! | [`GenerationResult`] | Final replies, usage and log probabilities of a call |
//! | [`ToolCall`] | Completed tool invocation requested by the model |
//!
//! ## Example
//!
//! ```rust
//! use genai_engine::types::{Fragment, FinishReason, GenerationResult, Usage};
//!
//! let mut result = GenerationResult::default();
//! result.accumulate(&Fragment::text("Hello, ")).unwrap();
//! result.accumulate(&Fragment::text("world")).unwrap();
//! result.usage = Usage { finish_reason: Some(FinishReason::Stop), ..Default::default() };
//! assert_eq!(result.text(), "Hello, world");
//! assert!(result.validate().is_ok());
//! ```

pub mod fragment;
pub mod message;
pub mod options;
pub mod result;
pub mod tool;

pub use fragment::{Citation, CitationSource, Document, Fragment};
pub use message::{validate_messages, ContentBlock, Message, MessageContent, MessageRole};
pub use options::GenOptions;
pub use result::{
    FinishReason, GenerationResult, Logprob, RateLimit, RateLimitKind, RateLimitPeriod, Reply,
    Usage,
};
pub use tool::{ToolCall, ToolChoice, ToolDefinition, ToolResult};
