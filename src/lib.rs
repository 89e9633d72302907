//! # genai-engine
//!
//! 面向异构生成式 AI HTTP API 的通用请求与流式编排引擎。
//!
//! Generic request/stream orchestration engine for heterogeneous generative-AI HTTP APIs.
//!
//! ## Overview
//!
//! A provider integration is reduced to a [`ProviderAdapter`]: JSON request, response, chunk
//! and error types plus the conversions between them and the canonical model in [`types`].
//! The [`Orchestrator`] does everything else:
//!
//! - validates messages and options before anything goes on the wire
//! - decodes responses in strict or lenient mode, telling "quiet success", "error envelope
//!   sent with a 200" and "schema drift" apart
//! - runs streaming calls on a background worker with a bounded chunk queue, cancellable
//!   through a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! - accumulates stream fragments into one validated [`GenerationResult`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use genai_engine::client::{ApiErrorResponse, GenRequest, GenResponse, ProviderAdapter};
//! use genai_engine::pipeline::StreamTotals;
//! use genai_engine::types::{FinishReason, Reply, Usage};
//! use genai_engine::{
//!     Fragment, GenOptions, GenerationResult, Message, Orchestrator, UnsupportedOptions,
//! };
//! use futures::StreamExt;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Default, Serialize)]
//! struct EchoRequest {
//!     model: String,
//!     prompt: String,
//!     stream: bool,
//! }
//!
//! impl GenRequest for EchoRequest {
//!     fn init(
//!         &mut self,
//!         messages: &[Message],
//!         _options: &GenOptions,
//!         model: &str,
//!     ) -> genai_engine::Result<Option<UnsupportedOptions>> {
//!         self.model = model.to_string();
//!         self.prompt = messages.iter().map(|m| m.text()).collect::<Vec<_>>().join("\n");
//!         Ok(None)
//!     }
//!
//!     fn set_stream(&mut self, stream: bool) {
//!         self.stream = stream;
//!     }
//! }
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct EchoResponse {
//!     #[serde(default)]
//!     text: String,
//!     /// Last stream chunk. Chunks that decode to their zero value are skipped, so the end of
//!     /// the stream must be marked by a populated field.
//!     #[serde(default)]
//!     done: bool,
//! }
//!
//! impl GenResponse for EchoResponse {
//!     fn to_result(&self) -> genai_engine::Result<GenerationResult> {
//!         Ok(GenerationResult {
//!             replies: vec![Reply::text(self.text.clone())],
//!             usage: Usage { finish_reason: Some(FinishReason::Stop), ..Default::default() },
//!             ..Default::default()
//!         })
//!     }
//! }
//!
//! #[derive(Default, Serialize, Deserialize)]
//! struct EchoError {
//!     #[serde(default)]
//!     error: String,
//! }
//!
//! impl ApiErrorResponse for EchoError {
//!     fn message(&self) -> String {
//!         self.error.clone()
//!     }
//! }
//!
//! struct Echo;
//!
//! impl ProviderAdapter for Echo {
//!     type Request = EchoRequest;
//!     type Response = EchoResponse;
//!     type Chunk = EchoResponse;
//!     type ErrorResponse = EchoError;
//!     type Processor = fn(EchoResponse, &mut StreamTotals) -> genai_engine::Result<Vec<Fragment>>;
//!
//!     fn chunk_processor(&self) -> Self::Processor {
//!         |chunk, totals| {
//!             if chunk.done {
//!                 totals.set_finish_reason(FinishReason::Stop);
//!             }
//!             Ok(vec![Fragment::text(chunk.text)])
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> genai_engine::Result<()> {
//!     let orchestrator = Orchestrator::builder(Echo)
//!         .model("echo-1")
//!         .sync_url("https://api.example.com/v1/generate")
//!         .bearer("your-api-key")
//!         .build()?;
//!
//!     let messages = vec![Message::user("Hello, how are you?")];
//!     let mut stream = orchestrator.gen_stream(&messages, &GenOptions::default()).await;
//!     while let Some(fragment) = stream.next().await {
//!         print!("{}", fragment.text);
//!     }
//!     let (result, _unsupported) = stream.finish().await?;
//!     println!("\n{}", result.usage);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Orchestrator, builder, adapter contracts and the dual-mode decoder |
//! | [`pipeline`] | Stream framing, the chunk worker and fragment accumulation |
//! | [`transport`] | HTTP transport, authentication and retries |
//! | [`types`] | Canonical messages, options, fragments and results |
//! | [`utils`] | Header parsing, JSON shape helpers, tool call assembly |

pub mod client;
pub mod error;
pub mod error_code;
pub mod pipeline;
pub mod transport;
pub mod types;
pub mod utils;

pub use client::{CancelHandle, GenStream, Orchestrator, OrchestratorBuilder, Strictness};
pub use error::{ApiError, DecodeErrorKind, Error, ErrorContext, UnsupportedOptions};
pub use error_code::StandardErrorCode;
pub use types::{
    FinishReason, Fragment, GenOptions, GenerationResult, Message, MessageRole, ToolCall, Usage,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A specialized Result for pipeline operations
pub type PipeResult<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `PipeResult<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = PipeResult<T>> + Send + 'a>>;
