//! Contracts between the orchestrator and a provider adapter.
//!
//! An adapter only translates JSON: it fills a request from canonical messages, converts a
//! response into a [`GenerationResult`], and turns stream chunks into [`Fragment`]s.

use crate::error::UnsupportedOptions;
use crate::pipeline::StreamTotals;
use crate::types::{Fragment, GenOptions, GenerationResult, Message, RateLimit};
use crate::Result;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Provider request body. A fresh value is built for every call.
pub trait GenRequest: Default + Serialize + Send + Sync + 'static {
    /// Fill the request from canonical input.
    ///
    /// Options the provider cannot honour are returned as [`UnsupportedOptions`] instead of
    /// failing the call. Anything else that cannot be expressed is an error.
    fn init(
        &mut self,
        messages: &[Message],
        options: &GenOptions,
        model: &str,
    ) -> Result<Option<UnsupportedOptions>>;

    fn set_stream(&mut self, stream: bool);
}

/// Provider response body of a synchronous call.
pub trait GenResponse: DeserializeOwned + Serialize + Send + 'static {
    fn to_result(&self) -> Result<GenerationResult>;
}

/// Provider error envelope.
pub trait ApiErrorResponse: DeserializeOwned + Serialize + Send + 'static {
    fn message(&self) -> String;

    /// Provider error code or type, if any.
    fn code(&self) -> Option<String> {
        None
    }
}

/// Converts the chunks of one stream into fragments.
///
/// One processor lives for exactly one stream, so it may keep state such as a
/// [`ToolCallAssembler`](crate::utils::ToolCallAssembler).
pub trait ChunkProcessor<C>: Send + 'static {
    /// Handle one chunk. Usage, finish reason and log probabilities go into `totals`.
    fn process(&mut self, chunk: C, totals: &mut StreamTotals) -> Result<Vec<Fragment>>;

    /// Called once after the last chunk, to flush buffered state.
    fn finish(&mut self, _totals: &mut StreamTotals) -> Result<Vec<Fragment>> {
        Ok(Vec::new())
    }
}

impl<C, F> ChunkProcessor<C> for F
where
    F: FnMut(C, &mut StreamTotals) -> Result<Vec<Fragment>> + Send + 'static,
{
    fn process(&mut self, chunk: C, totals: &mut StreamTotals) -> Result<Vec<Fragment>> {
        self(chunk, totals)
    }
}

/// The per-provider behaviours injected into an
/// [`Orchestrator`](crate::client::Orchestrator).
pub trait ProviderAdapter: Send + Sync + 'static {
    type Request: GenRequest;
    type Response: GenResponse;
    type Chunk: DeserializeOwned + Serialize + Send + 'static;
    type ErrorResponse: ApiErrorResponse;
    type Processor: ChunkProcessor<Self::Chunk>;

    /// Fresh processor for one stream.
    fn chunk_processor(&self) -> Self::Processor;

    /// Rate limits advertised in response headers.
    fn rate_limits(&self, _headers: &HeaderMap) -> Vec<RateLimit> {
        Vec::new()
    }
}
