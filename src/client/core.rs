use crate::client::adapter::{GenRequest, GenResponse, ProviderAdapter};
use crate::client::builder::OrchestratorBuilder;
use crate::client::decoder::ResponseDecoder;
use crate::client::stream::GenStream;
use crate::error::UnsupportedOptions;
use crate::pipeline::{spawn_chunk_worker, ChunkReceiver, StreamFormat, WorkerConfig, WorkerHandle};
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::types::{validate_messages, GenOptions, GenerationResult, Message};
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub(crate) struct Inner<A> {
    pub(crate) adapter: A,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) model: String,
    pub(crate) sync_url: String,
    pub(crate) stream_url: String,
    pub(crate) stream_format: StreamFormat,
    pub(crate) decoder: ResponseDecoder,
    pub(crate) lie_tool_calls: bool,
    pub(crate) queue_capacity: usize,
    pub(crate) headers: HeaderMap,
    pub(crate) last_headers: Mutex<Option<HeaderMap>>,
}

/// Drives sync and streaming generation calls for one provider adapter.
///
/// Cloning is cheap and clones share the last-response-headers cache.
pub struct Orchestrator<A: ProviderAdapter> {
    inner: Arc<Inner<A>>,
}

impl<A: ProviderAdapter> Clone for Orchestrator<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: ProviderAdapter> Orchestrator<A> {
    pub fn builder(adapter: A) -> OrchestratorBuilder<A> {
        OrchestratorBuilder::new(adapter)
    }

    pub(crate) fn from_inner(inner: Inner<A>) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn model(&self) -> &str {
        &self.inner.model
    }

    pub fn adapter(&self) -> &A {
        &self.inner.adapter
    }

    /// Headers of the most recent response received through this orchestrator.
    pub fn last_response_headers(&self) -> Option<HeaderMap> {
        self.inner
            .last_headers
            .lock()
            .ok()
            .and_then(|h| h.clone())
    }

    fn record_headers(&self, headers: &HeaderMap) {
        if let Ok(mut slot) = self.inner.last_headers.lock() {
            *slot = Some(headers.clone());
        }
    }

    /// Validate caller input and build a fresh request.
    pub fn new_request(
        &self,
        messages: &[Message],
        options: &GenOptions,
    ) -> Result<(A::Request, Option<UnsupportedOptions>)> {
        validate_messages(messages).map_err(|e| {
            Error::validation_with_context(
                e,
                ErrorContext::new()
                    .with_field_path("messages")
                    .with_source("new_request"),
            )
        })?;
        options.validate().map_err(|e| {
            Error::validation_with_context(
                e,
                ErrorContext::new()
                    .with_field_path("options")
                    .with_source("new_request"),
            )
        })?;
        let mut req = A::Request::default();
        let unsupported = req
            .init(messages, options, &self.inner.model)?
            .filter(|u| !u.is_empty());
        Ok((req, unsupported))
    }

    async fn send(&self, req: HttpRequest, cancel: Option<&CancellationToken>) -> Result<HttpResponse> {
        let resp = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Error::Canceled),
                r = self.inner.transport.round_trip(req) => r?,
            },
            None => self.inner.transport.round_trip(req).await?,
        };
        self.record_headers(&resp.headers);
        Ok(resp)
    }

    fn http_request(&self, method: Method, url: &str, body: Option<Bytes>) -> HttpRequest {
        HttpRequest {
            method,
            url: url.to_string(),
            headers: self.inner.headers.clone(),
            body,
            streaming: false,
        }
    }

    /// One JSON round trip through the dual-mode decoder.
    ///
    /// Also usable for auxiliary endpoints (model listing, job polling) that share the
    /// provider's error envelope.
    pub async fn do_request<Req, Resp>(
        &self,
        method: Method,
        url: &str,
        body: Option<&Req>,
    ) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned + Serialize,
    {
        self.round_trip_json(method, url, body)
            .await
            .map(|(resp, _)| resp)
    }

    async fn round_trip_json<Req, Resp>(
        &self,
        method: Method,
        url: &str,
        body: Option<&Req>,
    ) -> Result<(Resp, HeaderMap)>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned + Serialize,
    {
        let body = body.map(serde_json::to_vec).transpose()?.map(Bytes::from);
        let resp = self.send(self.http_request(method, url, body), None).await?;
        let status = resp.status;
        let ok = resp.is_success();
        let headers = resp.headers.clone();
        let decoder = self.inner.decoder.for_request(resp.request_id.as_deref());
        let bytes = resp.bytes().await?;
        if !ok {
            return Err(decoder.decode_error::<A::ErrorResponse>(status, url, &bytes));
        }
        let decoded = decoder.decode_success::<Resp, A::ErrorResponse>(status, url, &bytes)?;
        Ok((decoded, headers))
    }

    /// Run a prepared request without converting the response.
    pub async fn raw_sync(&self, req: &mut A::Request) -> Result<A::Response> {
        req.set_stream(false);
        self.do_request(Method::POST, &self.inner.sync_url, Some(&*req))
            .await
    }

    /// Start a streaming round trip and hand back the raw chunk queue.
    ///
    /// A non-2xx response is decoded as an error before any worker is spawned. Dropping the
    /// receiver or cancelling `cancel` stops the worker.
    pub async fn raw_stream(
        &self,
        req: &mut A::Request,
        cancel: CancellationToken,
    ) -> Result<(ChunkReceiver<A::Chunk>, WorkerHandle)> {
        self.open_stream(req, cancel)
            .await
            .map(|(rx, worker, _)| (rx, worker))
    }

    async fn open_stream(
        &self,
        req: &mut A::Request,
        cancel: CancellationToken,
    ) -> Result<(ChunkReceiver<A::Chunk>, WorkerHandle, HeaderMap)> {
        req.set_stream(true);
        let url = self.inner.stream_url.as_str();
        let body = Bytes::from(serde_json::to_vec(&*req)?);
        let http = self
            .http_request(Method::POST, url, Some(body))
            .with_streaming(true);
        let resp = self.send(http, Some(&cancel)).await?;
        let status = resp.status;
        let decoder = self.inner.decoder.for_request(resp.request_id.as_deref());
        if !resp.is_success() {
            let bytes = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Canceled),
                b = resp.bytes() => b?,
            };
            return Err(decoder.decode_error::<A::ErrorResponse>(status, url, &bytes));
        }
        let config = WorkerConfig {
            format: self.inner.stream_format,
            decoder,
            status,
            url: url.to_string(),
            capacity: self.inner.queue_capacity,
        };
        let (rx, worker) =
            spawn_chunk_worker::<A::Chunk, A::ErrorResponse>(resp.body, config, cancel);
        Ok((rx, worker, resp.headers))
    }

    /// Synchronous generation.
    ///
    /// The second element lists options the adapter ignored; the call still succeeded.
    pub async fn gen_sync(
        &self,
        messages: &[Message],
        options: &GenOptions,
    ) -> Result<(GenerationResult, Option<UnsupportedOptions>)> {
        let (mut req, unsupported) = self.new_request(messages, options)?;
        req.set_stream(false);
        let (resp, headers) = self
            .round_trip_json::<_, A::Response>(Method::POST, &self.inner.sync_url, Some(&req))
            .await?;
        let mut result = resp.to_result()?;
        result.validate().map_err(Error::adapter)?;
        result.usage.limits = self.inner.adapter.rate_limits(&headers);
        Ok((result, unsupported))
    }

    /// Streaming generation. Every failure surfaces through [`GenStream::finish`].
    pub async fn gen_stream(&self, messages: &[Message], options: &GenOptions) -> GenStream<A> {
        self.gen_stream_with_cancel(messages, options, CancellationToken::new())
            .await
    }

    /// Streaming generation bound to the caller's cancellation token.
    pub async fn gen_stream_with_cancel(
        &self,
        messages: &[Message],
        options: &GenOptions,
        cancel: CancellationToken,
    ) -> GenStream<A> {
        let token = cancel.child_token();
        let (mut req, unsupported) = match self.new_request(messages, options) {
            Ok(v) => v,
            Err(e) => return GenStream::failed(e, token),
        };
        match self.open_stream(&mut req, token.clone()).await {
            Ok((rx, worker, headers)) => GenStream::live(
                rx,
                worker,
                self.inner.adapter.chunk_processor(),
                self.inner.adapter.rate_limits(&headers),
                self.inner.lie_tool_calls,
                unsupported,
                token,
            ),
            Err(e) => GenStream::failed(e, token),
        }
    }

    /// Streaming surface for providers without a streaming endpoint: runs [`gen_sync`] and
    /// replays the result as fragments.
    ///
    /// [`gen_sync`]: Orchestrator::gen_sync
    pub async fn gen_stream_simulated(
        &self,
        messages: &[Message],
        options: &GenOptions,
    ) -> GenStream<A> {
        let token = CancellationToken::new();
        match self.gen_sync(messages, options).await {
            Ok((result, unsupported)) => GenStream::replay(result, unsupported, token),
            Err(e) => GenStream::failed(e, token),
        }
    }
}

impl<A: ProviderAdapter> std::fmt::Debug for Orchestrator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("model", &self.inner.model)
            .field("sync_url", &self.inner.sync_url)
            .field("stream_url", &self.inner.stream_url)
            .field("stream_format", &self.inner.stream_format)
            .field("strictness", &self.inner.decoder.strictness())
            .finish_non_exhaustive()
    }
}
