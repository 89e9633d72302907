//! HTTP transport: the collaborator that performs one round trip and hands back status,
//! headers and a streamed body.
//!
//! The orchestrator only depends on the [`Transport`] trait. [`HttpTransport`] is the reqwest
//! implementation and [`RetryTransport`] wraps any transport with exponential backoff.

pub mod http;
pub mod retry;

pub use http::{ApiKey, Auth, HttpTransport, HttpTransportBuilder};
pub use retry::{RetryPolicy, RetryTransport};

use crate::{BoxStream, Result};
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::HeaderMap;
use reqwest::Method;

/// One outgoing HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    /// Streaming requests must not be subject to a whole-request timeout.
    pub streaming: bool,
}

impl HttpRequest {
    pub fn post_json(url: impl Into<String>, body: Bytes) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers: HeaderMap::new(),
            body: Some(body),
            streaming: false,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            streaming: false,
        }
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

/// Response of one round trip. The body is consumed lazily.
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Correlation id of the round trip, attached to errors decoded from this response.
    pub request_id: Option<String>,
    pub body: BoxStream<'static, Bytes>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the whole body into memory.
    pub async fn bytes(self) -> Result<Bytes> {
        let mut body = self.body;
        let mut buf = BytesMut::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// Something that performs an HTTP round trip.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn round_trip(&self, req: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn round_trip(&self, req: HttpRequest) -> Result<HttpResponse> {
        (**self).round_trip(req).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
