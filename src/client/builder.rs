use crate::client::adapter::ProviderAdapter;
use crate::client::core::{Inner, Orchestrator};
use crate::client::decoder::{ResponseDecoder, Strictness};
use crate::pipeline::{StreamFormat, DEFAULT_QUEUE_CAPACITY};
use crate::transport::http::KEYRING_SERVICE;
use crate::transport::{ApiKey, Auth, HttpTransport, RetryPolicy, RetryTransport, Transport};
use crate::{Error, ErrorContext, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::sync::{Arc, Mutex};

/// Builder for an [`Orchestrator`].
///
/// Only the sync URL is mandatory, plus a model unless [`model_optional`] is set. Everything
/// else has a working default: lenient decoding, SSE framing, a retrying HTTP transport.
///
/// [`model_optional`]: OrchestratorBuilder::model_optional
pub struct OrchestratorBuilder<A: ProviderAdapter> {
    adapter: A,
    model: Option<String>,
    model_optional: bool,
    sync_url: Option<String>,
    stream_url: Option<String>,
    stream_format: StreamFormat,
    strictness: Strictness,
    api_key_url: Option<String>,
    lie_tool_calls: bool,
    queue_capacity: usize,
    transport: Option<Arc<dyn Transport>>,
    retry: RetryPolicy,
    auth: Option<Auth>,
    api_key_env: Option<String>,
    headers: HeaderMap,
    invalid_header: Option<String>,
}

impl<A: ProviderAdapter> OrchestratorBuilder<A> {
    pub fn new(adapter: A) -> Self {
        Self {
            adapter,
            model: None,
            model_optional: false,
            sync_url: None,
            stream_url: None,
            stream_format: StreamFormat::default(),
            strictness: Strictness::default(),
            api_key_url: None,
            lie_tool_calls: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            transport: None,
            retry: RetryPolicy::default(),
            auth: None,
            api_key_env: None,
            headers: HeaderMap::new(),
            invalid_header: None,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Allow building without a model, for providers that pick one server side.
    pub fn model_optional(mut self, optional: bool) -> Self {
        self.model_optional = optional;
        self
    }

    pub fn sync_url(mut self, url: impl Into<String>) -> Self {
        self.sync_url = Some(url.into());
        self
    }

    /// Streaming endpoint. Defaults to the sync URL.
    pub fn stream_url(mut self, url: impl Into<String>) -> Self {
        self.stream_url = Some(url.into());
        self
    }

    pub fn stream_format(mut self, format: StreamFormat) -> Self {
        self.stream_format = format;
        self
    }

    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = strictness;
        self
    }

    /// Shorthand for `strictness(Strictness::Strict)`.
    pub fn strict(self) -> Self {
        self.strictness(Strictness::Strict)
    }

    /// Where users obtain a new key; quoted in 401 errors.
    pub fn api_key_url(mut self, url: impl Into<String>) -> Self {
        self.api_key_url = Some(url.into());
        self
    }

    /// Report `ToolCalls` instead of `Stop` when a stream returned tool calls.
    ///
    /// Some providers always send `stop` at the end of a stream.
    pub fn lie_tool_calls(mut self, enable: bool) -> Self {
        self.lie_tool_calls = enable;
        self
    }

    /// Capacity of the chunk queue between the stream worker and the consumer.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Replace the default HTTP stack entirely. Auth and retry settings are then ignored.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn bearer(self, key: impl Into<String>) -> Self {
        self.auth(Auth::Bearer(key.into()))
    }

    /// Bearer key looked up at build time in the OS keyring, then in `env_var`.
    ///
    /// Ignored when [`auth`](OrchestratorBuilder::auth) or [`bearer`](OrchestratorBuilder::bearer)
    /// was set. A missing key fails the build with [`Error::ApiKeyRequired`].
    pub fn api_key_env(mut self, env_var: impl Into<String>) -> Self {
        self.api_key_env = Some(env_var.into());
        self
    }

    /// Extra header sent with every request. Invalid names or values fail [`build`].
    ///
    /// [`build`]: OrchestratorBuilder::build
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(n), Ok(v)) => {
                self.headers.insert(n, v);
            }
            _ => {
                self.invalid_header.get_or_insert_with(|| name.to_string());
            }
        }
        self
    }

    pub fn build(self) -> Result<Orchestrator<A>> {
        if let Some(name) = self.invalid_header {
            return Err(config_error(
                format!("invalid header {:?}", name),
                "header",
            ));
        }
        let sync_url = self
            .sync_url
            .ok_or_else(|| config_error("sync URL is required", "sync_url"))?;
        check_url(&sync_url, "sync_url")?;
        let stream_url = match self.stream_url {
            Some(u) => {
                check_url(&u, "stream_url")?;
                u
            }
            None => sync_url.clone(),
        };
        let model = match self.model.filter(|m| !m.trim().is_empty()) {
            Some(m) => m,
            None if self.model_optional => String::new(),
            None => return Err(config_error("model is required", "model")),
        };
        if self.queue_capacity == 0 {
            return Err(config_error(
                "queue capacity must be at least 1",
                "queue_capacity",
            ));
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => {
                let mut http = HttpTransport::builder();
                let auth = match (self.auth, &self.api_key_env) {
                    (Some(auth), _) => Some(auth),
                    (None, Some(env_var)) => Some(Auth::Bearer(ApiKey::resolve(
                        None,
                        KEYRING_SERVICE,
                        env_var,
                        self.api_key_url.as_deref(),
                    )?)),
                    (None, None) => None,
                };
                if let Some(auth) = auth {
                    http = http.auth(auth);
                }
                Arc::new(RetryTransport::new(http.build()?, self.retry))
            }
        };

        let mut decoder = ResponseDecoder::new(self.strictness);
        if let Some(u) = self.api_key_url {
            decoder = decoder.with_api_key_url(u);
        }

        Ok(Orchestrator::from_inner(Inner {
            adapter: self.adapter,
            transport,
            model,
            sync_url,
            stream_url,
            stream_format: self.stream_format,
            decoder,
            lie_tool_calls: self.lie_tool_calls,
            queue_capacity: self.queue_capacity,
            headers: self.headers,
            last_headers: Mutex::new(None),
        }))
    }
}

fn config_error(msg: impl Into<String>, field: &str) -> Error {
    Error::configuration_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_source("orchestrator_builder"),
    )
}

fn check_url(raw: &str, field: &str) -> Result<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| config_error(format!("invalid URL {:?}: {}", raw, e), field))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(config_error(
            format!("unsupported URL scheme {:?}", other),
            field,
        )),
    }
}
