use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::{Error, Result};
use futures::TryStreamExt;
use keyring::Entry;
use reqwest::header::{HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Proxy;
use std::env;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Keyring service under which API keys are looked up.
pub const KEYRING_SERVICE: &str = "genai-engine";

/// How credentials are attached to outgoing requests.
#[derive(Clone)]
pub enum Auth {
    /// `Authorization: Bearer <key>`
    Bearer(String),
    /// A provider-specific header such as `x-api-key` or `x-goog-api-key`.
    Header { name: HeaderName, value: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Bearer(_) => f.write_str("Auth::Bearer(***)"),
            Auth::Header { name, .. } => write!(f, "Auth::Header({}: ***)", name),
        }
    }
}

/// API key resolution.
pub struct ApiKey;

impl ApiKey {
    /// Resolve a key from, in order: the explicit value, the OS keyring, the environment.
    ///
    /// `key_url` ends up in the error so the user knows where to get one.
    pub fn resolve(
        explicit: Option<&str>,
        service: &str,
        env_var: &str,
        key_url: Option<&str>,
    ) -> Result<String> {
        if let Some(key) = explicit.filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }

        if let Ok(entry) = Entry::new(service, env_var) {
            if let Ok(key) = entry.get_password() {
                if !key.is_empty() {
                    return Ok(key);
                }
            }
        }

        match env::var(env_var) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::ApiKeyRequired {
                env_var: env_var.to_string(),
                url: key_url.map(str::to_string),
            }),
        }
    }
}

fn env_u64(name: &str) -> Option<u64> {
    env::var(name).ok().and_then(|s| s.trim().parse::<u64>().ok())
}

/// Builder for [`HttpTransport`]. Defaults are env-overridable.
#[derive(Debug, Clone)]
pub struct HttpTransportBuilder {
    timeout: Option<Duration>,
    connect_timeout: Duration,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Duration,
    proxy: Option<String>,
    auth: Option<Auth>,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(
                env_u64("GENAI_HTTP_TIMEOUT_SECS").unwrap_or(120),
            )),
            connect_timeout: Duration::from_secs(
                env_u64("GENAI_HTTP_CONNECT_TIMEOUT_SECS").unwrap_or(10),
            ),
            pool_max_idle_per_host: env_u64("GENAI_HTTP_POOL_MAX_IDLE_PER_HOST")
                .map(|v| v as usize)
                .unwrap_or(32),
            pool_idle_timeout: Duration::from_secs(
                env_u64("GENAI_HTTP_POOL_IDLE_TIMEOUT_SECS").unwrap_or(90),
            ),
            proxy: env::var("GENAI_PROXY_URL").ok().filter(|s| !s.is_empty()),
            auth: None,
        }
    }
}

impl HttpTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole-request timeout for non-streaming calls. `None` disables it.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn pool_max_idle_per_host(mut self, n: usize) -> Self {
        self.pool_max_idle_per_host = n;
        self
    }

    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy = Some(url.into());
        self
    }

    pub fn bearer(mut self, key: impl Into<String>) -> Self {
        self.auth = Some(Auth::Bearer(key.into()));
        self
    }

    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(Some(self.pool_idle_timeout))
            .http2_adaptive_window(true)
            .http2_keep_alive_interval(Some(Duration::from_secs(30)))
            .http2_keep_alive_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &self.proxy {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid proxy url: {}", e),
                    crate::ErrorContext::new()
                        .with_field_path("proxy")
                        .with_source("http_transport"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(HttpTransport {
            client,
            timeout: self.timeout,
            auth: self.auth,
        })
    }
}

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Option<Duration>,
    auth: Option<Auth>,
}

impl HttpTransport {
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    /// Transport with env defaults and no credentials.
    pub fn new() -> Result<Self> {
        HttpTransportBuilder::new().build()
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn round_trip(&self, req: HttpRequest) -> Result<HttpResponse> {
        let start = Instant::now();
        let client_request_id = uuid::Uuid::new_v4().to_string();
        debug!(
            method = %req.method,
            url = req.url.as_str(),
            streaming = req.streaming,
            client_request_id = client_request_id.as_str(),
            "genai-engine request starting"
        );

        let accept = if req.streaming {
            "text/event-stream"
        } else {
            "application/json"
        };
        let has_accept = req.headers.contains_key(ACCEPT);

        let mut rb = self
            .client
            .request(req.method.clone(), &req.url)
            .headers(req.headers);
        if !has_accept {
            rb = rb.header(ACCEPT, accept);
        }
        if !req.streaming {
            if let Some(t) = self.timeout {
                rb = rb.timeout(t);
            }
        }
        if let Some(body) = req.body {
            rb = rb.header(CONTENT_TYPE, "application/json").body(body);
        }
        match &self.auth {
            Some(Auth::Bearer(key)) => rb = rb.bearer_auth(key),
            Some(Auth::Header { name, value }) => {
                let value = HeaderValue::from_str(value).map_err(|e| {
                    Error::configuration_with_context(
                        format!("invalid auth header value: {}", e),
                        crate::ErrorContext::new()
                            .with_field_path(name.as_str())
                            .with_source("http_transport"),
                    )
                })?;
                rb = rb.header(name.clone(), value);
            }
            None => {}
        }
        rb = rb.header("x-request-id", client_request_id.as_str());

        let resp = rb.send().await.map_err(TransportError::Http)?;
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let upstream_request_id = ["x-request-id", "request-id", "cf-ray"]
            .iter()
            .find_map(|name| headers.get(*name).and_then(|v| v.to_str().ok()));

        info!(
            http_status = status,
            client_request_id = client_request_id.as_str(),
            upstream_request_id = upstream_request_id.unwrap_or(""),
            streaming = req.streaming,
            duration_ms = start.elapsed().as_millis(),
            "genai-engine request completed"
        );

        let body = resp
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));
        Ok(HttpResponse {
            status,
            headers,
            request_id: Some(client_request_id),
            body: Box::pin(body),
        })
    }
}
