use crate::error_code::StandardErrorCode;
use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "options.temperature", "choices[0].delta.foo")
    pub field_path: Option<String>,
    /// URL of the request the error is attributed to
    pub url: Option<String>,
    /// HTTP status of the response, when one was received
    pub status_code: Option<u16>,
    /// Client-side correlation id sent with the request
    pub request_id: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "decode_success", "stream_worker")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_status_code(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Structured error payload returned by a provider.
///
/// Produced by the decoder either from a non-2xx response or from a 2xx response whose body
/// turned out to be an error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    /// Provider-specific error code or type, when the payload exposes one.
    pub code: Option<String>,
    pub class: StandardErrorCode,
    /// Remediation hint for the user, e.g. where to get a new API key.
    pub hint: Option<String>,
    /// Client-side correlation id of the request that failed.
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>, code: Option<String>) -> Self {
        let class = code
            .as_deref()
            .and_then(StandardErrorCode::from_provider_code)
            .unwrap_or_else(|| StandardErrorCode::from_http_status(status));
        Self {
            status,
            message: message.into(),
            code,
            class,
            hint: None,
            request_id: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} ({}): {}", self.status, self.class, self.message)?;
        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "; {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

/// Why a payload could not be decoded into the expected shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// Strict mode only: the payload carried fields the target type does not know about.
    UnknownFields(Vec<String>),
    /// The payload is not valid JSON or does not match the target type.
    Malformed(String),
    /// A stream line that is not part of the framing protocol.
    UnexpectedFrame(String),
}

impl std::fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeErrorKind::UnknownFields(fields) => {
                write!(f, "unexpected response shape: unknown fields [{}]", fields.join(", "))
            }
            DecodeErrorKind::Malformed(msg) => write!(f, "malformed payload: {}", msg),
            DecodeErrorKind::UnexpectedFrame(line) => {
                write!(f, "unexpected stream line, expected \"data: \", got {:?}", line)
            }
        }
    }
}

/// Signals that a provider adapter produced output that fails self-validation.
///
/// Never caused by caller input; it points at the per-provider translation layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provider adapter bug: {0}")]
pub struct AdapterBug(pub String);

impl AdapterBug {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Non-fatal condition: some requested options were silently ignored by the provider adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnsupportedOptions {
    pub unsupported: Vec<String>,
}

impl UnsupportedOptions {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unsupported: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>) {
        self.unsupported.push(name.into());
    }

    pub fn is_empty(&self) -> bool {
        self.unsupported.is_empty()
    }
}

impl std::fmt::Display for UnsupportedOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.unsupported.is_empty() {
            return write!(f, "no unsupported options");
        }
        write!(f, "unsupported options: {}", self.unsupported.join(", "))
    }
}

impl std::error::Error for UnsupportedOptions {}

/// Unified error type for the generation engine
#[derive(Debug, Error)]
pub enum Error {
    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("HTTP {status}: {body}{}", format_context(.context))]
    Status {
        status: u16,
        body: String,
        context: ErrorContext,
    },

    #[error("Decode error: {kind}{}", format_context(.context))]
    Decode {
        kind: DecodeErrorKind,
        context: ErrorContext,
    },

    #[error(transparent)]
    Adapter(#[from] AdapterBug),

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("{}", api_key_message(.env_var, .url))]
    ApiKeyRequired { env_var: String, url: Option<String> },

    #[error("operation canceled")]
    Canceled,

    #[error(transparent)]
    Unsupported(#[from] UnsupportedOptions),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref url) = ctx.url {
        parts.push(format!("url: {}", url));
    }
    if let Some(status) = ctx.status_code {
        parts.push(format!("status: {}", status));
    }
    if let Some(ref id) = ctx.request_id {
        parts.push(format!("request_id: {}", id));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn api_key_message(env_var: &str, url: &Option<String>) -> String {
    match url {
        Some(url) => format!(
            "api key is required; set environment variable {} to it, and get a key at {}",
            env_var, url
        ),
        None => format!("api key is required; set environment variable {} to it", env_var),
    }
}

impl Error {
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    pub fn decode(kind: DecodeErrorKind, context: ErrorContext) -> Self {
        Error::Decode { kind, context }
    }

    pub fn adapter(msg: impl Into<String>) -> Self {
        Error::Adapter(AdapterBug::new(msg))
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Status { context, .. }
            | Error::Decode { context, .. }
            | Error::Validation { context, .. }
            | Error::Configuration { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Standard classification of this error, when one applies.
    pub fn standard_code(&self) -> Option<StandardErrorCode> {
        match self {
            Error::Api(e) => Some(e.class),
            Error::Status { status, .. } => Some(StandardErrorCode::from_http_status(*status)),
            Error::Transport(TransportError::Http(e)) if e.is_timeout() => {
                Some(StandardErrorCode::Timeout)
            }
            Error::Canceled => Some(StandardErrorCode::Cancelled),
            _ => None,
        }
    }

    /// Whether retrying the whole round trip may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(TransportError::Http(e)) => e.is_connect() || e.is_timeout(),
            _ => self.standard_code().map(|c| c.retryable()).unwrap_or(false),
        }
    }

    /// True when the failure is attributable to the provider adapter rather than the caller.
    pub fn is_adapter_bug(&self) -> bool {
        matches!(self, Error::Adapter(_))
    }
}
