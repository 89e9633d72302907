//! Standard error codes used to classify provider failures.
//!
//! Each structured API error and each bare HTTP status maps onto one of these codes, which in
//! turn tell the transport whether a round trip is worth retrying.
//!
//! ## Example
//!
//! ```rust
//! use genai_engine::error_code::StandardErrorCode;
//!
//! let code = StandardErrorCode::from_provider_code("insufficient_quota")
//!     .unwrap_or_else(|| StandardErrorCode::from_http_status(429));
//! assert_eq!(code.to_string(), "quota_exhausted");
//! assert!(!code.retryable());
//! ```

use std::fmt;

/// Classification of a provider failure.
///
/// Carries a stable name and whether a retry may help.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardErrorCode {
    /// Malformed request, invalid parameters, or missing required fields
    InvalidRequest,
    /// Invalid, expired, or missing API key
    Authentication,
    /// Valid credentials but insufficient permissions
    PermissionDenied,
    /// Requested model, endpoint, or resource does not exist
    NotFound,
    /// Input exceeds context window or API payload size limit
    RequestTooLarge,
    /// Request rate limit exceeded
    RateLimited,
    /// Account usage quota or billing limit reached
    QuotaExhausted,
    /// Internal server error on provider side
    ServerError,
    /// Provider service temporarily overloaded
    Overloaded,
    /// Request timed out before response received
    Timeout,
    /// State conflict (e.g., concurrent modification)
    Conflict,
    /// Request was cancelled by the client
    Cancelled,
    /// Error could not be classified
    Unknown,
}

impl StandardErrorCode {
    /// Returns the stable name (e.g., `"invalid_request"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "invalid_request",
            Self::Authentication => "authentication",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::RequestTooLarge => "request_too_large",
            Self::RateLimited => "rate_limited",
            Self::QuotaExhausted => "quota_exhausted",
            Self::ServerError => "server_error",
            Self::Overloaded => "overloaded",
            Self::Timeout => "timeout",
            Self::Conflict => "conflict",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    /// Whether repeating the same round trip may succeed.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError | Self::Overloaded | Self::Timeout | Self::Conflict
        )
    }

    /// Maps a provider error code/type string to the corresponding `StandardErrorCode`.
    ///
    /// Accepts the stable names as well as the aliases providers commonly put in their error
    /// envelopes (`"invalid_api_key"`, `"context_length_exceeded"`, `"overloaded_error"`...).
    pub fn from_provider_code(provider_code: &str) -> Option<Self> {
        let code = match provider_code.trim().to_ascii_lowercase().as_str() {
            "invalid_request" | "invalid_request_error" | "bad_request" => Self::InvalidRequest,
            "authentication" | "invalid_api_key" | "authentication_error" | "unauthenticated" => {
                Self::Authentication
            }
            "permission_denied" | "permission_error" | "forbidden" => Self::PermissionDenied,
            "not_found" | "model_not_found" | "not_found_error" => Self::NotFound,
            "request_too_large" | "context_length_exceeded" => Self::RequestTooLarge,
            "rate_limited" | "rate_limit_exceeded" | "rate_limit_error" => Self::RateLimited,
            "quota_exhausted" | "insufficient_quota" | "resource_exhausted" => {
                Self::QuotaExhausted
            }
            "server_error" | "internal" | "api_error" => Self::ServerError,
            "overloaded" | "overloaded_error" | "unavailable" => Self::Overloaded,
            "timeout" | "deadline_exceeded" => Self::Timeout,
            "conflict" => Self::Conflict,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => return None,
        };
        Some(code)
    }

    /// Maps an HTTP status code to the most likely `StandardErrorCode`.
    ///
    /// Status codes without a standard mapping return `StandardErrorCode::Unknown`, except for
    /// the 5xx range which is treated as a server error.
    pub fn from_http_status(status: u16) -> Self {
        match status {
            400 | 422 => Self::InvalidRequest,
            401 => Self::Authentication,
            402 => Self::QuotaExhausted,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            408 => Self::Timeout,
            409 => Self::Conflict,
            413 => Self::RequestTooLarge,
            429 => Self::RateLimited, // Could also be QuotaExhausted; default to rate_limited
            499 => Self::Cancelled,
            503 | 529 => Self::Overloaded, // 529: Anthropic overloaded, non-standard
            504 => Self::Timeout,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for StandardErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
