//! Retry wrapper around a whole HTTP round trip.
//!
//! Only the request/response exchange is retried. Once a response with a usable status has been
//! returned its body belongs to the caller, so a stream that fails mid-body is never replayed.

use crate::error_code::StandardErrorCode;
use crate::transport::{HttpRequest, HttpResponse, Transport};
use crate::utils::headers::retry_after;
use crate::Result;
use std::time::{Duration, Instant};
use tracing::warn;

/// Exponential backoff with a bounded try count and a bounded total duration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_tries: u32,
    /// Upper bound on the time spent across all attempts and sleeps.
    pub max_duration: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: 10,
            max_duration: Duration::from_secs(60),
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(15),
            factor: 1.5,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_tries: 1,
            ..Self::default()
        }
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self.factor.powi(attempt.saturating_sub(1) as i32);
        let ms = (self.base_delay.as_millis() as f64 * exp).min(self.max_delay.as_millis() as f64);
        Duration::from_millis(ms as u64)
    }

    fn status_retryable(status: u16) -> bool {
        StandardErrorCode::from_http_status(status).retryable()
    }
}

/// [`Transport`] decorator that retries transient failures.
pub struct RetryTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: Transport> RetryTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<T: Transport> Transport for RetryTransport<T> {
    async fn round_trip(&self, req: HttpRequest) -> Result<HttpResponse> {
        let start = Instant::now();
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let last = attempt >= self.policy.max_tries.max(1);
            let delay = match self.inner.round_trip(req.clone()).await {
                Ok(resp) => {
                    if last || resp.is_success() || !RetryPolicy::status_retryable(resp.status) {
                        return Ok(resp);
                    }
                    let backoff = self.policy.backoff(attempt);
                    let delay = retry_after(&resp.headers).map_or(backoff, |ra| ra.max(backoff));
                    if start.elapsed() + delay > self.policy.max_duration {
                        return Ok(resp);
                    }
                    warn!(
                        http_status = resp.status,
                        attempt,
                        delay_ms = delay.as_millis(),
                        url = req.url.as_str(),
                        "genai-engine retrying request"
                    );
                    delay
                }
                Err(e) => {
                    if last || !e.is_retryable() {
                        return Err(e);
                    }
                    let delay = self.policy.backoff(attempt);
                    if start.elapsed() + delay > self.policy.max_duration {
                        return Err(e);
                    }
                    warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis(),
                        url = req.url.as_str(),
                        "genai-engine retrying request"
                    );
                    delay
                }
            };
            tokio::time::sleep(delay).await;
        }
    }
}
