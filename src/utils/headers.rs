//! Response header helpers: retry hints and rate-limit snapshots.

use crate::types::{RateLimit, RateLimitKind, RateLimitPeriod};
use reqwest::header::HeaderMap;
use std::time::{Duration, SystemTime};

/// Extract the first non-empty header value from a list of header names.
pub fn header_first(headers: &HeaderMap, names: &[&str]) -> Option<String> {
    for name in names {
        if let Some(v) = headers.get(*name) {
            if let Ok(s) = v.to_str() {
                let s = s.trim();
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

/// Parse `retry-after-ms`, then `Retry-After: <seconds>`.
///
/// The HTTP-date form of `Retry-After` is not supported.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    if let Some(ms) = header_first(headers, &["retry-after-ms"]) {
        if let Ok(ms) = ms.parse::<f64>() {
            if ms.is_finite() && ms >= 0.0 {
                return Some(Duration::from_millis(ms as u64));
            }
        }
    }
    let raw = header_first(headers, &["retry-after"])?;
    let secs: f64 = raw.parse().ok()?;
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some(Duration::from_millis((secs * 1000.0) as u64))
}

/// Parse durations like `1m30s`, `6m0s`, `1.5s`, `250ms` or a bare number of seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).ok();
    }
    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_end == 0 {
            return None;
        }
        let value: f64 = rest[..num_end].parse().ok()?;
        rest = &rest[num_end..];
        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let scale = match &rest[..unit_end] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 1e-3,
            "us" | "µs" => 1e-6,
            "ns" => 1e-9,
            _ => return None,
        };
        total += value * scale;
        rest = &rest[unit_end..];
    }
    Duration::try_from_secs_f64(total).ok()
}

/// Rate limits advertised with the widespread `x-ratelimit-{limit,remaining,reset}-{requests,tokens}`
/// header family. Limits that are absent or zero are skipped.
pub fn ratelimit_headers(headers: &HeaderMap, period: RateLimitPeriod) -> Vec<RateLimit> {
    let now = SystemTime::now();
    let mut limits = Vec::new();
    for (kind, suffix) in [
        (RateLimitKind::Requests, "requests"),
        (RateLimitKind::Tokens, "tokens"),
    ] {
        let get = |prefix: &str| header_first(headers, &[&format!("x-ratelimit-{}-{}", prefix, suffix)]);
        let limit = get("limit").and_then(|s| s.parse::<i64>().ok()).unwrap_or(0);
        if limit <= 0 {
            continue;
        }
        let remaining = get("remaining")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);
        let reset = get("reset")
            .and_then(|s| parse_duration(&s))
            .map_or(now, |d| now + d);
        limits.push(RateLimit {
            kind,
            period,
            limit,
            remaining,
            reset,
        });
    }
    limits
}
