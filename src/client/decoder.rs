//! Dual-mode response decoding.
//!
//! The same endpoint may answer 200 with either its success schema or an error envelope, and a
//! success schema that decodes to its zero value is how the two are told apart: the body is then
//! decoded again as the error type. [`Strictness`] decides whether unknown fields are tolerated.

use crate::client::adapter::ApiErrorResponse;
use crate::error::{ApiError, DecodeErrorKind, ErrorContext};
use crate::utils::json_shape::{ignored_path, is_zero};
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

const MAX_STATUS_BODY: usize = 4096;

/// Whether payloads carrying fields the target type does not know are rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Unknown fields are reported as [`DecodeErrorKind::UnknownFields`]. Meant for tests that
    /// detect schema drift.
    Strict,
    /// Unknown fields are ignored.
    #[default]
    Lenient,
}

/// A successfully decoded payload and whether it holds nothing.
#[derive(Debug)]
pub struct Decoded<T> {
    pub value: T,
    pub is_zero: bool,
}

/// Decode `body` as `T`.
///
/// In strict mode every key `T` does not know is reported, whatever its value. Zero-ness is
/// judged on `T` serialized back to JSON, so fields `T` ignores never count.
pub fn decode_json<T>(body: &[u8], strictness: Strictness) -> std::result::Result<Decoded<T>, DecodeErrorKind>
where
    T: DeserializeOwned + Serialize,
{
    let malformed = |e: serde_json::Error| DecodeErrorKind::Malformed(e.to_string());
    let value: T = match strictness {
        Strictness::Lenient => serde_json::from_slice(body).map_err(malformed)?,
        Strictness::Strict => {
            let mut unknown = Vec::new();
            let mut de = serde_json::Deserializer::from_slice(body);
            let value: T = serde_ignored::deserialize(&mut de, |path| {
                unknown.push(ignored_path(&path))
            })
            .map_err(malformed)?;
            de.end().map_err(malformed)?;
            if !unknown.is_empty() {
                return Err(DecodeErrorKind::UnknownFields(unknown));
            }
            value
        }
    };
    let known = serde_json::to_value(&value).map_err(malformed)?;
    Ok(Decoded {
        is_zero: is_zero(&known),
        value,
    })
}

/// Decodes responses and stream chunks into a success type or an attributed error.
#[derive(Debug, Clone, Default)]
pub struct ResponseDecoder {
    strictness: Strictness,
    api_key_url: Option<String>,
    request_id: Option<String>,
}

impl ResponseDecoder {
    pub fn new(strictness: Strictness) -> Self {
        Self {
            strictness,
            api_key_url: None,
            request_id: None,
        }
    }

    /// URL appended as a remediation hint to 401 errors.
    pub fn with_api_key_url(mut self, url: impl Into<String>) -> Self {
        self.api_key_url = Some(url.into());
        self
    }

    /// Copy of this decoder whose errors carry the request id of one response.
    pub fn for_request(&self, request_id: Option<&str>) -> Self {
        Self {
            request_id: request_id.map(str::to_string),
            ..self.clone()
        }
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Decode a 2xx body.
    ///
    /// 1. A non-zero success value is returned.
    /// 2. Otherwise a non-zero error payload becomes [`Error::Api`] despite the 2xx status.
    /// 3. Otherwise a success value that decoded cleanly to zero is returned as is.
    /// 4. Otherwise the success decode error is returned.
    pub fn decode_success<S, E>(&self, status: u16, url: &str, body: &[u8]) -> Result<S>
    where
        S: DeserializeOwned + Serialize,
        E: DeserializeOwned + Serialize + ApiErrorResponse,
    {
        let first = match decode_json::<S>(body, self.strictness) {
            Ok(d) if !d.is_zero => return Ok(d.value),
            other => other,
        };
        if let Ok(e) = decode_json::<E>(body, self.strictness) {
            if !e.is_zero {
                return Err(self.api_error(status, e.value));
            }
        }
        match first {
            Ok(d) => Ok(d.value),
            Err(kind) => Err(Error::decode(
                kind,
                self.context(url, status, "decode_success"),
            )),
        }
    }

    /// Decode a non-2xx body into the error to return.
    ///
    /// A non-zero error payload becomes [`Error::Api`]. A body that does not fit the error type
    /// becomes [`Error::Decode`] in strict mode and [`Error::Status`] in lenient mode.
    pub fn decode_error<E>(&self, status: u16, url: &str, body: &[u8]) -> Error
    where
        E: DeserializeOwned + Serialize + ApiErrorResponse,
    {
        match decode_json::<E>(body, self.strictness) {
            Ok(d) if !d.is_zero => self.api_error(status, d.value),
            Err(kind) if self.strictness == Strictness::Strict => {
                Error::decode(kind, self.context(url, status, "decode_error"))
            }
            _ => Error::Status {
                status,
                body: truncate(body),
                context: self.context(url, status, "decode_error"),
            },
        }
    }

    /// Decode one stream payload.
    ///
    /// Returns `Ok(None)` for a payload that decodes cleanly to zero and is not an error.
    pub fn decode_chunk<C, E>(&self, status: u16, url: &str, frame: &[u8]) -> Result<Option<C>>
    where
        C: DeserializeOwned + Serialize,
        E: DeserializeOwned + Serialize + ApiErrorResponse,
    {
        let first = match decode_json::<C>(frame, self.strictness) {
            Ok(d) if !d.is_zero => return Ok(Some(d.value)),
            other => other,
        };
        if let Ok(e) = decode_json::<E>(frame, self.strictness) {
            if !e.is_zero {
                return Err(self.api_error(status, e.value));
            }
        }
        match first {
            Ok(_) => Ok(None),
            Err(kind) => Err(Error::decode(
                kind,
                self.context(url, status, "decode_chunk")
                    .with_details(format!("chunk: {}", String::from_utf8_lossy(frame))),
            )),
        }
    }

    fn api_error<E: ApiErrorResponse>(&self, status: u16, payload: E) -> Error {
        let message = payload.message();
        let mut err = ApiError::new(status, message.clone(), payload.code());
        if let Some(id) = &self.request_id {
            err = err.with_request_id(id.as_str());
        }
        if status == 401 {
            if let Some(url) = &self.api_key_url {
                if !message.contains(url.as_str()) {
                    err = err.with_hint(format!("get a new API key at {}", url));
                }
            }
        }
        Error::Api(err)
    }

    fn context(&self, url: &str, status: u16, source: &str) -> ErrorContext {
        let ctx = ErrorContext::new()
            .with_url(url)
            .with_status_code(status)
            .with_source(source);
        match &self.request_id {
            Some(id) => ctx.with_request_id(id.as_str()),
            None => ctx,
        }
    }
}

fn truncate(body: &[u8]) -> String {
    let s = String::from_utf8_lossy(body);
    if s.len() <= MAX_STATUS_BODY {
        return s.into_owned();
    }
    let mut end = MAX_STATUS_BODY;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &s[..end])
}
