//! Streaming framers (Bytes -> one payload per chunk)
//!
//! Framers only split the body. Turning a payload into a typed chunk is the job of
//! [`ResponseDecoder::decode_chunk`](crate::client::decoder::ResponseDecoder::decode_chunk),
//! so both framings share the strict/lenient rules.

use crate::error::{DecodeErrorKind, ErrorContext};
use crate::pipeline::StreamFormat;
use crate::{BoxStream, Error};
use bytes::{Bytes, BytesMut};
use futures::{stream, StreamExt};

/// Splits a byte stream into payloads.
pub trait FrameDecoder: Send + Sync {
    fn decode_stream(&self, input: BoxStream<'static, Bytes>) -> BoxStream<'static, Bytes>;
}

/// Pop one line, without its terminator, off the front of `buf`.
fn next_line(buf: &mut BytesMut) -> Option<Bytes> {
    let idx = buf.iter().position(|b| *b == b'\n')?;
    let mut line = buf.split_to(idx + 1);
    line.truncate(idx);
    if line.last() == Some(&b'\r') {
        line.truncate(idx - 1);
    }
    Some(line.freeze())
}

/// What a framer wants done with one line.
enum Line {
    Skip,
    Payload(Bytes),
    Done,
    Invalid(String),
}

/// Line-based server-sent events framer.
///
/// - `data:` lines carry one payload each; `data: [DONE]` ends the stream
/// - comments (`:` and `: keep-alive`) and `event:`, `id:`, `retry:` fields are ignored
/// - any other non-empty line is an error
#[derive(Debug, Clone)]
pub struct SseDecoder {
    done_signal: String,
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self {
            done_signal: "[DONE]".to_string(),
        }
    }
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_done_signal(mut self, signal: impl Into<String>) -> Self {
        self.done_signal = signal.into();
        self
    }

    fn classify(line: &Bytes, done_signal: &str) -> Line {
        if line.iter().all(u8::is_ascii_whitespace) || line.starts_with(b":") {
            return Line::Skip;
        }
        if let Some(rest) = line.strip_prefix(b"data:") {
            let payload = rest.strip_prefix(b" ").unwrap_or(rest);
            let start = line.len() - payload.len();
            let trimmed = std::str::from_utf8(payload).map(str::trim).unwrap_or("");
            if trimmed == done_signal {
                return Line::Done;
            }
            if payload.iter().all(u8::is_ascii_whitespace) {
                return Line::Skip;
            }
            return Line::Payload(line.slice(start..));
        }
        for field in [&b"event:"[..], &b"id:"[..], &b"retry:"[..]] {
            if line.starts_with(field) {
                return Line::Skip;
            }
        }
        Line::Invalid(String::from_utf8_lossy(line).into_owned())
    }
}

impl FrameDecoder for SseDecoder {
    fn decode_stream(&self, input: BoxStream<'static, Bytes>) -> BoxStream<'static, Bytes> {
        let done_signal = self.done_signal.clone();
        framed(input, move |line| SseDecoder::classify(line, &done_signal))
    }
}

/// NDJSON / JSONL framer (one JSON document per line).
#[derive(Debug, Clone, Copy, Default)]
pub struct NdjsonDecoder;

impl FrameDecoder for NdjsonDecoder {
    fn decode_stream(&self, input: BoxStream<'static, Bytes>) -> BoxStream<'static, Bytes> {
        framed(input, |line| {
            if line.iter().all(u8::is_ascii_whitespace) {
                Line::Skip
            } else {
                Line::Payload(line.clone())
            }
        })
    }
}

/// Incrementally buffer bytes and classify complete lines.
fn framed<F>(input: BoxStream<'static, Bytes>, classify: F) -> BoxStream<'static, Bytes>
where
    F: Fn(&Bytes) -> Line + Send + Sync + 'static,
{
    let stream = stream::unfold(
        (Some(input), BytesMut::new(), classify),
        |(mut input, mut buf, classify)| async move {
            loop {
                let line = match next_line(&mut buf) {
                    Some(line) => line,
                    None => {
                        let Some(body) = input.as_mut() else {
                            return None;
                        };
                        match body.next().await {
                            Some(Ok(bytes)) => {
                                buf.extend_from_slice(&bytes);
                                continue;
                            }
                            Some(Err(e)) => {
                                return Some((Err(e), (None, BytesMut::new(), classify)))
                            }
                            None => {
                                // EOF: the last line may lack its terminator.
                                input = None;
                                if buf.is_empty() {
                                    return None;
                                }
                                buf.extend_from_slice(b"\n");
                                continue;
                            }
                        }
                    }
                };
                match classify(&line) {
                    Line::Skip => continue,
                    Line::Payload(p) => return Some((Ok(p), (input, buf, classify))),
                    Line::Done => return None,
                    Line::Invalid(l) => {
                        let err = Error::decode(
                            DecodeErrorKind::UnexpectedFrame(l),
                            ErrorContext::new().with_source("stream_framer"),
                        );
                        return Some((Err(err), (None, BytesMut::new(), classify)));
                    }
                }
            }
        },
    );
    Box::pin(stream)
}

pub fn create_decoder(format: StreamFormat) -> Box<dyn FrameDecoder> {
    match format {
        StreamFormat::Sse => Box::new(SseDecoder::new()),
        StreamFormat::Ndjson => Box::new(NdjsonDecoder),
    }
}
