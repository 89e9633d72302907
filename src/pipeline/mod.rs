//! 流式处理模块：把一个流式 HTTP 响应体转换为有序的、类型化的分块序列。
//!
//! # Streaming Pipeline
//!
//! ```text
//! HTTP body → FrameDecoder → ResponseDecoder::decode_chunk → bounded queue → GenStream
//!   Bytes      SSE / NDJSON      strict / lenient rules        (worker task)   (caller)
//! ```
//!
//! Exactly one background worker runs per in-flight stream. It stops when the body ends, on the
//! first error, when the receiving side is dropped, or when its cancellation token fires.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`decode`] | Line framers for server-sent events and NDJSON |
//! | [`accumulate`] | Fragment accumulator and running usage totals |

pub mod accumulate;
pub mod decode;


pub use accumulate::{AccumulatorState, FragmentAccumulator, StreamTotals};
pub use decode::{create_decoder, FrameDecoder, NdjsonDecoder, SseDecoder};

use crate::client::decoder::ResponseDecoder;
use crate::error::ErrorContext;
use crate::{BoxStream, Error, Result};
use bytes::Bytes;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default number of decoded chunks buffered between the worker and the consumer.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// How a streamed body is split into chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamFormat {
    #[default]
    Sse,
    Ndjson,
}

/// Receiving end of the chunk queue.
pub type ChunkReceiver<C> = mpsc::Receiver<C>;

/// Completion handle of a stream worker.
///
/// Resolves to the worker's final status once the queue has been closed: `Ok(())` when the body
/// ended or the receiver went away, the first framing or decoding error otherwise.
#[derive(Debug)]
pub struct WorkerHandle {
    join: JoinHandle<Result<()>>,
}

impl WorkerHandle {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn join(self) -> Result<()> {
        self.await
    }

    /// Abort the task without waiting for it.
    pub fn abort(&self) {
        self.join.abort();
    }
}

impl Future for WorkerHandle {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.join).poll(cx).map(|r| match r {
            Ok(res) => res,
            Err(e) if e.is_cancelled() => Err(Error::Canceled),
            Err(e) => Err(Error::runtime_with_context(
                format!("stream worker panicked: {}", e),
                ErrorContext::new().with_source("stream_worker"),
            )),
        })
    }
}

/// Everything the worker needs to turn one response body into chunks.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub format: StreamFormat,
    pub decoder: ResponseDecoder,
    pub status: u16,
    pub url: String,
    pub capacity: usize,
}

/// Spawn the background task that frames and decodes `body` into a bounded queue.
///
/// `E` is the provider's error payload, recognised in-band.
pub fn spawn_chunk_worker<C, E>(
    body: BoxStream<'static, Bytes>,
    config: WorkerConfig,
    cancel: CancellationToken,
) -> (ChunkReceiver<C>, WorkerHandle)
where
    C: DeserializeOwned + Serialize + Send + 'static,
    E: DeserializeOwned + Serialize + crate::client::adapter::ApiErrorResponse,
{
    let (tx, rx) = mpsc::channel::<C>(config.capacity.max(1));
    let join = tokio::spawn(async move {
        let res = run_worker::<C, E>(body, &config, tx, &cancel).await;
        debug!(
            url = config.url.as_str(),
            ok = res.is_ok(),
            "genai-engine stream worker exited"
        );
        res
    });
    (rx, WorkerHandle { join })
}

async fn run_worker<C, E>(
    body: BoxStream<'static, Bytes>,
    config: &WorkerConfig,
    tx: mpsc::Sender<C>,
    cancel: &CancellationToken,
) -> Result<()>
where
    C: DeserializeOwned + Serialize + Send + 'static,
    E: DeserializeOwned + Serialize + crate::client::adapter::ApiErrorResponse,
{
    let mut frames = create_decoder(config.format).decode_stream(body);
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Canceled),
            _ = tx.closed() => return Ok(()),
            f = frames.next() => f,
        };
        let Some(frame) = next else {
            return Ok(());
        };
        let frame = frame.map_err(|e| with_url(e, &config.url, config.status))?;
        let Some(chunk) = config
            .decoder
            .decode_chunk::<C, E>(config.status, &config.url, &frame)?
        else {
            continue;
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Canceled),
            sent = tx.send(chunk) => {
                if sent.is_err() {
                    return Ok(());
                }
            }
        }
    }
}

fn with_url(err: Error, url: &str, status: u16) -> Error {
    match err {
        Error::Decode { kind, context } => Error::Decode {
            kind,
            context: context.with_url(url).with_status_code(status),
        },
        other => other,
    }
}
