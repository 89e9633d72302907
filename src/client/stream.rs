//! Caller-facing side of a streaming generation call.

use crate::client::adapter::{ChunkProcessor, ProviderAdapter};
use crate::client::types::CancelHandle;
use crate::error::UnsupportedOptions;
use crate::pipeline::{ChunkReceiver, FragmentAccumulator, StreamTotals, WorkerHandle};
use crate::types::{FinishReason, Fragment, GenerationResult, RateLimit};
use crate::{Error, Result};
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

/// State of a live stream.
struct Live<A: ProviderAdapter> {
    rx: ChunkReceiver<A::Chunk>,
    worker: Option<WorkerHandle>,
    processor: Box<A::Processor>,
    totals: StreamTotals,
    acc: FragmentAccumulator,
    limits: Vec<RateLimit>,
    lie_tool_calls: bool,
}

enum Source<A: ProviderAdapter> {
    Live(Box<Live<A>>),
    /// Fragments replayed from an already complete result.
    Replay(GenerationResult),
    /// Setup failed before any chunk could be produced.
    Failed,
    Finished,
}

/// Sequence of [`Fragment`]s of one streaming call, plus its finalizer.
///
/// Fragments arrive in the order the provider sent them. Errors never appear in the sequence:
/// it simply ends, and [`finish`](GenStream::finish) reports why. Dropping a `GenStream` stops
/// its background worker.
pub struct GenStream<A: ProviderAdapter> {
    source: Source<A>,
    pending: VecDeque<Fragment>,
    error: Option<Error>,
    unsupported: Option<UnsupportedOptions>,
    cancel: CancellationToken,
    /// Chunk queue drained and processor flushed.
    exhausted: bool,
}

// Nothing is pinned structurally; all state is behind `Box` or owned handles.
impl<A: ProviderAdapter> Unpin for GenStream<A> {}

impl<A: ProviderAdapter> GenStream<A> {
    pub(crate) fn live(
        rx: ChunkReceiver<A::Chunk>,
        worker: WorkerHandle,
        processor: A::Processor,
        limits: Vec<RateLimit>,
        lie_tool_calls: bool,
        unsupported: Option<UnsupportedOptions>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source: Source::Live(Box::new(Live {
                rx,
                worker: Some(worker),
                processor: Box::new(processor),
                totals: StreamTotals::new(),
                acc: FragmentAccumulator::new(),
                limits,
                lie_tool_calls,
            })),
            pending: VecDeque::new(),
            error: None,
            unsupported,
            cancel,
            exhausted: false,
        }
    }

    pub(crate) fn failed(err: Error, cancel: CancellationToken) -> Self {
        Self {
            source: Source::Failed,
            pending: VecDeque::new(),
            error: Some(err),
            unsupported: None,
            cancel,
            exhausted: true,
        }
    }

    pub(crate) fn replay(
        result: GenerationResult,
        unsupported: Option<UnsupportedOptions>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pending: result.to_fragments().into(),
            source: Source::Replay(result),
            error: None,
            unsupported,
            cancel,
            exhausted: true,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(self.cancel.clone())
    }

    /// Options the adapter ignored, known as soon as the request was built.
    pub fn unsupported(&self) -> Option<&UnsupportedOptions> {
        self.unsupported.as_ref()
    }

    /// Record the first error and stop delivery.
    fn fail(&mut self, err: Error) {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self.pending.clear();
        self.exhausted = true;
        self.cancel.cancel();
        if let Source::Live(live) = &mut self.source {
            live.rx.close();
        }
    }

    fn deliver(&mut self, fragments: Result<Vec<Fragment>>) {
        let fragments = match fragments {
            Ok(f) => f,
            Err(e) => return self.fail(e),
        };
        for f in fragments {
            let pushed = match &mut self.source {
                Source::Live(live) => live.acc.push(&f),
                _ => Ok(false),
            };
            match pushed {
                Ok(true) => self.pending.push_back(f),
                Ok(false) => {}
                Err(e) => return self.fail(e),
            }
        }
    }

    /// Wait for the stream to end and return the accumulated result.
    ///
    /// Unconsumed fragments are drained first. The first error wins: setup, a chunk, a
    /// fragment that failed validation, the worker, then the final flush.
    pub async fn finish(mut self) -> Result<(GenerationResult, Option<UnsupportedOptions>)> {
        while self.next().await.is_some() {}

        let source = std::mem::replace(&mut self.source, Source::Finished);
        let result = match source {
            Source::Live(mut live) => {
                if let Some(worker) = live.worker.take() {
                    // Already cancelled on failure; this only waits for the task to exit.
                    let res = worker.await;
                    if self.error.is_none() {
                        res?;
                    }
                }
                if let Some(err) = self.error.take() {
                    return Err(err);
                }
                let mut result = live.acc.finalize(std::mem::take(&mut live.totals))?;
                if live.lie_tool_calls
                    && result.usage.finish_reason == Some(FinishReason::Stop)
                    && !result.tool_calls().is_empty()
                {
                    result.usage.finish_reason = Some(FinishReason::ToolCalls);
                }
                result.validate().map_err(Error::adapter)?;
                result.usage.limits = live.limits;
                result
            }
            Source::Replay(result) => result,
            Source::Failed | Source::Finished => {
                return Err(self.error.take().unwrap_or_else(|| {
                    Error::runtime_with_context(
                        "stream already finished",
                        crate::ErrorContext::new().with_source("gen_stream"),
                    )
                }))
            }
        };
        Ok((result, self.unsupported.take()))
    }
}

impl<A: ProviderAdapter> Stream for GenStream<A> {
    type Item = Fragment;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Fragment>> {
        let this = self.get_mut();
        loop {
            if let Some(f) = this.pending.pop_front() {
                return Poll::Ready(Some(f));
            }
            if this.exhausted {
                return Poll::Ready(None);
            }
            let Source::Live(live) = &mut this.source else {
                this.exhausted = true;
                continue;
            };
            match live.rx.poll_recv(cx) {
                Poll::Ready(Some(chunk)) => {
                    let out = live.processor.process(chunk, &mut live.totals);
                    this.deliver(out);
                }
                Poll::Ready(None) => {
                    // Queue closed: the worker is done sending. Its status decides whether the
                    // processor gets flushed.
                    if let Some(worker) = live.worker.as_mut() {
                        match Pin::new(worker).poll(cx) {
                            Poll::Pending => return Poll::Pending,
                            Poll::Ready(res) => {
                                live.worker = None;
                                if let Err(e) = res {
                                    this.fail(e);
                                    continue;
                                }
                            }
                        }
                    }
                    let out = live.processor.finish(&mut live.totals);
                    this.deliver(out);
                    this.exhausted = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<A: ProviderAdapter> Drop for GenStream<A> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
