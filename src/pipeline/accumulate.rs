use crate::error::ErrorContext;
use crate::types::{FinishReason, Fragment, GenerationResult, Logprob, Usage};
use crate::{Error, Result};

/// Per-stream usage and log probabilities, mutated by the chunk processor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamTotals {
    pub usage: Usage,
    pub logprobs: Vec<Vec<Logprob>>,
}

impl StreamTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Providers report cumulative totals, so a report with any non-zero counter replaces all
    /// counters. A reported finish reason always replaces the previous one.
    pub fn report_usage(&mut self, report: &Usage) {
        if !report.counters_are_zero() {
            self.usage.input_tokens = report.input_tokens;
            self.usage.input_cached_tokens = report.input_cached_tokens;
            self.usage.reasoning_tokens = report.reasoning_tokens;
            self.usage.output_tokens = report.output_tokens;
            self.usage.total_tokens = report.total_tokens;
        }
        if let Some(reason) = &report.finish_reason {
            self.usage.finish_reason = Some(reason.clone());
        }
    }

    pub fn set_finish_reason(&mut self, reason: FinishReason) {
        self.usage.finish_reason = Some(reason);
    }

    pub fn push_logprobs(&mut self, positions: impl IntoIterator<Item = Vec<Logprob>>) {
        self.logprobs.extend(positions);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorState {
    Collecting,
    Finalized,
}

/// Folds validated fragments into a [`GenerationResult`].
#[derive(Debug)]
pub struct FragmentAccumulator {
    result: GenerationResult,
    state: AccumulatorState,
}

impl Default for FragmentAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FragmentAccumulator {
    pub fn new() -> Self {
        Self {
            result: GenerationResult::default(),
            state: AccumulatorState::Collecting,
        }
    }

    pub fn state(&self) -> AccumulatorState {
        self.state
    }

    /// Validate and fold one fragment.
    ///
    /// Returns `Ok(false)` for an empty fragment, which must not be forwarded. An invalid
    /// fragment is an adapter bug.
    pub fn push(&mut self, fragment: &Fragment) -> Result<bool> {
        self.ensure_collecting()?;
        if let Err(e) = fragment.validate() {
            return Err(Error::adapter(e));
        }
        if fragment.is_empty() {
            return Ok(false);
        }
        self.result.accumulate(fragment).map_err(Error::adapter)?;
        Ok(true)
    }

    /// Move to the finalized state and hand out the result. Not reentrant.
    pub fn finalize(&mut self, totals: StreamTotals) -> Result<GenerationResult> {
        self.ensure_collecting()?;
        self.state = AccumulatorState::Finalized;
        let mut result = std::mem::take(&mut self.result);
        result.usage = Usage {
            limits: std::mem::take(&mut result.usage.limits),
            ..totals.usage
        };
        result.logprobs = totals.logprobs;
        Ok(result)
    }

    fn ensure_collecting(&self) -> Result<()> {
        match self.state {
            AccumulatorState::Collecting => Ok(()),
            AccumulatorState::Finalized => Err(Error::runtime_with_context(
                "fragment accumulator already finalized",
                ErrorContext::new().with_source("fragment_accumulator"),
            )),
        }
    }
}
