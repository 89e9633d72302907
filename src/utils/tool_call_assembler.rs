use crate::types::tool::ToolCall;
use crate::{Error, Result};

/// Rebuilds tool calls that a provider streams in pieces.
///
/// Providers typically send the id and name first, then the arguments JSON in several chunks.
/// A delta continues the pending call when it has no id, repeats the pending id, or has no name.
/// Any other delta starts a new call, and the pending one is returned as complete.
///
/// Adapters should feed whole chunks through [`push_chunk`](ToolCallAssembler::push_chunk) so that
/// content arriving after a call closes it and chunk order is kept.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    pending: Option<ToolCall>,
}

impl ToolCallAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one delta. Returns the previous call when this delta starts a new one.
    pub fn push(&mut self, delta: ToolCall) -> Option<ToolCall> {
        if !self.continues(&delta) {
            return self.pending.replace(delta);
        }
        let pending = self.pending.as_mut()?;
        if pending.id.is_empty() {
            pending.id = delta.id;
        }
        if pending.name.is_empty() {
            pending.name = delta.name;
        }
        pending.arguments.push_str(&delta.arguments);
        pending.opaque.extend(delta.opaque);
        None
    }

    /// Feed the tool-call deltas of one chunk.
    ///
    /// `has_content` tells whether the same chunk also carries text, reasoning or any other
    /// output. Such a chunk closes the pending call, and a continuation inside it is an adapter
    /// bug. The returned calls were completed by this chunk and go before its own content.
    pub fn push_chunk<I>(&mut self, deltas: I, has_content: bool) -> Result<Vec<ToolCall>>
    where
        I: IntoIterator<Item = ToolCall>,
    {
        let mut done = Vec::new();
        let mut deltas = deltas.into_iter().peekable();
        if has_content && deltas.peek().is_none() {
            done.extend(self.pending.take());
            return Ok(done);
        }
        for delta in deltas {
            if has_content && self.continues(&delta) {
                return Err(Error::adapter(format!(
                    "tool call {:?} continued in a chunk that also carries content",
                    self.pending.as_ref().map(|p| p.id.as_str()).unwrap_or_default()
                )));
            }
            done.extend(self.push(delta));
        }
        Ok(done)
    }

    fn continues(&self, delta: &ToolCall) -> bool {
        match &self.pending {
            Some(p) => delta.id.is_empty() || delta.id == p.id || delta.name.is_empty(),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending call at end of stream.
    pub fn flush(&mut self) -> Option<ToolCall> {
        self.pending.take()
    }
}
