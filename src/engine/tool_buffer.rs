//! Assembly of tool calls from `start` + input fragments.
//!
//! Only one tool call accumulates input at a time. A backend that
//! interleaves fragments from two concurrent tool calls in the same session
//! would corrupt assembly; the assistant CLI streams content blocks
//! sequentially, so this is assumed not to happen.

use crate::model::{ToolCall, ToolCallId, ToolCallStatus, ToolInput};

#[derive(Debug, Clone, Default)]
pub struct ToolCallBuffer {
    calls: Vec<ToolCall>,
    /// Raw fragment text for the last call while it is still open.
    accumulator: String,
    open: bool,
}

impl ToolCallBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new tool call, finalizing the previous one first.
    pub fn start(&mut self, id: ToolCallId, name: String) {
        self.finalize_open();
        self.calls.push(ToolCall::started(id, name));
        self.accumulator.clear();
        self.open = true;
    }

    /// Append a fragment verbatim. Returns false (and drops the fragment)
    /// when no tool call is open.
    pub fn push_fragment(&mut self, fragment: &str) -> bool {
        if !self.open {
            return false;
        }
        self.accumulator.push_str(fragment);
        true
    }

    /// Freeze the open call's input. A call that received no fragments keeps
    /// its empty stub input.
    pub fn finalize_open(&mut self) {
        if !self.open {
            return;
        }
        if !self.accumulator.is_empty() {
            if let Some(call) = self.calls.last_mut() {
                call.input = ToolInput::from_fragments(&self.accumulator);
            }
        }
        self.accumulator.clear();
        self.open = false;
    }

    /// Finalize, mark every buffered call completed and hand them over,
    /// leaving the buffer empty.
    pub fn complete(&mut self) -> Vec<ToolCall> {
        self.finalize_open();
        let mut calls = std::mem::take(&mut self.calls);
        for call in &mut calls {
            call.status = ToolCallStatus::Completed;
        }
        calls
    }

    /// Drop everything without finalizing.
    pub fn discard(&mut self) {
        self.calls.clear();
        self.accumulator.clear();
        self.open = false;
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn has_open_call(&self) -> bool {
        self.open
    }
}
