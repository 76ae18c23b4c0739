use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::tool_buffer::ToolCallBuffer;
use crate::model::{Message, MessageId, SessionId, ToolCallId};

/// Live transcript of the focused session: the finalized log plus the
/// streaming text and pending tool calls of the message in progress.
#[derive(Debug, Clone)]
pub struct TranscriptAssembler {
    session_id: SessionId,
    /// Shared with published snapshots; copied only when a message is
    /// appended while a snapshot still holds it.
    log: Arc<Vec<Message>>,
    streaming: String,
    is_streaming: bool,
    /// Id and start time shared by the streaming view and the message it
    /// becomes on completion.
    pending_id: MessageId,
    pending_since: Option<DateTime<Utc>>,
    tools: ToolCallBuffer,
}

impl TranscriptAssembler {
    /// Start a transcript seeded with externally loaded history.
    pub fn new(session_id: SessionId, history: Vec<Message>) -> Self {
        Self {
            session_id,
            log: Arc::new(history),
            streaming: String::new(),
            is_streaming: false,
            pending_id: MessageId::fresh(),
            pending_since: None,
            tools: ToolCallBuffer::new(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn log(&self) -> &[Message] {
        &self.log
    }

    pub fn shared_log(&self) -> Arc<Vec<Message>> {
        Arc::clone(&self.log)
    }

    pub fn streaming_text(&self) -> &str {
        &self.streaming
    }

    pub fn is_streaming(&self) -> bool {
        self.is_streaming
    }

    pub fn pending_tool_calls(&self) -> usize {
        self.tools.len()
    }

    pub fn on_text_delta(&mut self, text: &str, now: DateTime<Utc>) {
        self.pending_since.get_or_insert(now);
        self.streaming.push_str(text);
        self.is_streaming = true;
    }

    pub fn on_tool_start(&mut self, id: ToolCallId, name: String, now: DateTime<Utc>) {
        self.pending_since.get_or_insert(now);
        self.tools.start(id, name);
    }

    pub fn on_tool_input(&mut self, fragment: &str) -> bool {
        self.tools.push_fragment(fragment)
    }

    /// Turn the buffered text and tool calls into one assistant message.
    /// A completion with nothing buffered appends nothing.
    pub fn on_message_complete(&mut self, now: DateTime<Utc>) -> Option<&Message> {
        let calls = self.tools.complete();
        let text = std::mem::take(&mut self.streaming);
        self.is_streaming = false;
        let timestamp = self.pending_since.take().unwrap_or(now);
        let id = std::mem::replace(&mut self.pending_id, MessageId::fresh());

        if text.is_empty() && calls.is_empty() {
            return None;
        }

        let mut message = Message::assistant(text, timestamp).with_tool_calls(calls);
        message.uuid = id;
        self.append(message);
        self.log.last()
    }

    /// Error text is appended immediately, outside the streaming lifecycle.
    pub fn on_stderr(&mut self, text: &str, now: DateTime<Utc>) {
        self.append(Message::system(text.to_string(), now));
    }

    /// Locally sent user message.
    pub fn push_user_message(&mut self, text: &str, now: DateTime<Utc>) {
        self.append(Message::user(text.to_string(), now));
    }

    fn append(&mut self, message: Message) {
        Arc::make_mut(&mut self.log).push(message);
    }

    /// Back to a clean idle baseline: streaming text and pending tool calls
    /// are discarded, never flushed.
    pub fn reset_in_flight(&mut self) {
        self.streaming.clear();
        self.is_streaming = false;
        self.pending_since = None;
        self.pending_id = MessageId::fresh();
        self.tools.discard();
    }

    /// Transient view of the message being streamed. Text only; pending tool
    /// calls are never exposed before they are finalized.
    pub fn streaming_view(&self) -> Option<Message> {
        if !self.is_streaming {
            return None;
        }
        let timestamp = self.pending_since.unwrap_or_else(Utc::now);
        let mut message = Message::assistant(self.streaming.clone(), timestamp).streaming();
        message.uuid = self.pending_id.clone();
        Some(message)
    }
}
