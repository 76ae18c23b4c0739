use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::registry::SessionRegistry;
use super::transcript::TranscriptAssembler;
use crate::model::{Message, Session, SessionId};

/// Engine-owned state. Mutated only through `update` and the operations
/// below, all driven by the dispatcher; observers receive `Snapshot`s.
#[derive(Debug, Clone, Default)]
pub struct EngineState {
    pub(super) registry: SessionRegistry,
    /// Transcript of the focused session, `None` when nothing is focused.
    pub(super) transcript: Option<TranscriptAssembler>,
}

/// Immutable view handed to the UI. Sessions and the transcript log are
/// shared with the engine, so publishing one costs no deep copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub sessions: Vec<Arc<Session>>,
    pub focused: Option<SessionId>,
    pub transcript: Arc<Vec<Message>>,
    pub streaming: Option<Message>,
    pub is_streaming: bool,
}

impl Snapshot {
    pub fn session(&self, id: &SessionId) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| &s.id == id)
            .map(Arc::as_ref)
    }
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn transcript(&self) -> Option<&TranscriptAssembler> {
        self.transcript.as_ref()
    }

    pub fn focused(&self) -> Option<&SessionId> {
        self.transcript.as_ref().map(|t| t.session_id())
    }

    /// Switch focus. In-flight buffers of the previous focus are dropped;
    /// the new focus starts from `history` with empty buffers. Buffered
    /// events are never replayed.
    pub fn focus(&mut self, session_id: Option<SessionId>, history: Vec<Message>) {
        if let Some(prev) = &self.transcript {
            if prev.is_streaming() || prev.pending_tool_calls() > 0 {
                tracing::debug!(
                    session = %prev.session_id(),
                    pending_tools = prev.pending_tool_calls(),
                    "dropping in-flight transcript state on focus change"
                );
            }
        }
        self.transcript = session_id.map(|id| TranscriptAssembler::new(id, history));
    }

    /// Record a locally sent user message. Returns false when `session_id`
    /// is not the focused session.
    pub fn push_user_message(
        &mut self,
        session_id: &SessionId,
        text: &str,
        now: DateTime<Utc>,
    ) -> bool {
        match self
            .transcript
            .as_mut()
            .filter(|t| t.session_id() == session_id)
        {
            Some(t) => {
                t.push_user_message(text, now);
                true
            }
            None => false,
        }
    }

    /// Explicit session clear. Returns false for an unknown session.
    pub fn clear_usage(&mut self, session_id: &SessionId) -> bool {
        self.registry.clear_usage(session_id)
    }

    /// Discard every in-flight buffer without emitting partial messages.
    /// Registry and the finalized log survive.
    pub fn teardown(&mut self) {
        if let Some(t) = self.transcript.as_mut() {
            t.reset_in_flight();
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        let (transcript, streaming, is_streaming) = match &self.transcript {
            Some(t) => (t.shared_log(), t.streaming_view(), t.is_streaming()),
            None => (Arc::default(), None, false),
        };
        Snapshot {
            sessions: self.registry.shared(),
            focused: self.focused().cloned(),
            transcript,
            streaming,
            is_streaming,
        }
    }
}
