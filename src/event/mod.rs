use serde::{Deserialize, Serialize};

use crate::model::{SessionId, SessionStatus, TokenUsage, ToolCallId};

/// One event from a session's feed, tagged with the session it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineEvent {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl EngineEvent {
    pub fn new(session_id: impl Into<SessionId>, kind: EventKind) -> Self {
        Self {
            session_id: session_id.into(),
            kind,
        }
    }

    pub fn text_delta(session_id: impl Into<SessionId>, text: impl Into<String>) -> Self {
        Self::new(session_id, EventKind::TextDelta { text: text.into() })
    }

    pub fn tool_start(
        session_id: impl Into<SessionId>,
        tool_id: impl Into<ToolCallId>,
        tool_name: impl Into<String>,
    ) -> Self {
        Self::new(
            session_id,
            EventKind::ToolStart {
                tool_name: tool_name.into(),
                tool_id: tool_id.into(),
            },
        )
    }

    pub fn tool_input(session_id: impl Into<SessionId>, partial_json: impl Into<String>) -> Self {
        Self::new(
            session_id,
            EventKind::ToolInputFragment {
                partial_json: partial_json.into(),
            },
        )
    }

    pub fn message_complete(session_id: impl Into<SessionId>) -> Self {
        Self::new(session_id, EventKind::MessageComplete)
    }

    pub fn stderr(session_id: impl Into<SessionId>, text: impl Into<String>) -> Self {
        Self::new(session_id, EventKind::Stderr { text: text.into() })
    }

    pub fn status(session_id: impl Into<SessionId>, status: SessionStatus) -> Self {
        Self::new(session_id, EventKind::SessionStatus { status })
    }

    pub fn usage(session_id: impl Into<SessionId>, usage: TokenUsage) -> Self {
        Self::new(session_id, EventKind::UsageUpdate { usage })
    }

    pub fn resolved(session_id: impl Into<SessionId>, backend_id: impl Into<String>) -> Self {
        Self::new(
            session_id,
            EventKind::SessionIdResolved {
                resolved_backend_id: backend_id.into(),
            },
        )
    }

    pub fn compaction(session_id: impl Into<SessionId>) -> Self {
        Self::new(session_id, EventKind::Compaction)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum EventKind {
    TextDelta {
        text: String,
    },
    ToolStart {
        tool_name: String,
        tool_id: ToolCallId,
    },
    ToolInputFragment {
        partial_json: String,
    },
    MessageComplete,
    Stderr {
        text: String,
    },
    SessionStatus {
        status: SessionStatus,
    },
    UsageUpdate {
        usage: TokenUsage,
    },
    SessionIdResolved {
        resolved_backend_id: String,
    },
    Compaction,
    /// Any kind this build does not know about. Ignored.
    #[serde(other)]
    Unknown,
}

impl EventKind {
    /// Kinds that mutate the focused transcript or its buffers.
    pub fn is_transcript_event(&self) -> bool {
        matches!(
            self,
            EventKind::TextDelta { .. }
                | EventKind::ToolStart { .. }
                | EventKind::ToolInputFragment { .. }
                | EventKind::MessageComplete
                | EventKind::Stderr { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::TextDelta { .. } => "text_delta",
            EventKind::ToolStart { .. } => "tool_start",
            EventKind::ToolInputFragment { .. } => "tool_input_fragment",
            EventKind::MessageComplete => "message_complete",
            EventKind::Stderr { .. } => "stderr",
            EventKind::SessionStatus { .. } => "session_status",
            EventKind::UsageUpdate { .. } => "usage_update",
            EventKind::SessionIdResolved { .. } => "session_id_resolved",
            EventKind::Compaction => "compaction",
            EventKind::Unknown => "unknown",
        }
    }
}
