//! Per-session activity derivation.
//!
//! Activity is a best-effort summary for the session list, not a guarded
//! state machine: every event may override the previous value and there is
//! no illegal transition.

use crate::event::EventKind;
use crate::model::{ActivityState, SessionStatus};

/// Activity after applying `kind` to a session currently in `current`.
/// Events that say nothing about activity leave it unchanged.
pub fn next_activity(current: ActivityState, kind: &EventKind) -> ActivityState {
    match kind {
        EventKind::TextDelta { .. } => ActivityState::Streaming,
        EventKind::ToolStart { .. } => ActivityState::ToolRunning,
        EventKind::MessageComplete => ActivityState::Idle,
        EventKind::SessionStatus { status } => status_activity(current, *status),
        EventKind::ToolInputFragment { .. }
        | EventKind::Stderr { .. }
        | EventKind::UsageUpdate { .. }
        | EventKind::SessionIdResolved { .. }
        | EventKind::Compaction
        | EventKind::Unknown => current,
    }
}

fn status_activity(current: ActivityState, status: SessionStatus) -> ActivityState {
    match status {
        SessionStatus::WaitingInput => ActivityState::AwaitingInput,
        // `active` only means "thinking" until output starts arriving.
        SessionStatus::Active => match current {
            ActivityState::Streaming | ActivityState::ToolRunning => current,
            _ => ActivityState::Thinking,
        },
        SessionStatus::Completed | SessionStatus::Paused | SessionStatus::Error => {
            ActivityState::Idle
        }
    }
}
