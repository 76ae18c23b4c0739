use chrono::{DateTime, Utc};

use super::state::EngineState;
use crate::event::{EngineEvent, EventKind};
use crate::model::{SessionId, SessionStatus};

/// Where an event goes besides the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    RegistryOnly,
    RegistryAndTranscript,
}

/// Routing is a pure function of the event and the focused id.
pub fn route(event: &EngineEvent, focused: Option<&SessionId>) -> Route {
    let is_focused = focused.is_some_and(|id| *id == event.session_id);
    if is_focused && event.kind.is_transcript_event() {
        Route::RegistryAndTranscript
    } else {
        Route::RegistryOnly
    }
}

/// Apply one event to the engine state.
/// No I/O: deterministic apart from the wall-clock timestamp.
pub fn update(state: &mut EngineState, event: EngineEvent) {
    update_at(state, event, Utc::now());
}

/// `update` with an explicit clock, for deterministic tests.
pub fn update_at(state: &mut EngineState, event: EngineEvent, now: DateTime<Utc>) {
    if matches!(event.kind, EventKind::Unknown) {
        tracing::debug!(session = %event.session_id, "ignoring unknown event kind");
    }

    let decision = route(&event, state.focused());
    let activity = state.registry.observe(&event, now).activity;
    tracing::debug!(
        session = %event.session_id,
        kind = event.kind.name(),
        ?activity,
        ?decision,
        "event applied"
    );

    let Some(transcript) = state
        .transcript
        .as_mut()
        .filter(|t| *t.session_id() == event.session_id)
    else {
        return;
    };

    // An error status forces the focused transcript back to idle even though
    // status events are otherwise registry-only.
    if let EventKind::SessionStatus {
        status: SessionStatus::Error,
    } = event.kind
    {
        transcript.reset_in_flight();
        return;
    }

    if decision != Route::RegistryAndTranscript {
        return;
    }

    match event.kind {
        EventKind::TextDelta { text } => transcript.on_text_delta(&text, now),
        EventKind::ToolStart { tool_name, tool_id } => {
            transcript.on_tool_start(tool_id, tool_name, now)
        }
        EventKind::ToolInputFragment { partial_json } => {
            if !transcript.on_tool_input(&partial_json) {
                tracing::debug!(
                    session = %event.session_id,
                    "input fragment without an open tool call, dropped"
                );
            }
        }
        EventKind::MessageComplete => {
            if let Some(message) = transcript.on_message_complete(now) {
                tracing::debug!(
                    session = %event.session_id,
                    message = %message.uuid,
                    tool_calls = message.tool_calls.as_ref().map_or(0, Vec::len),
                    "assistant message finalized"
                );
            }
        }
        EventKind::Stderr { text } => transcript.on_stderr(&text, now),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityState, Role, TokenUsage, ToolCallStatus, ToolInput};
    use serde_json::json;

    fn focused_on(id: &str) -> EngineState {
        let mut state = EngineState::new();
        state.focus(Some(id.into()), Vec::new());
        state
    }

    #[test]
    fn route_is_pure_function_of_focus() {
        let a: SessionId = "a".into();
        let delta = EngineEvent::text_delta("a", "x");
        let usage = EngineEvent::usage("a", TokenUsage::new(1, 1));

        assert_eq!(route(&delta, Some(&a)), Route::RegistryAndTranscript);
        assert_eq!(route(&delta, Some(&"b".into())), Route::RegistryOnly);
        assert_eq!(route(&delta, None), Route::RegistryOnly);
        assert_eq!(route(&usage, Some(&a)), Route::RegistryOnly);
    }

    #[test]
    fn tool_call_scenario() {
        let mut state = focused_on("a");
        for event in [
            EngineEvent::tool_start("a", "t1", "search"),
            EngineEvent::tool_input("a", r#"{"q":"#),
            EngineEvent::tool_input("a", r#""cat"}"#),
            EngineEvent::message_complete("a"),
        ] {
            update(&mut state, event);
        }

        let snap = state.snapshot();
        assert_eq!(snap.transcript.len(), 1);
        let message = &snap.transcript[0];
        assert_eq!(message.role, Role::Assistant);
        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id.as_str(), "t1");
        assert_eq!(calls[0].name, "search");
        assert_eq!(calls[0].input, ToolInput::Parsed(json!({"q": "cat"})));
        assert_eq!(calls[0].status, ToolCallStatus::Completed);
    }

    #[test]
    fn unfocused_transcript_events_only_touch_registry() {
        let mut state = focused_on("a");
        update(&mut state, EngineEvent::text_delta("b", "hello"));
        update(&mut state, EngineEvent::tool_start("b", "t9", "bash"));

        let snap = state.snapshot();
        assert!(snap.transcript.is_empty());
        assert!(!snap.is_streaming);
        assert_eq!(
            snap.session(&"b".into()).unwrap().activity,
            ActivityState::ToolRunning
        );
    }

    #[test]
    fn error_status_resets_focused_stream() {
        let mut state = focused_on("a");
        update(&mut state, EngineEvent::text_delta("a", "partial"));
        update(&mut state, EngineEvent::status("a", SessionStatus::Error));

        let snap = state.snapshot();
        assert!(!snap.is_streaming);
        assert!(snap.transcript.is_empty());
        assert_eq!(snap.session(&"a".into()).unwrap().activity, ActivityState::Idle);

        // Nothing left to flush.
        update(&mut state, EngineEvent::message_complete("a"));
        assert!(state.snapshot().transcript.is_empty());
    }

    #[test]
    fn error_status_for_other_session_leaves_focus_alone() {
        let mut state = focused_on("a");
        update(&mut state, EngineEvent::text_delta("a", "keep"));
        update(&mut state, EngineEvent::status("b", SessionStatus::Error));

        let snap = state.snapshot();
        assert!(snap.is_streaming);
        assert_eq!(snap.streaming.unwrap().text(), "keep");
    }

    #[test]
    fn unknown_event_registers_session_only() {
        let mut state = focused_on("a");
        update(&mut state, EngineEvent::new("a", EventKind::Unknown));

        let snap = state.snapshot();
        assert_eq!(snap.sessions.len(), 1);
        assert!(snap.transcript.is_empty());
    }

    #[test]
    fn update_at_uses_given_clock() {
        let mut state = focused_on("a");
        let at = "2026-02-11T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        update_at(&mut state, EngineEvent::stderr("a", "boom"), at);

        let snap = state.snapshot();
        assert_eq!(snap.transcript[0].timestamp, at);
        assert_eq!(snap.session(&"a".into()).unwrap().last_event_at, Some(at));
    }
}
