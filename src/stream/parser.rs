use serde_json::Value;

use crate::error::ParseError;
use crate::event::EngineEvent;
use crate::model::{SessionId, TokenUsage, ToolCallId};

/// Decode one NDJSON line of the assistant CLI's `stream-json` output into
/// engine events.
///
/// # Functional Core
/// Pure function - no I/O, just string parsing.
///
/// The CLI wraps API streaming events in `{"type":"stream_event","event":{..}}`
/// and emits `system`, `assistant` and `result` entries at the top level.
/// Lines with nothing the engine cares about decode to no events.
///
/// # Errors
/// Returns ParseError if the line is not valid JSON.
pub fn parse_stream_line(session_id: &SessionId, line: &str) -> Result<Vec<EngineEvent>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let entry: Value =
        serde_json::from_str(trimmed).map_err(|e| ParseError::Json(e.to_string()))?;

    let mut events = Vec::new();
    match str_field(&entry, "type") {
        "stream_event" => {
            if let Some(inner) = entry.get("event") {
                decode_api_event(session_id, inner, &mut events);
            }
        }
        "system" => decode_system(session_id, &entry, &mut events),
        "result" => decode_result(session_id, &entry, &mut events),
        "assistant" => {
            tracing::trace!(session = %session_id, "assistant message echo ignored");
        }
        other => {
            tracing::debug!(session = %session_id, kind = other, "unknown top-level entry type");
        }
    }
    Ok(events)
}

/// Decode a chunk of NDJSON. Malformed lines are skipped (concurrent
/// writers can leave partial JSON behind).
pub fn parse_stream_chunk(session_id: &SessionId, content: &str) -> Vec<EngineEvent> {
    let mut events = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        match parse_stream_line(session_id, line) {
            Ok(mut decoded) => events.append(&mut decoded),
            Err(e) => {
                tracing::warn!(
                    session = %session_id,
                    line = line_num + 1,
                    error = %e,
                    preview = %truncate_str(line.trim(), 200),
                    "skipping malformed stream line"
                );
            }
        }
    }
    events
}

/// Each non-empty stderr line becomes one error-text event.
pub fn parse_stderr_chunk(session_id: &SessionId, content: &str) -> Vec<EngineEvent> {
    content
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .map(|l| EngineEvent::stderr(session_id.clone(), l))
        .collect()
}

fn decode_system(session_id: &SessionId, entry: &Value, events: &mut Vec<EngineEvent>) {
    match str_field(entry, "subtype") {
        "init" => {
            let backend_id = entry
                .get("session_id")
                .or_else(|| entry.get("message").and_then(|m| m.get("session_id")))
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty());
            tracing::debug!(
                session = %session_id,
                backend_id = ?backend_id,
                model = ?entry.get("model").and_then(|m| m.as_str()),
                "init"
            );
            if let Some(id) = backend_id {
                events.push(EngineEvent::resolved(session_id.clone(), id));
            }
        }
        "compaction" => events.push(EngineEvent::compaction(session_id.clone())),
        // hook_started, hook_response, etc. are internal to the CLI
        _ => {}
    }
}

fn decode_api_event(session_id: &SessionId, inner: &Value, events: &mut Vec<EngineEvent>) {
    match str_field(inner, "type") {
        "content_block_start" => {
            let Some(block) = inner.get("content_block") else {
                return;
            };
            if str_field(block, "type") != "tool_use" {
                return;
            }
            let name = block
                .get("name")
                .and_then(|n| n.as_str())
                .unwrap_or("unknown");
            match ToolCallId::try_new(str_field(block, "id")) {
                Some(id) => events.push(EngineEvent::tool_start(session_id.clone(), id, name)),
                None => {
                    tracing::warn!(session = %session_id, tool = name, "tool_use block without id");
                }
            }
        }
        "content_block_delta" => {
            let Some(delta) = inner.get("delta") else {
                return;
            };
            match str_field(delta, "type") {
                "text_delta" => {
                    if let Some(text) = delta.get("text").and_then(|t| t.as_str()) {
                        events.push(EngineEvent::text_delta(session_id.clone(), text));
                    }
                }
                "input_json_delta" => {
                    if let Some(partial) = delta.get("partial_json").and_then(|j| j.as_str()) {
                        events.push(EngineEvent::tool_input(session_id.clone(), partial));
                    }
                }
                _ => {}
            }
        }
        "message_delta" => {
            if let Some(usage) = inner.get("usage") {
                events.push(EngineEvent::usage(session_id.clone(), usage_from(usage)));
            }
            if let Some(reason) = inner
                .get("delta")
                .and_then(|d| d.get("stop_reason"))
                .and_then(|s| s.as_str())
            {
                tracing::debug!(session = %session_id, stop_reason = reason, "message_delta");
            }
        }
        "message_stop" => events.push(EngineEvent::message_complete(session_id.clone())),
        "message_start" | "content_block_stop" | "ping" => {}
        other => {
            tracing::debug!(session = %session_id, kind = other, "unknown stream event type");
        }
    }
}

fn decode_result(session_id: &SessionId, entry: &Value, events: &mut Vec<EngineEvent>) {
    if entry.get("is_error").and_then(|v| v.as_bool()).unwrap_or(false) {
        tracing::warn!(
            session = %session_id,
            subtype = str_field(entry, "subtype"),
            "result reported an error"
        );
    }
    if let Some(usage) = entry.get("usage") {
        events.push(EngineEvent::usage(session_id.clone(), usage_from(usage)));
    }
    // Completes the turn even when message_stop was missed; a second
    // completion with nothing buffered is a no-op.
    events.push(EngineEvent::message_complete(session_id.clone()));
}

fn usage_from(usage: &Value) -> TokenUsage {
    let count = |key: &str| usage.get(key).and_then(|v| v.as_u64()).unwrap_or(0);
    TokenUsage::new(count("input_tokens"), count("output_tokens")).with_cache(
        count("cache_creation_input_tokens"),
        count("cache_read_input_tokens"),
    )
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(|v| v.as_str()).unwrap_or("")
}

/// Truncate to a maximum character count (not bytes), so multibyte
/// characters never get split.
pub(crate) fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect::<String>() + "..."
    }
}
