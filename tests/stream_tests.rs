use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use session_weave::config::EngineConfig;
use session_weave::engine::{Dispatcher, EngineState, Snapshot};
use session_weave::model::{Role, SessionStatus, ToolInput};
use session_weave::stream::{self, TailState};
use tempfile::TempDir;

fn line(value: serde_json::Value) -> String {
    format!("{value}\n")
}

fn stream_event(event: serde_json::Value) -> String {
    line(json!({"type": "stream_event", "event": event}))
}

fn tool_turn() -> String {
    [
        line(json!({"type": "system", "subtype": "init", "session_id": "backend-a"})),
        stream_event(json!({
            "type": "content_block_start",
            "index": 0,
            "content_block": {"type": "tool_use", "id": "toolu_1", "name": "search", "input": {}}
        })),
        stream_event(json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "input_json_delta", "partial_json": "{\"q\":"}
        })),
        stream_event(json!({
            "type": "content_block_delta",
            "index": 0,
            "delta": {"type": "input_json_delta", "partial_json": "\"cat\"}"}
        })),
        stream_event(json!({
            "type": "message_delta",
            "usage": {"input_tokens": 12, "output_tokens": 7}
        })),
        stream_event(json!({"type": "message_stop"})),
    ]
    .concat()
}

fn append(path: &Path, content: &str) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
}

async fn wait_for(
    dispatcher: &Dispatcher,
    mut done: impl FnMut(&Snapshot) -> bool,
) -> Arc<Snapshot> {
    let mut rx = dispatcher.snapshots();
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let snap = rx.borrow_and_update().clone();
            if done(&snap) {
                return snap;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("snapshot condition not reached")
}

#[tokio::test]
async fn replay_dir_reconciles_all_sessions() {
    let dir = TempDir::new().unwrap();
    append(&dir.path().join("a.jsonl"), &tool_turn());
    append(
        &dir.path().join("b.jsonl"),
        &stream_event(json!({
            "type": "message_delta",
            "usage": {"input_tokens": 50, "output_tokens": 20}
        })),
    );
    append(&dir.path().join("b.stderr"), "Error: rate limited\n\n");
    append(&dir.path().join("README.md"), "not a log\n");

    let dispatcher = Dispatcher::start(EngineState::new(), &EngineConfig::default());
    dispatcher.focus(Some("a".into()), Vec::new()).await.unwrap();

    let sent = stream::replay_dir(dir.path(), &dispatcher.subscribe())
        .await
        .unwrap();
    dispatcher.flush().await.unwrap();
    // a: resolved, tool start, 2 fragments, usage, complete. b: usage, stderr.
    assert_eq!(sent, 8);

    let snap = dispatcher.snapshot();
    let a = snap.session(&"a".into()).unwrap();
    assert_eq!(a.resolved_backend_id.as_deref(), Some("backend-a"));
    assert_eq!(a.total_input_tokens, 12);
    assert_eq!(snap.session(&"b".into()).unwrap().total_output_tokens, 20);

    assert_eq!(snap.transcript.len(), 1);
    let calls = snap.transcript[0].tool_calls.as_ref().unwrap();
    assert_eq!(calls[0].id.as_str(), "toolu_1");
    assert_eq!(calls[0].input, ToolInput::Parsed(json!({"q": "cat"})));

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn replay_skips_malformed_lines() {
    let dir = TempDir::new().unwrap();
    let content = [
        stream_event(json!({
            "type": "content_block_delta",
            "delta": {"type": "text_delta", "text": "kept"}
        })),
        "{\"type\": \"stream_event\", \"event\": {\"type\": \"content_blo\n".to_string(),
        stream_event(json!({"type": "message_stop"})),
    ]
    .concat();
    append(&dir.path().join("a.jsonl"), &content);

    let dispatcher = Dispatcher::start(EngineState::new(), &EngineConfig::default());
    dispatcher.focus(Some("a".into()), Vec::new()).await.unwrap();
    stream::replay_dir(dir.path(), &dispatcher.subscribe())
        .await
        .unwrap();
    dispatcher.flush().await.unwrap();

    let snap = dispatcher.snapshot();
    assert_eq!(snap.transcript.len(), 1);
    assert_eq!(snap.transcript[0].text(), "kept");

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn replay_of_missing_dir_is_an_error() {
    let dir = TempDir::new().unwrap();
    let dispatcher = Dispatcher::start(EngineState::new(), &EngineConfig::default());

    let result = stream::replay_dir(&dir.path().join("absent"), &dispatcher.subscribe()).await;
    assert!(result.is_err());

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tailing_follows_appended_lines() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("a.jsonl");
    append(
        &log,
        &stream_event(json!({
            "type": "content_block_delta",
            "delta": {"type": "text_delta", "text": "Hello "}
        })),
    );

    let config = EngineConfig::default().with_poll_interval(Duration::from_millis(20));
    let dispatcher = Dispatcher::start(EngineState::new(), &config);
    dispatcher.focus(Some("a".into()), Vec::new()).await.unwrap();

    let tail =
        stream::start_tailing(dir.path(), dispatcher.subscribe(), config.poll_interval).unwrap();

    let snap = wait_for(&dispatcher, |s| s.is_streaming).await;
    assert_eq!(snap.streaming.as_ref().unwrap().text(), "Hello ");

    append(
        &log,
        &[
            stream_event(json!({
                "type": "content_block_delta",
                "delta": {"type": "text_delta", "text": "world"}
            })),
            stream_event(json!({"type": "message_stop"})),
        ]
        .concat(),
    );
    let snap = wait_for(&dispatcher, |s| !s.transcript.is_empty()).await;
    assert_eq!(snap.transcript.len(), 1);
    assert_eq!(snap.transcript[0].role, Role::Assistant);
    assert_eq!(snap.transcript[0].text(), "Hello world");

    append(&dir.path().join("a.stderr"), "Error: overloaded\n");
    let snap = wait_for(&dispatcher, |s| s.transcript.len() == 2).await;
    assert_eq!(snap.transcript[1].role, Role::System);

    drop(tail);
    dispatcher.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tailing_picks_up_new_session_files() {
    let dir = TempDir::new().unwrap();
    let config = EngineConfig::default().with_poll_interval(Duration::from_millis(20));
    let dispatcher = Dispatcher::start(EngineState::new(), &config);
    let tail =
        stream::start_tailing(dir.path(), dispatcher.subscribe(), config.poll_interval).unwrap();

    append(
        &dir.path().join("late.jsonl"),
        &line(json!({"type": "system", "subtype": "init", "session_id": "backend-late"})),
    );

    let snap = wait_for(&dispatcher, |s| s.session(&"late".into()).is_some()).await;
    let late = snap.session(&"late".into()).unwrap();
    assert_eq!(late.resolved_backend_id.as_deref(), Some("backend-late"));
    assert_eq!(late.status, SessionStatus::Active);

    drop(tail);
    dispatcher.shutdown().await.unwrap();
}

#[test]
fn partial_trailing_line_waits_for_newline() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("a.jsonl");
    append(&log, "{\"type\":\"system\"");

    let mut tail = TailState::new();
    assert_eq!(tail.read_new_lines(&log).unwrap(), "");

    append(&log, ",\"subtype\":\"compaction\"}\n");
    let content = tail.read_new_lines(&log).unwrap();
    assert_eq!(content, "{\"type\":\"system\",\"subtype\":\"compaction\"}\n");
}
