//! Stream-log event source.
//!
//! Each session writes its CLI stdout to `<session-id>.jsonl` and its stderr
//! to `<session-id>.stderr` inside one directory. This module decodes those
//! logs into engine events, either once (`replay_dir`) or continuously
//! (`start_tailing`).

mod parser;
mod tail;

pub use parser::{parse_stderr_chunk, parse_stream_chunk, parse_stream_line};
pub use tail::TailState;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use notify::{Config, EventKind as NotifyKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::engine::EventSink;
use crate::error::{EngineError, WatcherError};
use crate::event::EngineEvent;
use crate::model::SessionId;

/// Result type for watcher operations
pub type WatcherResult<T> = Result<T, WatcherError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Stdout,
    Stderr,
}

/// Session and log kind of a file in the stream directory, if it is one.
pub fn classify(path: &Path) -> Option<(SessionId, LogKind)> {
    let kind = match path.extension()?.to_str()? {
        "jsonl" => LogKind::Stdout,
        "stderr" => LogKind::Stderr,
        _ => return None,
    };
    let stem = path.file_stem()?.to_str()?;
    Some((SessionId::try_new(stem)?, kind))
}

pub fn decode(session_id: &SessionId, kind: LogKind, content: &str) -> Vec<EngineEvent> {
    match kind {
        LogKind::Stdout => parse_stream_chunk(session_id, content),
        LogKind::Stderr => parse_stderr_chunk(session_id, content),
    }
}

/// Stream logs in `dir`, sorted by path.
pub fn list_logs(dir: &Path) -> WatcherResult<Vec<PathBuf>> {
    let mut logs: Vec<PathBuf> = std::fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && classify(path).is_some())
        .collect();
    logs.sort();
    Ok(logs)
}

/// Read every log in `dir` once and feed the decoded events to `sink`.
/// Returns the number of events sent.
pub async fn replay_dir(dir: &Path, sink: &EventSink) -> Result<usize, crate::WeaveError> {
    let mut sent = 0;
    for path in list_logs(dir)? {
        let Some((session_id, kind)) = classify(&path) else {
            continue;
        };
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(WatcherError::from)?;
        let events = decode(&session_id, kind, &content);
        tracing::debug!(path = %path.display(), events = events.len(), "replaying stream log");
        for event in events {
            sink.send(event).await?;
            sent += 1;
        }
    }
    Ok(sent)
}

/// Keeps the tailer running; dropping it stops the watcher and poller.
pub struct TailHandle {
    _watcher: RecommendedWatcher,
    stop: Arc<AtomicBool>,
}

impl Drop for TailHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Follow every stream log in `dir`, forwarding newly appended lines to
/// `sink`. Existing content is read first.
///
/// # Imperative Shell
/// Spawns a worker thread owning the `TailState`, a `notify` watcher and a
/// poller (inotify can miss appends on some filesystems; the offsets make
/// double reads harmless).
pub fn start_tailing(
    dir: &Path,
    sink: EventSink,
    poll_interval: Duration,
) -> WatcherResult<TailHandle> {
    std::fs::create_dir_all(dir)?;

    let stop = Arc::new(AtomicBool::new(false));
    let worker = start_tail_worker(sink);

    let worker_watcher = worker.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(event.kind, NotifyKind::Create(_) | NotifyKind::Modify(_)) {
                    return;
                }
                for path in event.paths {
                    if classify(&path).is_some() {
                        let _ = worker_watcher.send(path);
                    }
                }
            }
            Err(e) => tracing::warn!(error = %e, "stream watcher error"),
        },
        Config::default().with_poll_interval(poll_interval),
    )?;
    watcher.watch(dir, RecursiveMode::NonRecursive)?;

    for path in list_logs(dir)? {
        let _ = worker.send(path);
    }

    let poll_dir = dir.to_path_buf();
    let poll_stop = stop.clone();
    std::thread::spawn(move || loop {
        std::thread::sleep(poll_interval);
        if poll_stop.load(Ordering::Relaxed) {
            return;
        }
        let logs = match list_logs(&poll_dir) {
            Ok(logs) => logs,
            Err(e) => {
                tracing::warn!(dir = %poll_dir.display(), error = %e, "stream dir scan failed");
                continue;
            }
        };
        for path in logs {
            if worker.send(path).is_err() {
                return;
            }
        }
    });

    tracing::info!(dir = %dir.display(), "tailing stream logs");
    Ok(TailHandle {
        _watcher: watcher,
        stop,
    })
}

/// Worker thread that owns the offsets, so no lock is shared with the
/// watcher callback.
fn start_tail_worker(sink: EventSink) -> mpsc::Sender<PathBuf> {
    let (tx, rx) = mpsc::channel::<PathBuf>();

    std::thread::spawn(move || {
        let mut tail_state = TailState::new();

        while let Ok(path) = rx.recv() {
            let Some((session_id, kind)) = classify(&path) else {
                continue;
            };
            let content = match tail_state.read_new_lines(&path) {
                Ok(content) => content,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "stream log read failed");
                    continue;
                }
            };
            if content.is_empty() {
                continue;
            }
            for event in decode(&session_id, kind, &content) {
                if let Err(EngineError::Closed) = sink.blocking_send(event) {
                    tracing::debug!("event sink closed, tail worker exiting");
                    return;
                }
            }
        }
    });

    tx
}
