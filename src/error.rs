//! Error types for session-weave
//!
//! Domain-specific error enums using thiserror. Tool-input parse failures are
//! not errors at all: they are recovered as `ToolInput::Raw`.

#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    #[error("JSON parse: {0}")]
    Json(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WatcherError {
    #[error("notify: {0}")]
    Notify(String),
    #[error("I/O: {0}")]
    Io(String),
}

impl From<notify::Error> for WatcherError {
    fn from(e: notify::Error) -> Self {
        WatcherError::Notify(e.to_string())
    }
}

impl From<std::io::Error> for WatcherError {
    fn from(e: std::io::Error) -> Self {
        WatcherError::Io(e.to_string())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("dispatcher is shut down")]
    Closed,
    #[error("dispatcher task failed: {0}")]
    Task(String),
    #[error("history for session {session}: {reason}")]
    History { session: String, reason: String },
    #[error("backend: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("channel capacity must be greater than zero")]
    ZeroCapacity,
    #[error("invalid log filter {filter:?}: {reason}")]
    LogFilter { filter: String, reason: String },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WeaveError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Watcher(#[from] WatcherError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
