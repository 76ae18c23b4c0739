pub mod activity;
pub mod dispatcher;
pub mod registry;
pub mod state;
pub mod tool_buffer;
pub mod transcript;
pub mod update;

pub use activity::next_activity;
pub use dispatcher::{Dispatcher, EventSink, HistoryLoader, SessionBackend};
pub use registry::SessionRegistry;
pub use state::{EngineState, Snapshot};
pub use tool_buffer::ToolCallBuffer;
pub use transcript::TranscriptAssembler;
pub use update::{route, update, update_at, Route};
