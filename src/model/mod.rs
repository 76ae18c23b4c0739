pub mod ids;
pub mod message;
pub mod session;
pub mod tool_call;
pub mod usage;

pub use ids::{MessageId, SessionId, ToolCallId};
pub use message::{ContentBlock, Message, MessageContent, Role};
pub use session::{ActivityState, Session, SessionStatus};
pub use tool_call::{ToolCall, ToolCallStatus, ToolInput};
pub use usage::TokenUsage;
