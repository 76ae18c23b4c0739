use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::ToolCallId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: ToolCallId,
    pub name: String,
    pub input: ToolInput,
    #[serde(default)]
    pub result: Option<String>,
    pub status: ToolCallStatus,
}

impl ToolCall {
    /// Stub created on `tool start`, before any input has arrived.
    pub fn started(id: ToolCallId, name: String) -> Self {
        Self {
            id,
            name,
            input: ToolInput::empty(),
            result: None,
            status: ToolCallStatus::Running,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallStatus {
    Running,
    Completed,
    Error,
}

/// Tool input, decided once when the accumulated fragments are finalized.
///
/// On the wire `Raw(text)` is the wrapper object `{"raw": text}`; a parsed
/// input of exactly that shape therefore reads back as `Raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ToolInput {
    Parsed(Value),
    Raw(String),
}

impl ToolInput {
    pub fn empty() -> Self {
        ToolInput::Parsed(Value::Object(Map::new()))
    }

    /// Parse accumulated fragment text. Never fails: text that is not valid
    /// JSON is kept verbatim as `Raw`.
    pub fn from_fragments(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => ToolInput::Parsed(value),
            Err(_) => ToolInput::Raw(text.to_string()),
        }
    }
}

impl From<Value> for ToolInput {
    fn from(value: Value) -> Self {
        if let Value::Object(map) = &value {
            if map.len() == 1 {
                if let Some(Value::String(raw)) = map.get("raw") {
                    return ToolInput::Raw(raw.clone());
                }
            }
        }
        ToolInput::Parsed(value)
    }
}

impl From<ToolInput> for Value {
    fn from(input: ToolInput) -> Self {
        match input {
            ToolInput::Parsed(v) => v,
            ToolInput::Raw(raw) => serde_json::json!({ "raw": raw }),
        }
    }
}
