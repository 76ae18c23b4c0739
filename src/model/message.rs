use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ids::MessageId;
use super::tool_call::ToolCall;

/// One transcript entry. Immutable once appended to a transcript log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub uuid: MessageId,
    /// Back-reference only; the transcript does not own the parent.
    #[serde(default)]
    pub parent_uuid: Option<MessageId>,
    pub role: Role,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    pub is_streaming: bool,
}

impl Message {
    pub fn new(role: Role, content: MessageContent, timestamp: DateTime<Utc>) -> Self {
        Self {
            uuid: MessageId::fresh(),
            parent_uuid: None,
            role,
            content,
            timestamp,
            tool_calls: None,
            is_streaming: false,
        }
    }

    pub fn assistant(text: String, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::Assistant, MessageContent::Text(text), timestamp)
    }

    pub fn system(text: String, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::System, MessageContent::Text(text), timestamp)
    }

    pub fn user(text: String, timestamp: DateTime<Utc>) -> Self {
        Self::new(Role::User, MessageContent::Text(text), timestamp)
    }

    /// Attach tool calls; an empty list leaves the field absent.
    pub fn with_tool_calls(mut self, calls: Vec<ToolCall>) -> Self {
        self.tool_calls = if calls.is_empty() { None } else { Some(calls) };
        self
    }

    pub fn streaming(mut self) -> Self {
        self.is_streaming = true;
        self
    }

    /// Plain text of the message, joining text blocks for block content.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(t) => t.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Value,
        #[serde(default)]
        is_error: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToolCall;

    #[test]
    fn empty_tool_calls_are_absent() {
        let msg = Message::assistant("hi".into(), Utc::now()).with_tool_calls(vec![]);
        assert!(msg.tool_calls.is_none());

        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("toolCalls").is_none());
    }

    #[test]
    fn with_tool_calls_keeps_order() {
        let msg = Message::assistant(String::new(), Utc::now()).with_tool_calls(vec![
            ToolCall::started("t1".into(), "a".into()),
            ToolCall::started("t2".into(), "b".into()),
        ]);
        let calls = msg.tool_calls.unwrap();
        assert_eq!(calls[0].id.as_str(), "t1");
        assert_eq!(calls[1].id.as_str(), "t2");
    }

    #[test]
    fn block_content_deserializes_and_joins_text() {
        let json = r#"{
            "uuid": "m1",
            "role": "assistant",
            "timestamp": "2026-02-11T10:00:00Z",
            "content": [
                {"type": "text", "text": "Hello "},
                {"type": "tool_use", "id": "t1", "name": "Read", "input": {"file_path": "a.rs"}},
                {"type": "text", "text": "world"}
            ]
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(matches!(msg.content, MessageContent::Blocks(ref b) if b.len() == 3));
        assert_eq!(msg.text(), "Hello world");
        assert!(msg.parent_uuid.is_none());
        assert!(!msg.is_streaming);
    }

    #[test]
    fn history_keeps_parent_link() {
        let json = r#"{
            "uuid": "m2",
            "parentUuid": "m1",
            "role": "user",
            "timestamp": "2026-02-11T10:00:00Z",
            "content": "follow-up"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.parent_uuid, Some("m1".into()));
        assert_eq!(msg.text(), "follow-up");
    }

    #[test]
    fn message_keys_are_camel_case() {
        let msg = Message::assistant("hi".into(), Utc::now())
            .with_tool_calls(vec![ToolCall::started("t1".into(), "Read".into())])
            .streaming();
        let json = serde_json::to_value(&msg).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["content", "isStreaming", "parentUuid", "role", "timestamp", "toolCalls", "uuid"]
        );
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
    }
}
