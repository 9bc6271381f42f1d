use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::role::Role;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolUseStart {
    pub name: String,
    pub tool_use_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultPayload {
    /// Each part is an object; plain values are wrapped as `{"text": ...}`
    pub content: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockStart {
    ToolUse(ToolUseStart),
    ToolResult(ToolResultPayload),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningText {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseInput {
    /// JSON text, never a nested object
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockDelta {
    Text(String),
    ReasoningContent(ReasoningText),
    ToolUse(ToolUseInput),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

/// One unit of the outbound stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WireEvent {
    MessageStart {
        role: Role,
    },
    ContentBlockStart {
        #[serde(rename = "contentBlockIndex")]
        index: usize,
        start: BlockStart,
    },
    ContentBlockDelta {
        #[serde(rename = "contentBlockIndex")]
        index: usize,
        delta: BlockDelta,
    },
    ContentBlockStop {
        #[serde(rename = "contentBlockIndex")]
        index: usize,
    },
    MessageStop {
        #[serde(rename = "stopReason")]
        stop_reason: StopReason,
    },
    Metadata {
        usage: Usage,
    },
    InternalServerException {
        message: String,
    },
}

#[derive(Serialize)]
struct Envelope<'a> {
    event: &'a WireEvent,
}

impl WireEvent {
    pub fn message_start() -> Self {
        WireEvent::MessageStart {
            role: Role::Assistant,
        }
    }

    pub fn message_stop() -> Self {
        WireEvent::MessageStop {
            stop_reason: StopReason::EndTurn,
        }
    }

    pub fn metadata() -> Self {
        WireEvent::Metadata {
            usage: Usage::default(),
        }
    }

    pub fn internal_server_exception<S: Into<String>>(message: S) -> Self {
        WireEvent::InternalServerException {
            message: message.into(),
        }
    }

    pub fn index(&self) -> Option<usize> {
        match self {
            WireEvent::ContentBlockStart { index, .. }
            | WireEvent::ContentBlockDelta { index, .. }
            | WireEvent::ContentBlockStop { index } => Some(*index),
            _ => None,
        }
    }

    /// Serialize as one `{"event": ...}` line, newline terminated
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(&Envelope { event: self })?;
        line.push('\n');
        Ok(line)
    }
}
