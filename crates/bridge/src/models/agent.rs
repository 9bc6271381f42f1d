use serde_json::Value;

use super::role::Role;

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolUse {
    pub id: Option<String>,
    pub name: Option<String>,
    pub input: Option<Value>,
}

/// The outcome of a tool invocation, as reported back by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct ToolResult {
    pub tool_use_id: Option<String>,
    pub status: Option<String>,
    /// A string, a list of parts, null, or anything else the engine chose to send
    pub content: Value,
}

#[derive(Debug, Clone, PartialEq)]
/// A single block inside an engine message
pub enum ContentBlock {
    Text(String),
    Thinking(String),
    ToolUse(ToolUse),
    ToolResult(ToolResult),
    Unknown(Value),
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(String::from)
}

impl ContentBlock {
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentBlock::Text(text.into())
    }

    pub fn thinking<S: Into<String>>(text: S) -> Self {
        ContentBlock::Thinking(text.into())
    }

    pub fn tool_use<I: Into<String>, N: Into<String>>(id: I, name: N, input: Value) -> Self {
        ContentBlock::ToolUse(ToolUse {
            id: Some(id.into()),
            name: Some(name.into()),
            input: Some(input),
        })
    }

    pub fn tool_result<I: Into<String>>(tool_use_id: I, status: Option<&str>, content: Value) -> Self {
        ContentBlock::ToolResult(ToolResult {
            tool_use_id: Some(tool_use_id.into()),
            status: status.map(String::from),
            content,
        })
    }

    /// Classify one raw block by its `type` tag
    pub fn from_value(value: Value) -> Self {
        match value.get("type").and_then(Value::as_str) {
            Some("text") => ContentBlock::Text(str_field(&value, "text").unwrap_or_default()),
            Some("thinking") | Some("reasoning") => ContentBlock::Thinking(
                str_field(&value, "thinking")
                    .or_else(|| str_field(&value, "text"))
                    .unwrap_or_default(),
            ),
            Some("tool_use") => ContentBlock::ToolUse(ToolUse {
                id: str_field(&value, "id").or_else(|| str_field(&value, "toolUseId")),
                name: str_field(&value, "name"),
                input: value.get("input").cloned(),
            }),
            Some("tool_result") => {
                let status = str_field(&value, "status").or_else(|| {
                    value
                        .get("is_error")
                        .and_then(Value::as_bool)
                        .map(|is_error| if is_error { "error" } else { "success" })
                        .map(String::from)
                });
                ContentBlock::ToolResult(ToolResult {
                    tool_use_id: str_field(&value, "tool_use_id")
                        .or_else(|| str_field(&value, "toolUseId")),
                    status,
                    content: value.get("content").cloned().unwrap_or(Value::Null),
                })
            }
            _ => ContentBlock::Unknown(value),
        }
    }
}

/// A message yielded by the agent engine, classified by shape
#[derive(Debug, Clone, PartialEq)]
pub enum AgentMessage {
    /// Engine bookkeeping, never surfaced to the client
    System { subtype: Option<String> },
    /// End-of-run summary, never surfaced to the client
    Result {
        subtype: Option<String>,
        is_error: bool,
        num_turns: Option<u64>,
    },
    Content {
        role: Role,
        message_id: Option<String>,
        blocks: Vec<ContentBlock>,
    },
    Text(String),
    Unknown(Value),
}

impl AgentMessage {
    pub fn assistant() -> Self {
        AgentMessage::Content {
            role: Role::Assistant,
            message_id: None,
            blocks: Vec::new(),
        }
    }

    pub fn user() -> Self {
        AgentMessage::Content {
            role: Role::User,
            message_id: None,
            blocks: Vec::new(),
        }
    }

    pub fn system<S: Into<String>>(subtype: S) -> Self {
        AgentMessage::System {
            subtype: Some(subtype.into()),
        }
    }

    /// Set the engine message id. Has no effect on non-content messages.
    pub fn with_id<S: Into<String>>(mut self, id: S) -> Self {
        if let AgentMessage::Content { message_id, .. } = &mut self {
            *message_id = Some(id.into());
        }
        self
    }

    /// Append a block. Has no effect on non-content messages.
    pub fn with_block(mut self, block: ContentBlock) -> Self {
        if let AgentMessage::Content { blocks, .. } = &mut self {
            blocks.push(block);
        }
        self
    }

    pub fn with_text<S: Into<String>>(self, text: S) -> Self {
        self.with_block(ContentBlock::text(text))
    }

    pub fn with_thinking<S: Into<String>>(self, text: S) -> Self {
        self.with_block(ContentBlock::thinking(text))
    }

    pub fn with_tool_use<I: Into<String>, N: Into<String>>(self, id: I, name: N, input: Value) -> Self {
        self.with_block(ContentBlock::tool_use(id, name, input))
    }

    pub fn with_tool_result<I: Into<String>>(
        self,
        tool_use_id: I,
        status: Option<&str>,
        content: Value,
    ) -> Self {
        self.with_block(ContentBlock::tool_result(tool_use_id, status, content))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, AgentMessage::System { .. } | AgentMessage::Result { .. })
    }

    /// Classify one raw engine message. This is the only place raw engine JSON is inspected.
    pub fn from_value(value: Value) -> Self {
        match value.get("type").and_then(Value::as_str) {
            Some("system") => {
                return AgentMessage::System {
                    subtype: str_field(&value, "subtype"),
                }
            }
            Some("result") => {
                return AgentMessage::Result {
                    subtype: str_field(&value, "subtype"),
                    is_error: value
                        .get("is_error")
                        .and_then(Value::as_bool)
                        .unwrap_or(false),
                    num_turns: value.get("num_turns").and_then(Value::as_u64),
                }
            }
            _ => {}
        }

        let body = value
            .get("message")
            .filter(|message| message.is_object())
            .unwrap_or(&value);

        if let Some(blocks) = body
            .get("content")
            .and_then(Value::as_array)
            .filter(|blocks| !blocks.is_empty())
        {
            let role = match body
                .get("role")
                .or_else(|| value.get("type"))
                .and_then(Value::as_str)
            {
                Some("user") => Role::User,
                _ => Role::Assistant,
            };
            return AgentMessage::Content {
                role,
                message_id: str_field(body, "id"),
                blocks: blocks.iter().cloned().map(ContentBlock::from_value).collect(),
            };
        }

        if let Some(text) = str_field(&value, "text").filter(|text| !text.is_empty()) {
            return AgentMessage::Text(text);
        }

        AgentMessage::Unknown(value)
    }

    /// Parse one line of engine output. Blank or malformed lines are dropped.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(value) => Some(Self::from_value(value)),
            Err(e) => {
                let truncated: String = line.chars().take(80).collect();
                tracing::warn!(error = %e, line = %truncated, "Failed to parse engine output line");
                None
            }
        }
    }
}
