//! Conversion of agent engine messages into indexed content block events.
//!
//! A converter is created per streamed response and owns the current block index.
//! Text and thinking deltas are written at the current index without opening or
//! closing a block. Every tool use and tool result opens a block, closes it, and
//! advances the index by one. Conversion never fails: a block that cannot be
//! converted degrades to a text delta or to nothing.

use serde::ser::Error as _;
use serde::Serialize;
use serde_json::{json, Value};
use std::io;
use thiserror::Error;

use crate::models::agent::{AgentMessage, ContentBlock, ToolResult, ToolUse};
use crate::models::event::{
    BlockDelta, BlockStart, ReasoningText, ToolResultPayload, ToolUseInput, ToolUseStart,
    WireEvent,
};

const UNKNOWN_TOOL: &str = "unknown_tool";
const NO_CONTENT: &str = "(no content)";

#[derive(Error, Debug)]
enum ConversionError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Writes JSON with a space after `,` and `:` separators.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

fn to_json_text(value: &Value) -> serde_json::Result<String> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(serde_json::Error::custom)
}

fn stringify(value: &Value) -> Result<String, ConversionError> {
    match value {
        Value::String(text) => Ok(text.clone()),
        other => Ok(to_json_text(other)?),
    }
}

// Serializing an in-memory `Value` cannot fail, so current input never hits the `Err` arm.
fn normalize_result_content(content: &Value) -> Result<Vec<Value>, ConversionError> {
    Ok(match content {
        Value::Null => vec![json!({ "text": NO_CONTENT })],
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Object(_) => Ok(item.clone()),
                other => Ok(json!({ "text": stringify(other)? })),
            })
            .collect::<Result<Vec<_>, ConversionError>>()?,
        Value::String(text) => vec![json!({ "text": text })],
        other => vec![json!({ "text": stringify(other)? })],
    })
}

#[derive(Debug, Default)]
pub struct ContentBlockConverter {
    current_index: usize,
}

impl ContentBlockConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Map one engine message to zero or more events, in block order
    pub fn convert(&mut self, message: &AgentMessage) -> Vec<WireEvent> {
        match message {
            AgentMessage::System { subtype } => {
                tracing::debug!(subtype = subtype.as_deref().unwrap_or("-"), "Skipping system message");
                Vec::new()
            }
            AgentMessage::Result { subtype, .. } => {
                tracing::debug!(subtype = subtype.as_deref().unwrap_or("-"), "Skipping result message");
                Vec::new()
            }
            AgentMessage::Content { blocks, .. } if !blocks.is_empty() => blocks
                .iter()
                .flat_map(|block| self.convert_block(block))
                .collect(),
            AgentMessage::Text(text) if !text.is_empty() => self.text(text),
            other => self.convert_unknown(other),
        }
    }

    fn convert_unknown(&mut self, message: &AgentMessage) -> Vec<WireEvent> {
        tracing::warn!("Unknown message shape");
        let repr = match message {
            AgentMessage::Unknown(value) => to_json_text(value),
            other => Ok(format!("{:?}", other)),
        };
        match repr {
            Ok(repr) if !repr.is_empty() => self.text(&format!("[Unknown message: {}]", repr)),
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to convert unknown message");
                Vec::new()
            }
        }
    }

    fn convert_block(&mut self, block: &ContentBlock) -> Vec<WireEvent> {
        match block {
            ContentBlock::Text(text) => self.text(text),
            ContentBlock::Thinking(text) => self.thinking(text),
            ContentBlock::ToolUse(tool_use) => self.tool_use(tool_use),
            ContentBlock::ToolResult(result) => {
                let payload = tool_result_payload(result);
                self.tool_result(payload)
            }
            ContentBlock::Unknown(value) => match value.get("text").and_then(Value::as_str) {
                Some(text) => self.text(text),
                None => {
                    let block_type = value.get("type").and_then(Value::as_str).unwrap_or("-");
                    tracing::warn!(block_type, "Unknown content block without text");
                    Vec::new()
                }
            },
        }
    }

    fn text(&self, text: &str) -> Vec<WireEvent> {
        let mut text = text.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        vec![WireEvent::ContentBlockDelta {
            index: self.current_index,
            delta: BlockDelta::Text(text),
        }]
    }

    fn thinking(&self, text: &str) -> Vec<WireEvent> {
        vec![WireEvent::ContentBlockDelta {
            index: self.current_index,
            delta: BlockDelta::ReasoningContent(ReasoningText {
                text: text.to_string(),
            }),
        }]
    }

    fn tool_use(&mut self, tool_use: &ToolUse) -> Vec<WireEvent> {
        let index = self.current_index;
        let name = tool_use.name.clone().unwrap_or_else(|| UNKNOWN_TOOL.to_string());
        let tool_use_id = tool_use
            .id
            .clone()
            .unwrap_or_else(|| format!("tool_use_{}", index));
        let input = match &tool_use.input {
            Some(Value::String(raw)) => raw.clone(),
            Some(value) => to_json_text(value).unwrap_or_else(|e| {
                tracing::error!(error = %e, tool = %name, "Failed to serialize tool input");
                "{}".to_string()
            }),
            None => "{}".to_string(),
        };

        self.current_index += 1;
        vec![
            WireEvent::ContentBlockStart {
                index,
                start: BlockStart::ToolUse(ToolUseStart { name, tool_use_id }),
            },
            WireEvent::ContentBlockDelta {
                index,
                delta: BlockDelta::ToolUse(ToolUseInput { input }),
            },
            WireEvent::ContentBlockStop { index },
        ]
    }

    /// Open and close a tool result block, or degrade to an error text delta
    fn tool_result(&mut self, payload: Result<ToolResultPayload, ConversionError>) -> Vec<WireEvent> {
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to convert tool result");
                return self.text(&format!("[Tool Result Error]: {}", e));
            }
        };

        let index = self.current_index;
        self.current_index += 1;
        vec![
            WireEvent::ContentBlockStart {
                index,
                start: BlockStart::ToolResult(payload),
            },
            WireEvent::ContentBlockStop { index },
        ]
    }
}

fn tool_result_payload(result: &ToolResult) -> Result<ToolResultPayload, ConversionError> {
    Ok(ToolResultPayload {
        content: normalize_result_content(&result.content)?,
        tool_use_id: result.tool_use_id.clone().filter(|id| !id.is_empty()),
        status: result.status.clone().filter(|status| !status.is_empty()),
    })
}
