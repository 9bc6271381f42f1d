use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::role::Role;
use crate::errors::{BridgeError, BridgeResult};

pub const DEFAULT_MODEL_ID: &str = "global.anthropic.claude-sonnet-4-5-20250929-v1:0";
pub const DEFAULT_REGION: &str = "us-east-1";

/// One element of a message or prompt: either a bare string or a structured block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentPart {
    Text(String),
    Block(Map<String, Value>),
    Other(Value),
}

impl ContentPart {
    pub fn text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(text) => Some(text),
            ContentPart::Block(block) => block.get("text").and_then(Value::as_str),
            ContentPart::Other(_) => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<ContentPart>),
    One(ContentPart),
}

fn content_parts<'de, D>(deserializer: D) -> Result<Vec<ContentPart>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(parts) => parts,
        OneOrMany::One(ContentPart::Other(Value::Null)) => Vec::new(),
        OneOrMany::One(part) => vec![part],
    })
}

fn default_role() -> String {
    "user".to_string()
}

/// A prior conversation turn supplied by the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default, deserialize_with = "content_parts")]
    pub content: Vec<ContentPart>,
}

impl InboundMessage {
    pub fn new<S: Into<String>>(role: S, content: Vec<ContentPart>) -> Self {
        Self {
            role: role.into(),
            content,
        }
    }

    /// Anything that is not `user` is treated as the assistant
    pub fn role(&self) -> Role {
        if self.role == "user" {
            Role::User
        } else {
            Role::Assistant
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PromptInput {
    Text(String),
    Parts(Vec<ContentPart>),
    Other(Value),
}

impl Default for PromptInput {
    fn default() -> Self {
        PromptInput::Parts(Vec::new())
    }
}

impl PromptInput {
    pub fn is_empty(&self) -> bool {
        match self {
            PromptInput::Text(text) => text.is_empty(),
            PromptInput::Parts(parts) => parts.is_empty(),
            PromptInput::Other(value) => match value {
                Value::Null => true,
                Value::Bool(b) => !b,
                Value::Number(n) => n.as_f64() == Some(0.0),
                Value::Object(map) => map.is_empty(),
                Value::String(s) => s.is_empty(),
                Value::Array(items) => items.is_empty(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSelector {
    #[serde(rename = "modelId", default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl ModelSelector {
    pub fn new<M: Into<String>, R: Into<String>>(model_id: M, region: R) -> Self {
        Self {
            model_id: Some(model_id.into()),
            region: Some(region.into()),
        }
    }

    pub fn model_id(&self) -> &str {
        self.model_id.as_deref().unwrap_or(DEFAULT_MODEL_ID)
    }

    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }

    pub fn is_empty(&self) -> bool {
        self.model_id.is_none() && self.region.is_none()
    }
}

/// Body of `POST /invocations`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub prompt: PromptInput,
    #[serde(default)]
    pub model: Option<ModelSelector>,
    #[serde(default)]
    pub user_id: Option<String>,
    /// Absent means every configured server, an empty list means none
    #[serde(default)]
    pub mcp_servers: Option<Vec<String>>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl InvocationRequest {
    /// Parse a raw request body, unwrapping a Lambda style `{"input": {...}}` envelope
    pub fn from_slice(body: &[u8]) -> BridgeResult<Self> {
        let mut value: Value = serde_json::from_slice(body)
            .map_err(|_| BridgeError::InvalidRequest("Invalid JSON in request body".into()))?;

        if let Some(inner) = value.get_mut("input").filter(|inner| inner.is_object()) {
            value = inner.take();
        }

        serde_json::from_value(value).map_err(|e| BridgeError::InvalidRequest(e.to_string()))
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.model.as_ref().map_or(true, ModelSelector::is_empty) {
            return Err(BridgeError::MissingModel);
        }
        if self.prompt.is_empty() && self.messages.is_empty() {
            return Err(BridgeError::MissingPrompt);
        }
        Ok(())
    }

    pub fn model(&self) -> ModelSelector {
        self.model.clone().unwrap_or_default()
    }
}

/// Correlation identifiers for one invocation. They are logged and never change behavior.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionInfo {
    pub session_id: Option<String>,
    pub trace_id: Option<String>,
}

impl SessionInfo {
    pub fn new(session_id: Option<String>, trace_id: Option<String>) -> Self {
        Self {
            session_id,
            trace_id,
        }
    }

    /// A session id carried in the payload takes precedence over the header value
    pub fn with_payload_session(mut self, session_id: Option<&str>) -> Self {
        if let Some(id) = session_id.filter(|id| !id.is_empty()) {
            self.session_id = Some(id.to_string());
        }
        self
    }
}
