use async_trait::async_trait;
use futures::stream::BoxStream;
use std::path::PathBuf;

use crate::errors::BridgeResult;
use crate::mcp::McpServers;
use crate::models::agent::AgentMessage;
use crate::models::request::ModelSelector;

/// Everything the engine needs for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRequest {
    pub prompt: String,
    pub system_prompt: String,
    pub model: ModelSelector,
    pub max_turns: u32,
    pub mcp_servers: McpServers,
    pub allowed_tools: Vec<String>,
    pub permission_mode: String,
    /// Working directory for the engine, if it should not inherit ours
    pub cwd: Option<PathBuf>,
}

/// Messages in engine yield order. Dropping the stream abandons the invocation.
pub type MessageStream = BoxStream<'static, BridgeResult<AgentMessage>>;

/// Base trait for conversational agent engines
#[async_trait]
pub trait AgentEngine: Send + Sync {
    /// Start an invocation and return its message stream
    async fn query(&self, request: EngineRequest) -> BridgeResult<MessageStream>;
}
