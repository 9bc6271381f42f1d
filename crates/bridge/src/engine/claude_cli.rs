use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::base::{AgentEngine, EngineRequest, MessageStream};
use crate::errors::{BridgeError, BridgeResult};
use crate::models::agent::AgentMessage;

pub const DEFAULT_COMMAND: &str = "claude";
pub const DEFAULT_PERMISSION_MODE: &str = "default";

fn default_command() -> String {
    DEFAULT_COMMAND.to_string()
}

fn default_permission_mode() -> String {
    DEFAULT_PERMISSION_MODE.to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_command")]
    pub command: String,
    #[serde(default = "default_permission_mode")]
    pub permission_mode: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            command: default_command(),
            permission_mode: default_permission_mode(),
        }
    }
}

/// Runs the agent CLI as a child process and reads its stream-json output.
///
/// The child is killed when the returned stream is dropped.
#[derive(Debug, Clone)]
pub struct ClaudeCliEngine {
    command: String,
}

impl ClaudeCliEngine {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            command: settings.command.clone(),
        }
    }

    fn build_command(&self, request: &EngineRequest) -> BridgeResult<Command> {
        let mut cmd = Command::new(&self.command);
        cmd.args(["--print", "--output-format", "stream-json", "--verbose"])
            .arg("--model")
            .arg(request.model.model_id())
            .arg("--system-prompt")
            .arg(&request.system_prompt)
            .arg("--max-turns")
            .arg(request.max_turns.to_string())
            .arg("--permission-mode")
            .arg(&request.permission_mode);

        if !request.allowed_tools.is_empty() {
            cmd.arg("--allowedTools").arg(request.allowed_tools.join(","));
        }

        if !request.mcp_servers.is_empty() {
            let config = serde_json::to_string(&json!({ "mcpServers": request.mcp_servers }))
                .map_err(|e| BridgeError::Internal(format!("Failed to encode MCP config: {}", e)))?;
            cmd.arg("--mcp-config").arg(config);
        }

        cmd.arg("--").arg(&request.prompt);
        cmd.env("AWS_REGION", request.model.region());
        if let Some(cwd) = &request.cwd {
            cmd.current_dir(cwd);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }
}

#[async_trait]
impl AgentEngine for ClaudeCliEngine {
    async fn query(&self, request: EngineRequest) -> BridgeResult<MessageStream> {
        let mut child = self.build_command(&request)?.spawn().map_err(|e| {
            BridgeError::Engine(format!("Failed to start {}: {}", self.command, e))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::Engine("Failed to open engine stdout".into()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "engine", "{}", line);
                }
            });
        }

        tracing::debug!(command = %self.command, "Engine started");
        let mut segments = BufReader::new(stdout).split(b'\n');

        Ok(Box::pin(async_stream::try_stream! {
            // Lines are decoded lossily; a line that is not valid JSON afterwards is skipped.
            while let Some(raw) = segments.next_segment().await? {
                let line = String::from_utf8_lossy(&raw);
                if let Some(message) = AgentMessage::from_line(&line) {
                    yield message;
                }
            }

            let status = child.wait().await?;
            if !status.success() {
                Err::<(), BridgeError>(BridgeError::Engine(format!("Engine exited with {}", status)))?;
            }
        }))
    }
}
