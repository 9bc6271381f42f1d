use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::base::{AgentEngine, EngineRequest, MessageStream};
use crate::errors::{BridgeError, BridgeResult};
use crate::models::agent::AgentMessage;

/// A mock engine that replays pre-configured messages for testing.
/// Each query consumes the next script; once they run out, queries see an empty stream.
#[derive(Clone, Default)]
pub struct MockEngine {
    scripts: Arc<Mutex<VecDeque<Vec<BridgeResult<AgentMessage>>>>>,
    start_error: Option<String>,
    requests: Arc<Mutex<Vec<EngineRequest>>>,
}

impl MockEngine {
    /// Create a new mock engine with a sequence of messages
    pub fn new(messages: Vec<AgentMessage>) -> Self {
        Self::with_results(messages.into_iter().map(Ok).collect())
    }

    /// Create a mock engine whose stream can also yield errors
    pub fn with_results(results: Vec<BridgeResult<AgentMessage>>) -> Self {
        Self::with_scripts(vec![results])
    }

    /// Create a mock engine that answers successive queries with successive scripts
    pub fn with_scripts(scripts: Vec<Vec<BridgeResult<AgentMessage>>>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            ..Default::default()
        }
    }

    /// Create a mock engine that fails before producing a stream
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self {
            start_error: Some(message.into()),
            ..Default::default()
        }
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<EngineRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentEngine for MockEngine {
    async fn query(&self, request: EngineRequest) -> BridgeResult<MessageStream> {
        self.requests.lock().unwrap().push(request);
        if let Some(message) = &self.start_error {
            return Err(BridgeError::Engine(message.clone()));
        }
        let messages = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Ok(stream::iter(messages).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::ModelSelector;
    use futures::TryStreamExt;

    fn request(prompt: &str) -> EngineRequest {
        EngineRequest {
            prompt: prompt.into(),
            system_prompt: String::new(),
            model: ModelSelector::new("model-x", "us-west-2"),
            max_turns: 1,
            mcp_servers: Default::default(),
            allowed_tools: Vec::new(),
            permission_mode: "default".into(),
            cwd: None,
        }
    }

    #[tokio::test]
    async fn test_scripts_are_served_in_order() {
        let engine = MockEngine::with_scripts(vec![
            vec![Ok(AgentMessage::system("first"))],
            vec![Ok(AgentMessage::system("second"))],
        ]);

        let first: Vec<_> = engine.query(request("a")).await.unwrap().try_collect().await.unwrap();
        let second: Vec<_> = engine.query(request("b")).await.unwrap().try_collect().await.unwrap();
        let third: Vec<_> = engine.query(request("c")).await.unwrap().try_collect().await.unwrap();

        assert_eq!(first, vec![AgentMessage::system("first")]);
        assert_eq!(second, vec![AgentMessage::system("second")]);
        assert!(third.is_empty());
        let prompts: Vec<_> = engine.requests().into_iter().map(|r| r.prompt).collect();
        assert_eq!(prompts, vec!["a", "b", "c"]);
    }
}
