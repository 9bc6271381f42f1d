use crate::errors::{BridgeError, BridgeResult};
use crate::models::agent::AgentMessage;
use crate::models::role::Role;

pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Counts reasoning/tool cycles reported by the engine and enforces a ceiling.
///
/// An `init` system message starts a fresh loop. Each assistant turn counts once;
/// consecutive assistant messages sharing an engine message id belong to the same turn.
#[derive(Debug)]
pub struct IterationGuard {
    max: usize,
    count: usize,
    last_message_id: Option<String>,
}

impl IterationGuard {
    pub fn new(max: usize) -> Self {
        Self {
            max,
            count: 0,
            last_message_id: None,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn observe(&mut self, message: &AgentMessage) -> BridgeResult<()> {
        match message {
            AgentMessage::System { subtype } if subtype.as_deref() == Some("init") => {
                self.count = 0;
                self.last_message_id = None;
            }
            AgentMessage::Content {
                role: Role::Assistant,
                message_id,
                ..
            } => {
                let same_turn = message_id.is_some() && *message_id == self.last_message_id;
                if !same_turn {
                    self.count += 1;
                    self.last_message_id = message_id.clone();
                    if self.count > self.max {
                        return Err(BridgeError::IterationLimitExceeded(self.max));
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_counts_assistant_turns() {
        let mut guard = IterationGuard::new(10);
        guard.observe(&AgentMessage::assistant().with_text("a")).unwrap();
        guard.observe(&AgentMessage::user().with_tool_result("t", None, json!("x"))).unwrap();
        guard.observe(&AgentMessage::assistant().with_text("b")).unwrap();
        guard.observe(&AgentMessage::Text("c".into())).unwrap();
        assert_eq!(guard.count(), 2);
    }

    #[test]
    fn test_same_message_id_is_one_turn() {
        let mut guard = IterationGuard::new(10);
        guard.observe(&AgentMessage::assistant().with_id("m1").with_thinking("t")).unwrap();
        guard.observe(&AgentMessage::assistant().with_id("m1").with_text("x")).unwrap();
        guard.observe(&AgentMessage::assistant().with_id("m2").with_text("y")).unwrap();
        assert_eq!(guard.count(), 2);
    }

    #[test]
    fn test_init_resets() {
        let mut guard = IterationGuard::new(1);
        guard.observe(&AgentMessage::assistant().with_text("a")).unwrap();
        guard.observe(&AgentMessage::system("init")).unwrap();
        assert_eq!(guard.count(), 0);
        guard.observe(&AgentMessage::assistant().with_text("b")).unwrap();
        guard.observe(&AgentMessage::system("status")).unwrap();
        assert_eq!(guard.count(), 1);
    }

    #[test]
    fn test_exceeding_ceiling() {
        let mut guard = IterationGuard::new(2);
        guard.observe(&AgentMessage::assistant().with_text("1")).unwrap();
        guard.observe(&AgentMessage::assistant().with_text("2")).unwrap();
        let err = guard
            .observe(&AgentMessage::assistant().with_text("3"))
            .unwrap_err();
        assert!(matches!(err, BridgeError::IterationLimitExceeded(2)));
    }
}
