//! Flattening of conversation history and prompt input into the single text
//! prompt the agent engine accepts.

use crate::models::request::{ContentPart, InboundMessage, PromptInput};

fn joined_text(parts: &[ContentPart], separator: &str) -> String {
    parts
        .iter()
        .filter_map(ContentPart::text)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Render prior turns as `Human: ...` / `Assistant: ...` paragraphs.
///
/// Messages without any text-bearing part are skipped entirely.
pub fn normalize_history(messages: &[InboundMessage]) -> String {
    messages
        .iter()
        .filter(|message| message.content.iter().any(|part| part.text().is_some()))
        .map(|message| {
            format!(
                "{}: {}",
                message.role().label(),
                joined_text(&message.content, " ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn normalize_prompt(prompt: &PromptInput) -> String {
    match prompt {
        PromptInput::Text(text) => text.clone(),
        PromptInput::Parts(parts) => joined_text(parts, "\n"),
        PromptInput::Other(value) => value.to_string(),
    }
}

/// Build the engine-facing prompt from normalized history and prompt text
pub fn compose_prompt(history: &str, prompt: &str) -> String {
    if history.is_empty() {
        prompt.to_string()
    } else {
        format!("{}\n\nHuman: {}\nAssistant:", history, prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(role: &str, content: serde_json::Value) -> InboundMessage {
        serde_json::from_value(json!({"role": role, "content": content})).unwrap()
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(normalize_history(&[]), "");
    }

    #[test]
    fn test_history_labels_and_separators() {
        let history = vec![
            message("user", json!([{"text": "hi"}, "there"])),
            message("assistant", json!([{"text": "hello"}])),
            message("system", json!(["odd role"])),
        ];
        assert_eq!(
            normalize_history(&history),
            "Human: hi there\n\nAssistant: hello\n\nAssistant: odd role"
        );
    }

    #[test]
    fn test_history_skips_messages_without_text() {
        let history = vec![
            message("user", json!([{"image": {"format": "png"}}])),
            message("assistant", json!([])),
            message("user", json!([{"text": "kept"}, {"toolUse": {}}])),
        ];
        assert_eq!(normalize_history(&history), "Human: kept");
    }

    #[test]
    fn test_prompt_shapes() {
        assert_eq!(normalize_prompt(&PromptInput::Text("as is".into())), "as is");

        let parts: PromptInput = serde_json::from_value(json!([{"text": "a"}, "b", {"x": 1}])).unwrap();
        assert_eq!(normalize_prompt(&parts), "a\nb");

        assert_eq!(normalize_prompt(&PromptInput::Other(json!(42))), "42");
        assert_eq!(normalize_prompt(&PromptInput::default()), "");
    }

    #[test]
    fn test_compose_without_history() {
        assert_eq!(compose_prompt("", "X"), "X");
    }

    #[test]
    fn test_compose_with_history() {
        let history = normalize_history(&[message("user", json!([{"text": "hi"}]))]);
        assert_eq!(
            compose_prompt(&history, "go"),
            "Human: hi\n\nHuman: go\nAssistant:"
        );
    }
}
