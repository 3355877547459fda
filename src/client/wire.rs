use serde::{ Deserialize, Serialize };

use crate::models::chat::Message;

/// Message as it travels on the wire. Only role and content are
/// protocol-relevant; ids, timestamps and streaming flags stay local.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub stream: bool,
}

/// Single-shot response document. Lenient on shape: a missing `choices`
/// or `message` degrades to "no completion" rather than a parse error.
#[derive(Deserialize, Debug)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoice {
    #[serde(default)]
    pub message: Option<WireMessage>,
}

impl ChatResponse {
    /// Completion text of the first choice, if the endpoint returned one.
    pub fn completion_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|message| message.content)
    }
}

/// One decoded streaming frame payload.
#[derive(Deserialize, Debug)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Deserialize, Debug)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Delta,
}

#[derive(Deserialize, Debug, Default)]
pub struct Delta {
    pub content: Option<String>,
}

impl StreamChunk {
    /// Non-empty content delta of the first choice, if any.
    pub fn delta_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::chat::Message;

    #[test]
    fn wire_messages_carry_only_role_and_content() {
        let message = Message::user("hello");
        let wire = WireMessage::from(&message);
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json, serde_json::json!({ "role": "user", "content": "hello" }));
    }

    #[test]
    fn delta_text_follows_the_first_choice() {
        let chunk: StreamChunk =
            serde_json::from_str("{\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}").unwrap();
        assert_eq!(chunk.delta_text(), Some("Hi".to_string()));
    }

    #[test]
    fn empty_or_missing_deltas_yield_none() {
        let empty: StreamChunk =
            serde_json::from_str("{\"choices\":[{\"delta\":{\"content\":\"\"}}]}").unwrap();
        assert_eq!(empty.delta_text(), None);

        let missing: StreamChunk = serde_json::from_str("{\"choices\":[{}]}").unwrap();
        assert_eq!(missing.delta_text(), None);

        let no_choices: StreamChunk = serde_json::from_str("{}").unwrap();
        assert_eq!(no_choices.delta_text(), None);
    }

    #[test]
    fn completion_text_tolerates_missing_pieces() {
        let full: ChatResponse =
            serde_json::from_str("{\"choices\":[{\"message\":{\"role\":\"assistant\",\"content\":\"Hello\"}}]}")
                .unwrap();
        assert_eq!(full.completion_text(), Some("Hello".to_string()));

        let no_message: ChatResponse = serde_json::from_str("{\"choices\":[{}]}").unwrap();
        assert_eq!(no_message.completion_text(), None);

        let no_choices: ChatResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(no_choices.completion_text(), None);
    }
}
