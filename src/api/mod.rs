use serde::{Deserialize, Serialize};

use crate::core::message::Message;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
        }
    }
}

/// Body posted to every model endpoint. The endpoint itself selects the
/// model, so no model name travels in the payload.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn streaming(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            stream: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;

    #[test]
    fn request_serializes_messages_and_stream_flag() {
        let request = ChatRequest::streaming(vec![
            ChatMessage::from(&Message::new(Role::System, "be brief")),
            ChatMessage::from(&Message::new(Role::User, "Hi")),
        ]);

        let value = serde_json::to_value(&request).expect("request serializes");
        assert_eq!(
            value,
            serde_json::json!({
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "Hi"}
                ],
                "stream": true
            })
        );
    }
}
