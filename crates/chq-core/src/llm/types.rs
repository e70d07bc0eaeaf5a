//! LLM API types

use serde::{Deserialize, Serialize};

/// Message in a prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub const USER: &'static str = "user";
    pub const ASSISTANT: &'static str = "assistant";
    pub const SYSTEM: &'static str = "system";

    /// Create a user message with text
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Self::USER.to_string(),
            content: text.into(),
        }
    }

    /// Create an assistant message with text
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Self::ASSISTANT.to_string(),
            content: text.into(),
        }
    }

    /// Create a system message
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Self::SYSTEM.to_string(),
            content: text.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == Self::SYSTEM
    }
}

/// Content block in a Claude response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Messages API request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl MessagesRequest {
    /// Build a request, lifting system messages into the `system` field
    pub fn new(model: impl Into<String>, max_tokens: u64, messages: &[Message]) -> Self {
        let system = messages
            .iter()
            .filter(|m| m.is_system())
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        Self {
            model: model.into(),
            max_tokens,
            system: (!system.is_empty()).then_some(system),
            messages: messages.iter().filter(|m| !m.is_system()).cloned().collect(),
            temperature: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Messages API response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub id: String,
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl MessagesResponse {
    /// Concatenated text of all text blocks
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

// ============================================================================
// OpenAI-compatible types
// ============================================================================

/// Requested response format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
        }
    }
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

impl ChatCompletionRequest {
    /// Convert from a Messages API request; the system prompt leads the messages
    pub fn from_messages_request(req: &MessagesRequest) -> Self {
        let mut messages = Vec::with_capacity(req.messages.len() + 1);
        if let Some(system) = &req.system {
            messages.push(Message::system(system));
        }
        messages.extend(req.messages.iter().cloned());

        Self {
            model: req.model.clone(),
            messages,
            max_tokens: Some(req.max_tokens),
            temperature: req.temperature,
            response_format: None,
        }
    }

    pub fn json_mode(mut self) -> Self {
        self.response_format = Some(ResponseFormat::json_object());
        self
    }
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub choices: Vec<ChatChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    pub message: ChatMessageResponse,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessageResponse {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OpenAiUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl ChatCompletionResponse {
    /// Convert to a Messages API response
    pub fn to_messages_response(&self) -> MessagesResponse {
        let choice = self.choices.first();

        let content = choice
            .and_then(|c| c.message.content.clone())
            .filter(|text| !text.is_empty())
            .map(|text| vec![ContentBlock::Text { text }])
            .unwrap_or_default();

        let stop_reason = choice.and_then(|c| c.finish_reason.as_deref()).map(|reason| {
            match reason {
                "stop" => "end_turn".to_string(),
                other => other.to_string(),
            }
        });

        MessagesResponse {
            id: self.id.clone(),
            content,
            model: self.model.clone(),
            stop_reason,
            usage: self.usage.as_ref().map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_messages_are_lifted() {
        let messages = vec![
            Message::system("You are a planner."),
            Message::user("Find me a job"),
            Message::system("Reply in JSON."),
        ];
        let request = MessagesRequest::new("claude-sonnet-4-20250514", 1024, &messages).temperature(0.1);

        assert_eq!(request.system.as_deref(), Some("You are a planner.\n\nReply in JSON."));
        assert_eq!(request.messages, vec![Message::user("Find me a job")]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["max_tokens"], 1024);
        assert!((json["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_no_system_field_without_system_messages() {
        let request = MessagesRequest::new("m", 10, &[Message::user("hi")]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("system").is_none());
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_openai_request_leads_with_system() {
        let request = MessagesRequest::new("gpt-4o", 512, &[Message::system("sys"), Message::user("hi")]);
        let openai = ChatCompletionRequest::from_messages_request(&request).json_mode();

        assert_eq!(openai.messages[0], Message::system("sys"));
        assert_eq!(openai.messages[1], Message::user("hi"));
        let json = serde_json::to_value(&openai).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_claude_response_text_skips_other_blocks() {
        let body = r#"{
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude",
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "Hello"},
                {"type": "text", "text": "World"}
            ],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 3, "output_tokens": 2}
        }"#;
        let response: MessagesResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.text(), "Hello\nWorld");
    }

    #[test]
    fn test_openai_response_conversion() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1,
            "model": "gpt-4o",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"next\":\"FINISH\"}"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 5, "completion_tokens": 4, "total_tokens": 9}
        }"#;
        let response: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        let converted = response.to_messages_response();

        assert_eq!(converted.text(), r#"{"next":"FINISH"}"#);
        assert_eq!(converted.stop_reason.as_deref(), Some("end_turn"));
        assert_eq!(converted.usage.unwrap().output_tokens, 4);
    }
}
