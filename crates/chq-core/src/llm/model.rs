//! Language model interface
//!
//! Nodes talk to the model through `LanguageModel` so tests can script
//! replies and the HTTP client can be wrapped (see `ThrottledModel`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::workflow::repair::{parse_structured, repair_json_output};
use crate::{Error, Result};

use super::types::Message;

/// Which model configuration a call uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProfile {
    Basic,
    Reasoning,
}

impl ModelProfile {
    /// Profile for planning-style calls
    pub fn for_deep_thinking(deep_thinking_mode: bool) -> Self {
        if deep_thinking_mode {
            Self::Reasoning
        } else {
            Self::Basic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Reasoning => "reasoning",
        }
    }
}

impl fmt::Display for ModelProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send messages and return the reply text
    async fn invoke(&self, profile: ModelProfile, messages: &[Message]) -> Result<String>;

    /// Send messages and return a JSON object shaped by `schema`
    ///
    /// The default appends a schema instruction, invokes, repairs the reply
    /// and parses it. A reply with no JSON object is `Error::MalformedOutput`.
    async fn invoke_structured(
        &self,
        profile: ModelProfile,
        messages: &[Message],
        schema: &Value,
    ) -> Result<Value> {
        let mut prompt = messages.to_vec();
        prompt.push(Message::system(schema_instruction(schema)));
        let raw = self.invoke(profile, &prompt).await?;
        parse_structured_reply(&raw)
    }
}

#[async_trait]
impl<M: LanguageModel + ?Sized> LanguageModel for Arc<M> {
    async fn invoke(&self, profile: ModelProfile, messages: &[Message]) -> Result<String> {
        (**self).invoke(profile, messages).await
    }

    async fn invoke_structured(
        &self,
        profile: ModelProfile,
        messages: &[Message],
        schema: &Value,
    ) -> Result<Value> {
        (**self).invoke_structured(profile, messages, schema).await
    }
}

/// Instruction asking for a bare JSON object matching `schema`
pub fn schema_instruction(schema: &Value) -> String {
    format!(
        "Respond with a single JSON object that conforms to this JSON schema. \
         Do not add any text before or after the object.\n{}",
        schema
    )
}

/// Read a JSON object out of a model reply
pub fn parse_structured_reply(raw: &str) -> Result<Value> {
    let repaired = repair_json_output(raw);
    if let Some(value @ Value::Object(_)) = parse_structured(&repaired) {
        return Ok(value);
    }

    // Object embedded in prose
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Some(value @ Value::Object(_)) = parse_structured(&raw[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(Error::MalformedOutput(format!(
        "expected a JSON object, got: {}",
        truncate(raw, 200)
    )))
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct EchoModel {
        reply: String,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn invoke(&self, _profile: ModelProfile, messages: &[Message]) -> Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn test_profile_for_deep_thinking() {
        assert_eq!(ModelProfile::for_deep_thinking(true), ModelProfile::Reasoning);
        assert_eq!(ModelProfile::for_deep_thinking(false), ModelProfile::Basic);
    }

    #[test]
    fn test_parse_structured_reply_variants() {
        assert_eq!(
            parse_structured_reply("```json\n{\"next\": \"FINISH\",}\n```").unwrap(),
            json!({"next": "FINISH"})
        );
        assert_eq!(
            parse_structured_reply("Sure! {\"next\": \"reporter\"} Hope that helps.").unwrap(),
            json!({"next": "reporter"})
        );
        assert!(matches!(
            parse_structured_reply("I cannot decide."),
            Err(Error::MalformedOutput(_))
        ));
        assert!(matches!(
            parse_structured_reply("[1, 2]"),
            Err(Error::MalformedOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_default_invoke_structured_appends_schema() {
        let model = Arc::new(EchoModel {
            reply: "{\"next\": \"resume_agent\"}".to_string(),
            seen: Mutex::new(Vec::new()),
        });
        let schema = json!({"type": "object"});

        let value = model
            .invoke_structured(ModelProfile::Basic, &[Message::user("hi")], &schema)
            .await
            .unwrap();
        assert_eq!(value["next"], "resume_agent");

        let seen = model.seen.lock().unwrap();
        let last = seen[0].last().unwrap();
        assert!(last.is_system());
        assert!(last.content.contains("\"type\":\"object\""));
    }
}
