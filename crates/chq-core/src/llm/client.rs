//! LLM API HTTP Client
//!
//! Supports both Claude API and OpenAI-compatible APIs.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{LlmConfig, LlmProvider};
use crate::error::{Error, Result};

use super::model::{parse_structured_reply, schema_instruction, LanguageModel, ModelProfile};
use super::types::*;

/// LLM API client (supports Claude and OpenAI-compatible APIs)
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
    base_url: String,
}

impl LlmClient {
    /// Create a new LLM client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            base_url: config.effective_base_url().trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    /// Create with custom base URL (for testing or custom endpoints)
    pub fn with_base_url(config: &LlmConfig, base_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(config)?;
        client.base_url = base_url.into();
        Ok(client)
    }

    /// Get the provider type
    pub fn provider(&self) -> LlmProvider {
        self.config.provider
    }

    /// Build the request for a profile
    pub fn build_request(&self, profile: ModelProfile, messages: &[Message]) -> MessagesRequest {
        MessagesRequest::new(
            self.config.model_for(profile),
            self.config.max_tokens,
            messages,
        )
        .temperature(self.config.temperature_for(profile))
    }

    /// Send a request to the configured provider
    pub async fn messages(&self, request: MessagesRequest, json_mode: bool) -> Result<MessagesResponse> {
        match self.config.provider {
            LlmProvider::Claude => self.send_claude_request(request).await,
            LlmProvider::OpenAi => self.send_openai_request(request, json_mode).await,
        }
    }

    /// Send request to Claude API
    async fn send_claude_request(&self, request: MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/messages", self.base_url);

        debug!("Sending request to Claude API: {} (model {})", url, request.model);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("Claude API error: {} - {}", status, body);
            return Err(Error::LlmApi(format!("{}: {}", status, body)));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| Error::LlmApi(format!("Failed to parse response: {} - {}", e, body)))?;

        info!(
            "Claude API response: stop_reason={:?}, tokens={}",
            parsed.stop_reason,
            parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0)
        );

        Ok(parsed)
    }

    /// Send request to OpenAI-compatible API
    async fn send_openai_request(
        &self,
        request: MessagesRequest,
        json_mode: bool,
    ) -> Result<MessagesResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!("Sending request to OpenAI-compatible API: {} (model {})", url, request.model);

        let mut openai_request = ChatCompletionRequest::from_messages_request(&request);
        if json_mode {
            openai_request = openai_request.json_mode();
        }

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("content-type", "application/json")
            .json(&openai_request)
            .send()
            .await
            .map_err(Error::Http)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Http)?;

        if !status.is_success() {
            warn!("OpenAI API error: {} - {}", status, body);
            return Err(Error::LlmApi(format!("{}: {}", status, body)));
        }

        let openai_response: ChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| Error::LlmApi(format!("Failed to parse response: {} - {}", e, body)))?;

        let parsed = openai_response.to_messages_response();

        info!(
            "OpenAI API response: stop_reason={:?}, tokens={}",
            parsed.stop_reason,
            parsed.usage.as_ref().map(|u| u.output_tokens).unwrap_or(0)
        );

        Ok(parsed)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn invoke(&self, profile: ModelProfile, messages: &[Message]) -> Result<String> {
        let request = self.build_request(profile, messages);
        let response = self.messages(request, false).await?;
        Ok(response.text())
    }

    async fn invoke_structured(
        &self,
        profile: ModelProfile,
        messages: &[Message],
        schema: &Value,
    ) -> Result<Value> {
        let mut prompt = messages.to_vec();
        prompt.push(Message::system(schema_instruction(schema)));
        let request = self.build_request(profile, &prompt);
        let json_mode = self.config.provider == LlmProvider::OpenAi;
        let response = self.messages(request, json_mode).await?;
        parse_structured_reply(&response.text())
    }
}
