//! Anthropic Messages API client implementation

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use lr_core::{
    ChatProvider, ChatRequest, ChatResponse, ContentBlock, Error, Message, Result, StopReason,
    ToolDefinition,
};

use crate::config::AnthropicConfig;

pub(crate) const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Anthropic Messages API client
pub struct AnthropicClient {
    config: AnthropicConfig,
    client: Client,
    current_model: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToolChoice {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<StopReason>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

/// Human readable message from an API error body, or the raw body
pub(crate) fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.to_string())
}

pub(crate) fn parse_response(body: &str) -> Result<ChatResponse> {
    let parsed: MessagesResponse =
        serde_json::from_str(body).map_err(|e| Error::Serialization(e.to_string()))?;

    if let Some(usage) = parsed.usage {
        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "Anthropic token usage"
        );
    }

    Ok(ChatResponse {
        content: parsed.content,
        stop_reason: parsed.stop_reason,
    })
}

impl AnthropicClient {
    /// Model constants
    pub const CLAUDE_SONNET_4: &'static str = "claude-sonnet-4-20250514";
    pub const CLAUDE_3_5_HAIKU: &'static str = "claude-3-5-haiku-20241022";

    /// Create a new Anthropic client from configuration
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            current_model: config.model.clone(),
            config,
            client,
        })
    }

    /// Create a new Anthropic client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = AnthropicConfig::from_env()?;
        Self::new(config)
    }

    /// Set the model to use for generation
    pub fn with_model(mut self, model_id: impl Into<String>) -> Self {
        self.current_model = model_id.into();
        self
    }

    pub(crate) fn build_request<'a>(&'a self, request: &'a ChatRequest) -> MessagesRequest<'a> {
        let has_tools = !request.tools.is_empty();
        MessagesRequest {
            model: &self.current_model,
            max_tokens: self.config.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: &request.messages,
            tools: has_tools.then_some(request.tools.as_slice()),
            tool_choice: has_tools.then_some(ToolChoice { kind: "auto" }),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'))
    }

    /// Perform the actual Messages API request
    async fn perform_request(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(e.to_string())
                } else {
                    Error::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            let message = api_error_message(&response_text);
            warn!(%status, "Anthropic request failed");
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication(format!(
                    "Anthropic rejected the API key ({}): {}",
                    status, message
                )),
                _ => Error::LlmProvider(format!(
                    "Anthropic API request failed with status {}: {}",
                    status, message
                )),
            });
        }

        parse_response(&response_text)
    }
}

#[async_trait]
impl ChatProvider for AnthropicClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(
            model = %self.current_model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "Sending Anthropic request"
        );

        match timeout(REQUEST_TIMEOUT, self.perform_request(request)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout("Request timed out".to_string())),
        }
    }

    fn model_id(&self) -> &str {
        &self.current_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_model_overrides_config() {
        let client = AnthropicClient::new(AnthropicConfig::new("sk-test"))
            .unwrap()
            .with_model(AnthropicClient::CLAUDE_3_5_HAIKU);
        assert_eq!(client.model_id(), "claude-3-5-haiku-20241022");
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let mut config = AnthropicConfig::new("sk-test");
        config.base_url = "http://localhost:8080/".to_string();
        let client = AnthropicClient::new(config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#;
        assert_eq!(api_error_message(body), "Overloaded");
        assert_eq!(api_error_message("<html>bad gateway</html>"), "<html>bad gateway</html>");
    }
}
