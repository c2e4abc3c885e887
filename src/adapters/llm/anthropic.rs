//! Anthropic Messages API adapter.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::http::{build_client, ensure_success, spawn_line_stream, sse_data, LineEvent};
use crate::domain::models::{ChatMessage, LlmRequestConfig, LlmResponse, Role, TokenUsage};
use crate::domain::ports::{LlmError, LlmProvider, TokenStream};

const PROVIDER: &str = "anthropic";

/// Configuration for the Anthropic API.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    /// API key (will be read from ANTHROPIC_API_KEY env if not set).
    pub api_key: Option<String>,
    /// API base URL.
    pub base_url: String,
    /// API version header.
    pub api_version: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.anthropic.com".to_string(),
            api_version: "2023-06-01".to_string(),
        }
    }
}

impl AnthropicConfig {
    /// Get API key from config or environment.
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
    }
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

/// Request to the Messages API.
#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

/// Streaming event from the API. Only text deltas, the stop marker and
/// errors matter here.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StreamEvent {
    ContentBlockDelta { delta: DeltaBlock },
    MessageStop,
    Error { error: ApiError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct DeltaBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_client(PROVIDER)?,
            config,
        })
    }

    /// System messages are lifted into the top-level `system` field.
    fn build_request<'a>(
        messages: &'a [ChatMessage],
        config: &'a LlmRequestConfig,
        stream: bool,
    ) -> MessagesRequest<'a> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        MessagesRequest {
            model: &config.model,
            max_tokens: config.max_tokens,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| Message {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: config.temperature,
            stream,
        }
    }

    fn post(&self, body: &MessagesRequest<'_>, timeout_secs: u64) -> Result<RequestBuilder, LlmError> {
        let api_key = self
            .config
            .get_api_key()
            .ok_or_else(|| LlmError::configuration(PROVIDER, "ANTHROPIC_API_KEY not set"))?;

        Ok(self
            .client
            .post(format!("{}/v1/messages", self.config.base_url.trim_end_matches('/')))
            .timeout(Duration::from_secs(timeout_secs))
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.config.api_version)
            .json(body))
    }

    fn parse_stream_line(line: &str) -> LineEvent {
        let Some(data) = sse_data(line) else {
            return LineEvent::Skip;
        };
        match serde_json::from_str::<StreamEvent>(data) {
            Ok(StreamEvent::ContentBlockDelta { delta }) if !delta.text.is_empty() => LineEvent::Token(delta.text),
            Ok(StreamEvent::MessageStop) => LineEvent::Done,
            Ok(StreamEvent::Error { error }) => LineEvent::Fail(LlmError::invalid_response(
                PROVIDER,
                format!("{}: {}", error.error_type, error.message),
            )),
            Ok(_) => LineEvent::Skip,
            Err(e) => LineEvent::Fail(LlmError::invalid_response(PROVIDER, format!("bad stream event: {e}"))),
        }
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, LlmError> {
        let body = Self::build_request(messages, config, false);
        debug!(provider = PROVIDER, model = %config.model, messages = messages.len(), "chat request");

        let response = self
            .post(&body, config.timeout_secs)?
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(PROVIDER, &e, config.timeout_secs))?;
        let response = ensure_success(PROVIDER, response).await?;

        let result: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::invalid_response(PROVIDER, e.to_string()))?;

        let text = result
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(LlmResponse {
            content: text,
            model: result.model,
            provider: PROVIDER.to_string(),
            usage: result.usage.map(|u| TokenUsage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
            finish_reason: result.stop_reason,
        })
    }

    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<TokenStream, LlmError> {
        let body = Self::build_request(messages, config, true);
        let response = self
            .post(&body, config.timeout_secs)?
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(PROVIDER, &e, config.timeout_secs))?;
        let response = ensure_success(PROVIDER, response).await?;

        Ok(spawn_line_stream(PROVIDER, response, Self::parse_stream_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_messages_lifted() {
        let messages = vec![
            ChatMessage::system("rule one"),
            ChatMessage::system("rule two"),
            ChatMessage::user("hello"),
        ];
        let config = LlmRequestConfig {
            model: "claude-sonnet".to_string(),
            ..Default::default()
        };
        let body = serde_json::to_value(AnthropicProvider::build_request(&messages, &config, false)).unwrap();
        assert_eq!(body["system"], "rule one\n\nrule two");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 10_000);
    }

    #[test]
    fn test_parse_stream_events() {
        let delta = r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hi"}}"#;
        assert!(matches!(AnthropicProvider::parse_stream_line(delta), LineEvent::Token(ref t) if t == "Hi"));
        assert!(matches!(
            AnthropicProvider::parse_stream_line(r#"data: {"type":"message_stop"}"#),
            LineEvent::Done
        ));
        assert!(matches!(
            AnthropicProvider::parse_stream_line(r#"data: {"type":"ping"}"#),
            LineEvent::Skip
        ));
        assert!(matches!(AnthropicProvider::parse_stream_line("event: ping"), LineEvent::Skip));
        let err = r#"data: {"type":"error","error":{"type":"overloaded_error","message":"busy"}}"#;
        assert!(matches!(AnthropicProvider::parse_stream_line(err), LineEvent::Fail(_)));
    }
}
