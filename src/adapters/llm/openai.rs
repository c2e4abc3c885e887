//! OpenAI chat completions adapter.
//!
//! Also serves any endpoint speaking the same `/chat/completions` dialect;
//! the Hugging Face adapter is a thin wrapper around it.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::http::{build_client, ensure_success, spawn_line_stream, sse_data, LineEvent};
use crate::domain::models::{ChatMessage, LlmRequestConfig, LlmResponse, ResponseFormat, TokenUsage};
use crate::domain::ports::{LlmError, LlmProvider, TokenStream};

/// Configuration for an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key (read from OPENAI_API_KEY if not set)
    pub api_key: Option<String>,
    /// Base URL including the version segment, e.g. `https://api.openai.com/v1`
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl OpenAiConfig {
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WireResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Provider for `/chat/completions` endpoints.
pub struct OpenAiProvider {
    name: &'static str,
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let api_key = config.get_api_key();
        Self::compatible("openai", OpenAiConfig { api_key, ..config })
    }

    /// Same wire format reported under a different provider name.
    ///
    /// The key is used as given; no environment lookup happens here.
    pub(crate) fn compatible(name: &'static str, config: OpenAiConfig) -> Result<Self, LlmError> {
        Ok(Self {
            name,
            client: build_client(name)?,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    fn build_request<'a>(
        messages: &'a [ChatMessage],
        config: &'a LlmRequestConfig,
        stream: bool,
    ) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &config.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream,
            response_format: match config.response_format {
                ResponseFormat::JsonObject => Some(WireResponseFormat { kind: "json_object" }),
                ResponseFormat::Text => None,
            },
        }
    }

    fn post(&self, body: &ChatCompletionRequest<'_>, timeout_secs: u64) -> RequestBuilder {
        let request = self
            .client
            .post(self.endpoint())
            .timeout(Duration::from_secs(timeout_secs))
            .json(body);
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    fn parse_stream_line(provider: &'static str, line: &str) -> LineEvent {
        let Some(data) = sse_data(line) else {
            return LineEvent::Skip;
        };
        if data == "[DONE]" {
            return LineEvent::Done;
        }
        if data.is_empty() {
            return LineEvent::Skip;
        }
        match serde_json::from_str::<ChatCompletionChunk>(data) {
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta.content)
                .filter(|c| !c.is_empty())
                .map_or(LineEvent::Skip, LineEvent::Token),
            Err(e) => LineEvent::Fail(LlmError::invalid_response(provider, format!("bad stream chunk: {e}"))),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn provider_name(&self) -> &'static str {
        self.name
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, LlmError> {
        let body = Self::build_request(messages, config, false);
        debug!(provider = self.name, model = %config.model, messages = messages.len(), "chat request");

        let response = self
            .post(&body, config.timeout_secs)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(self.name, &e, config.timeout_secs))?;
        let response = ensure_success(self.name, response).await?;

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::invalid_response(self.name, e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::invalid_response(self.name, "response has no choices"))?;

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            model: if parsed.model.is_empty() { config.model.clone() } else { parsed.model },
            provider: self.name.to_string(),
            usage: parsed.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            finish_reason: choice.finish_reason,
        })
    }

    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<TokenStream, LlmError> {
        let body = Self::build_request(messages, config, true);
        let response = self
            .post(&body, config.timeout_secs)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(self.name, &e, config.timeout_secs))?;
        let response = ensure_success(self.name, response).await?;

        let name = self.name;
        Ok(spawn_line_stream(name, response, move |line| Self::parse_stream_line(name, line)))
    }
}
