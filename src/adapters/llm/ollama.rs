//! Ollama `/api/chat` adapter. Streaming responses are NDJSON.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::http::{build_client, ensure_success, spawn_line_stream, LineEvent};
use crate::domain::models::{ChatMessage, LlmRequestConfig, LlmResponse, ResponseFormat, TokenUsage};
use crate::domain::ports::{LlmError, LlmProvider, TokenStream};

const PROVIDER: &str = "ollama";

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: Options,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    message: ResponseMessage,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

pub struct OllamaProvider {
    config: OllamaConfig,
    client: Client,
}

impl OllamaProvider {
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        Ok(Self {
            client: build_client(PROVIDER)?,
            config,
        })
    }

    fn build_request<'a>(
        messages: &'a [ChatMessage],
        config: &'a LlmRequestConfig,
        stream: bool,
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &config.model,
            messages: messages
                .iter()
                .map(|m| Message {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream,
            format: (config.response_format == ResponseFormat::JsonObject).then_some("json"),
            options: Options {
                temperature: config.temperature,
                num_predict: config.max_tokens,
            },
        }
    }

    fn post(&self, body: &ChatRequest<'_>, timeout_secs: u64) -> RequestBuilder {
        self.client
            .post(format!("{}/api/chat", self.config.base_url.trim_end_matches('/')))
            .timeout(Duration::from_secs(timeout_secs))
            .json(body)
    }

    fn parse_stream_line(line: &str) -> LineEvent {
        if line.trim().is_empty() {
            return LineEvent::Skip;
        }
        match serde_json::from_str::<ChatResponse>(line) {
            Ok(ChatResponse { error: Some(error), .. }) => {
                LineEvent::Fail(LlmError::invalid_response(PROVIDER, error))
            }
            Ok(chunk) if !chunk.message.content.is_empty() => LineEvent::Token(chunk.message.content),
            Ok(chunk) if chunk.done => LineEvent::Done,
            Ok(_) => LineEvent::Skip,
            Err(e) => LineEvent::Fail(LlmError::invalid_response(PROVIDER, format!("bad stream line: {e}"))),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
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
            .post(&body, config.timeout_secs)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(PROVIDER, &e, config.timeout_secs))?;
        let response = ensure_success(PROVIDER, response).await?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::invalid_response(PROVIDER, e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(LlmError::invalid_response(PROVIDER, error));
        }

        let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
            (None, None) => None,
            (input, output) => Some(TokenUsage {
                input_tokens: input.unwrap_or(0),
                output_tokens: output.unwrap_or(0),
            }),
        };

        Ok(LlmResponse {
            content: parsed.message.content,
            model: if parsed.model.is_empty() { config.model.clone() } else { parsed.model },
            provider: PROVIDER.to_string(),
            usage,
            finish_reason: parsed.done_reason,
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
            .map_err(|e| LlmError::from_reqwest(PROVIDER, &e, config.timeout_secs))?;
        let response = ensure_success(PROVIDER, response).await?;

        Ok(spawn_line_stream(PROVIDER, response, Self::parse_stream_line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_format_and_options() {
        let messages = vec![ChatMessage::user("hi")];
        let config = LlmRequestConfig {
            model: "llama3.1".to_string(),
            max_tokens: 256,
            response_format: ResponseFormat::JsonObject,
            ..Default::default()
        };
        let body = serde_json::to_value(OllamaProvider::build_request(&messages, &config, false)).unwrap();
        assert_eq!(body["format"], "json");
        assert_eq!(body["options"]["num_predict"], 256);
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_parse_ndjson_lines() {
        let token = r#"{"model":"llama3.1","message":{"role":"assistant","content":"Hel"},"done":false}"#;
        assert!(matches!(OllamaProvider::parse_stream_line(token), LineEvent::Token(ref t) if t == "Hel"));
        let done = r#"{"model":"llama3.1","message":{"role":"assistant","content":""},"done":true}"#;
        assert!(matches!(OllamaProvider::parse_stream_line(done), LineEvent::Done));
        assert!(matches!(
            OllamaProvider::parse_stream_line(r#"{"error":"model not found"}"#),
            LineEvent::Fail(_)
        ));
    }
}
