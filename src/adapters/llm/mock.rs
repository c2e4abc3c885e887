//! Scripted LLM provider for tests and offline runs.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::domain::models::{ChatMessage, LlmRequestConfig, LlmResponse, TokenUsage};
use crate::domain::ports::{LlmError, LlmProvider, TokenStream, STREAM_BUFFER};

/// One scripted reply.
#[derive(Debug, Clone)]
pub enum MockReply {
    Text(String),
    Fail(String),
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub messages: Vec<ChatMessage>,
    pub config: LlmRequestConfig,
}

/// Replies are consumed in order; once the script runs out every call gets
/// the default response.
pub struct MockLlmProvider {
    script: Arc<Mutex<VecDeque<MockReply>>>,
    default_response: String,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self::with_default_response("Mock response.")
    }

    pub fn with_default_response(response: impl Into<String>) -> Self {
        Self {
            script: Arc::new(Mutex::new(VecDeque::new())),
            default_response: response.into(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue replies up front.
    pub fn with_replies<I, S>(self, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let queued: VecDeque<MockReply> = replies.into_iter().map(|r| MockReply::Text(r.into())).collect();
        Self {
            script: Arc::new(Mutex::new(queued)),
            ..self
        }
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.script.lock().await.push_back(MockReply::Text(reply.into()));
    }

    pub async fn push_failure(&self, message: impl Into<String>) {
        self.script.lock().await.push_back(MockReply::Fail(message.into()));
    }

    pub async fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn next_reply(&self, messages: &[ChatMessage], config: &LlmRequestConfig) -> Result<String, LlmError> {
        self.calls.lock().await.push(MockCall {
            messages: messages.to_vec(),
            config: config.clone(),
        });

        match self.script.lock().await.pop_front() {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Fail(message)) => Err(LlmError::Connection {
                provider: "mock".to_string(),
                message,
            }),
            None => Ok(self.default_response.clone()),
        }
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Split into word-sized pieces that concatenate back to `text`.
fn word_pieces(text: &str) -> Vec<String> {
    text.split_inclusive(' ').map(str::to_string).collect()
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn provider_name(&self) -> &'static str {
        "mock"
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, LlmError> {
        let content = self.next_reply(messages, config).await?;
        let input_tokens = messages.iter().map(|m| m.content.split_whitespace().count() as u64).sum();
        let output_tokens = content.split_whitespace().count() as u64;

        Ok(LlmResponse {
            content,
            model: config.model.clone(),
            provider: "mock".to_string(),
            usage: Some(TokenUsage {
                input_tokens,
                output_tokens,
            }),
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<TokenStream, LlmError> {
        let content = self.next_reply(messages, config).await?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(async move {
            for piece in word_pieces(&content) {
                if tx.send(Ok(piece)).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_then_default() {
        let mock = MockLlmProvider::with_default_response("fallback").with_replies(["first"]);
        let config = LlmRequestConfig::default();
        let messages = vec![ChatMessage::user("hi")];

        assert_eq!(mock.chat(&messages, &config).await.unwrap().content, "first");
        assert_eq!(mock.chat(&messages, &config).await.unwrap().content, "fallback");
        assert_eq!(mock.call_count().await, 2);
    }

    #[tokio::test]
    async fn test_failure_is_connection_error() {
        let mock = MockLlmProvider::new();
        mock.push_failure("refused").await;
        mock.push_reply("recovered").await;
        let config = LlmRequestConfig::default();
        let err = mock.chat(&[ChatMessage::user("hi")], &config).await.unwrap_err();
        assert_eq!(err.provider(), "mock");
        assert_eq!(mock.chat(&[ChatMessage::user("hi")], &config).await.unwrap().content, "recovered");
    }

    #[tokio::test]
    async fn test_stream_reassembles() {
        let mock = MockLlmProvider::with_default_response("one two three");
        let mut rx = mock
            .chat_stream(&[ChatMessage::user("hi")], &LlmRequestConfig::default())
            .await
            .unwrap();
        let mut text = String::new();
        let mut pieces = 0;
        while let Some(chunk) = rx.recv().await {
            text.push_str(&chunk.unwrap());
            pieces += 1;
        }
        assert_eq!(text, "one two three");
        assert_eq!(pieces, 3);
    }
}
