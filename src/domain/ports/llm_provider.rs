//! LLM provider port.
//!
//! Every backend (HF-compatible endpoint, OpenAI, Anthropic, Ollama) maps
//! provider-neutral [`ChatMessage`]s onto its own wire JSON and returns a
//! uniform [`LlmResponse`]. There are no retries on this path: a failed call
//! surfaces as a single [`LlmError`].

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::models::{ChatMessage, LlmRequestConfig, LlmResponse};

/// Capacity of the channel behind a [`TokenStream`].
pub const STREAM_BUFFER: usize = 64;

/// Incremental text chunks, in generation order.
pub type TokenStream = mpsc::Receiver<Result<String, LlmError>>;

/// Provider or network failure, always tagged with the provider name.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("{provider}: connection failed: {message}")]
    Connection { provider: String, message: String },

    #[error("{provider}: request timed out after {timeout_secs}s")]
    Timeout { provider: String, timeout_secs: u64 },

    #[error("{provider}: API error (HTTP {status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider}: invalid response: {message}")]
    InvalidResponse { provider: String, message: String },

    #[error("{provider}: configuration error: {message}")]
    Configuration { provider: String, message: String },
}

impl LlmError {
    pub fn provider(&self) -> &str {
        match self {
            Self::Connection { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Api { provider, .. }
            | Self::InvalidResponse { provider, .. }
            | Self::Configuration { provider, .. } => provider,
        }
    }

    /// HTTP status, when the provider answered with one.
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn invalid_response(provider: &str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    pub fn configuration(provider: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            provider: provider.to_string(),
            message: message.into(),
        }
    }

    /// Classify a transport error from `reqwest`.
    pub fn from_reqwest(provider: &str, err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                provider: provider.to_string(),
                timeout_secs,
            }
        } else if let Some(status) = err.status() {
            Self::Api {
                provider: provider.to_string(),
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else if err.is_decode() {
            Self::invalid_response(provider, err.to_string())
        } else {
            Self::Connection {
                provider: provider.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier (e.g. "openai", "ollama").
    fn provider_name(&self) -> &'static str;

    /// Single-shot completion.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, LlmError>;

    /// Streaming completion.
    ///
    /// The default delivers the whole [`chat`](Self::chat) reply as one chunk.
    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<TokenStream, LlmError> {
        let response = self.chat(messages, config).await?;
        let (tx, rx) = mpsc::channel(1);
        // Capacity 1 with a single send cannot fail while `rx` is alive.
        let _ = tx.send(Ok(response.content)).await;
        Ok(rx)
    }
}
