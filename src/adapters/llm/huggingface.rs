//! Hugging Face adapter.
//!
//! Targets the OpenAI-compatible chat route exposed by the HF router and by
//! self-hosted text-generation-inference servers.

use async_trait::async_trait;

use super::openai::{OpenAiConfig, OpenAiProvider};
use crate::domain::models::{ChatMessage, LlmRequestConfig, LlmResponse};
use crate::domain::ports::{LlmError, LlmProvider, TokenStream};

pub const DEFAULT_HF_BASE_URL: &str = "https://router.huggingface.co/v1";

/// Configuration for a Hugging Face endpoint.
#[derive(Debug, Clone)]
pub struct HuggingFaceConfig {
    /// Token (read from HF_TOKEN or HUGGINGFACE_API_KEY if not set)
    pub api_key: Option<String>,
    pub base_url: String,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_HF_BASE_URL.to_string(),
        }
    }
}

impl HuggingFaceConfig {
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("HF_TOKEN").ok())
            .or_else(|| std::env::var("HUGGINGFACE_API_KEY").ok())
    }

    /// Base URL with the `/v1` segment TGI servers expect.
    pub fn versioned_base_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/v1") {
            base.to_string()
        } else {
            format!("{base}/v1")
        }
    }
}

pub struct HuggingFaceProvider {
    inner: OpenAiProvider,
}

impl HuggingFaceProvider {
    pub fn new(config: HuggingFaceConfig) -> Result<Self, LlmError> {
        let inner_config = OpenAiConfig {
            api_key: config.get_api_key(),
            base_url: config.versioned_base_url(),
        };
        Ok(Self {
            inner: OpenAiProvider::compatible("huggingface", inner_config)?,
        })
    }
}

#[async_trait]
impl LlmProvider for HuggingFaceProvider {
    fn provider_name(&self) -> &'static str {
        "huggingface"
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, LlmError> {
        self.inner.chat(messages, config).await
    }

    async fn chat_stream(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<TokenStream, LlmError> {
        self.inner.chat_stream(messages, config).await
    }
}
