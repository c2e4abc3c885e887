//! Provider registry and factory.
//!
//! Providers are created on first use and cached per `(provider, base_url,
//! api_key)`; the key is baked into the client, so agents with different
//! credentials never share one.
//! The registry is built once at startup and handed to whoever needs a
//! client; there is no process-wide instance.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::anthropic::{AnthropicConfig, AnthropicProvider};
use super::huggingface::{HuggingFaceConfig, HuggingFaceProvider};
use super::mock::MockLlmProvider;
use super::ollama::{OllamaConfig, OllamaProvider};
use super::openai::{OpenAiConfig, OpenAiProvider};
use crate::domain::models::{AgentConfig, LlmConfig};
use crate::domain::ports::{LlmError, LlmProvider};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    provider: String,
    base_url: String,
    api_key: Option<String>,
}

/// Registry of LLM provider clients.
pub struct ProviderRegistry {
    defaults: LlmConfig,
    /// Instances registered up front; they win over anything created
    pinned: HashMap<String, Arc<dyn LlmProvider>>,
    cache: RwLock<HashMap<CacheKey, Arc<dyn LlmProvider>>>,
}

impl ProviderRegistry {
    pub fn new(defaults: LlmConfig) -> Self {
        Self {
            defaults,
            pinned: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Register a ready-made provider under `name`.
    pub fn with_provider(mut self, name: impl Into<String>, provider: Arc<dyn LlmProvider>) -> Self {
        self.pinned.insert(name.into(), provider);
        self
    }

    pub fn defaults(&self) -> &LlmConfig {
        &self.defaults
    }

    pub fn default_model(&self) -> &str {
        &self.defaults.model
    }

    /// Provider for an agent, falling back to the global defaults for any
    /// setting the agent leaves unset.
    pub async fn for_agent(&self, agent: &AgentConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
        self.get(
            agent.provider.as_deref(),
            agent.base_url.as_deref(),
            agent.api_key.as_deref(),
        )
        .await
    }

    /// Cached provider for `(provider, base_url, api_key)`, created on first use.
    ///
    /// Unset values resolve against the defaults before the lookup.
    pub async fn get(
        &self,
        provider: Option<&str>,
        base_url: Option<&str>,
        api_key: Option<&str>,
    ) -> Result<Arc<dyn LlmProvider>, LlmError> {
        let name = provider.unwrap_or(&self.defaults.provider).to_lowercase();
        if let Some(pinned) = self.pinned.get(&name) {
            return Ok(Arc::clone(pinned));
        }

        let base_url = base_url.or(self.defaults.base_url.as_deref()).map(str::to_string);
        let api_key = api_key.or(self.defaults.api_key.as_deref()).map(str::to_string);
        let key = CacheKey {
            provider: name.clone(),
            base_url: base_url.clone().unwrap_or_default(),
            api_key: api_key.clone(),
        };

        if let Some(existing) = self.cache.read().await.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let mut cache = self.cache.write().await;
        // Another caller may have filled the slot while we waited for the lock.
        if let Some(existing) = cache.get(&key) {
            return Ok(Arc::clone(existing));
        }

        let created = Self::create(&name, base_url, api_key)?;
        debug!(provider = %name, base_url = %key.base_url, keyed = key.api_key.is_some(), "created LLM provider");
        cache.insert(key, Arc::clone(&created));
        Ok(created)
    }

    /// Number of cached clients.
    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }

    fn create(
        name: &str,
        base_url: Option<String>,
        api_key: Option<String>,
    ) -> Result<Arc<dyn LlmProvider>, LlmError> {
        let provider: Arc<dyn LlmProvider> = match name {
            "openai" => {
                let mut config = OpenAiConfig {
                    api_key,
                    ..Default::default()
                };
                if let Some(url) = base_url {
                    config.base_url = url;
                }
                Arc::new(OpenAiProvider::new(config)?)
            }
            "huggingface" | "hf" => {
                let mut config = HuggingFaceConfig {
                    api_key,
                    ..Default::default()
                };
                if let Some(url) = base_url {
                    config.base_url = url;
                }
                Arc::new(HuggingFaceProvider::new(config)?)
            }
            "anthropic" => {
                let mut config = AnthropicConfig {
                    api_key,
                    ..Default::default()
                };
                if let Some(url) = base_url {
                    config.base_url = url;
                }
                Arc::new(AnthropicProvider::new(config)?)
            }
            "ollama" => {
                let mut config = OllamaConfig::default();
                if let Some(url) = base_url {
                    config.base_url = url;
                }
                Arc::new(OllamaProvider::new(config)?)
            }
            "mock" => Arc::new(MockLlmProvider::new()),
            other => {
                return Err(LlmError::configuration(other, format!("unknown LLM provider '{other}'")));
            }
        };
        Ok(provider)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(LlmConfig::default())
    }
}
