//! `POST {base_url}/embeddings` for OpenAI and compatible servers (vLLM, LM Studio, Azure).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::EmbeddingProvider;

#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingConfig {
    /// `None` falls back to `OPENAI_API_KEY`; local servers usually need no key.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
    /// Inputs per request.
    pub max_batch_size: usize,
}

impl Default for OpenAiEmbeddingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            timeout_secs: 30,
            max_batch_size: 512,
        }
    }
}

impl OpenAiEmbeddingConfig {
    /// Overlay the `rag.embedding` settings on the defaults.
    pub fn from_settings(settings: &EmbeddingConfig) -> Self {
        let defaults = Self::default();
        Self {
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.clone().unwrap_or(defaults.base_url),
            model: settings.model.clone().unwrap_or(defaults.model),
            dimension: settings.dimension,
            ..defaults
        }
    }
}

#[derive(Serialize)]
struct Request<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct Response {
    data: Vec<Item>,
}

#[derive(Deserialize)]
struct Item {
    index: usize,
    embedding: Vec<f32>,
}

pub struct OpenAiEmbeddingProvider {
    endpoint: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
    batch: usize,
    client: reqwest::Client,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiEmbeddingConfig) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::ExecutionFailed(format!("cannot build HTTP client: {e}")))?;
        Ok(Self {
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok()),
            model: config.model,
            dimension: config.dimension,
            batch: config.max_batch_size.max(1),
            client,
        })
    }

    async fn request(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        debug!(inputs = texts.len(), model = %self.model, "requesting embeddings");
        let mut request = self.client.post(&self.endpoint).json(&Request {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DomainError::ExecutionFailed(format!("embedding request to {} failed: {e}", self.endpoint)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::ExecutionFailed(format!("embedding API returned {status}: {body}")));
        }

        let Response { mut data } = response
            .json()
            .await
            .map_err(|e| DomainError::SerializationError(format!("unexpected embedding response: {e}")))?;
        if data.len() != texts.len() {
            return Err(DomainError::ExecutionFailed(format!(
                "embedding API returned {} vectors for {} inputs",
                data.len(),
                texts.len()
            )));
        }

        // Items carry their input position and may arrive out of order.
        data.sort_unstable_by_key(|item| item.index);
        Ok(data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        self.request(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| DomainError::ExecutionFailed("embedding API returned no vector".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch) {
            vectors.extend(self.request(batch).await?);
        }
        Ok(vectors)
    }

    fn max_batch_size(&self) -> usize {
        self.batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_settings_keeps_defaults_for_unset_fields() {
        let config = OpenAiEmbeddingConfig::from_settings(&EmbeddingConfig {
            provider: "openai".to_string(),
            model: None,
            base_url: Some("http://localhost:1234/v1".to_string()),
            api_key: None,
            dimension: 768,
        });
        assert_eq!(config.model, "text-embedding-3-small");
        assert_eq!(config.base_url, "http://localhost:1234/v1");
        assert_eq!(config.dimension, 768);
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let provider = OpenAiEmbeddingProvider::new(OpenAiEmbeddingConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert!(provider.embed_batch(&[]).await.unwrap().is_empty());
    }
}
