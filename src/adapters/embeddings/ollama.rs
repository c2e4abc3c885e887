//! Ollama embedding provider (`POST /api/embed`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::EmbeddingProvider;

#[derive(Debug, Clone)]
pub struct OllamaEmbeddingConfig {
    pub base_url: String,
    /// e.g. `nomic-embed-text`
    pub model: String,
    pub dimension: usize,
    pub timeout_secs: u64,
}

impl Default for OllamaEmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimension: 768,
            timeout_secs: 60,
        }
    }
}

impl OllamaEmbeddingConfig {
    /// Overlay the `rag.embedding` settings on the defaults.
    pub fn from_settings(settings: &EmbeddingConfig) -> Self {
        let defaults = Self::default();
        Self {
            base_url: settings.base_url.clone().unwrap_or(defaults.base_url),
            model: settings.model.clone().unwrap_or(defaults.model),
            dimension: settings.dimension,
            ..defaults
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

pub struct OllamaEmbeddingProvider {
    config: OllamaEmbeddingConfig,
    client: reqwest::Client,
}

impl OllamaEmbeddingProvider {
    const MAX_BATCH: usize = 64;

    pub fn new(config: OllamaEmbeddingConfig) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::ExecutionFailed(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    async fn call_embed(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let url = format!("{}/api/embed", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &self.config.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| {
                DomainError::ExecutionFailed(format!(
                    "Ollama connection error (is Ollama running at {}?): {e}",
                    self.config.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DomainError::ExecutionFailed(format!("Ollama API error {status}: {body}")));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| DomainError::SerializationError(format!("Invalid Ollama embed response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(DomainError::ExecutionFailed(format!(
                "Ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        Ok(parsed.embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>> {
        self.call_embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::ExecutionFailed("Empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(Self::MAX_BATCH) {
            vectors.extend(self.call_embed(batch).await?);
        }
        Ok(vectors)
    }

    fn max_batch_size(&self) -> usize {
        Self::MAX_BATCH
    }
}
