//! Text-to-vector port used by the RAG index.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;

/// Turns text into fixed-length vectors for cosine similarity search.
///
/// Documents and queries must be embedded by the same provider for scores
/// to be comparable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Short identifier such as `"openai"`, `"ollama"` or `"hashing"`.
    fn name(&self) -> &'static str;

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> DomainResult<Vec<f32>>;

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> DomainResult<Vec<Vec<f32>>>;

    /// Largest `texts` slice callers should hand to [`embed_batch`](Self::embed_batch).
    fn max_batch_size(&self) -> usize {
        64
    }
}
