//! Storage port for embedded document chunks.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Document, EmbeddedChunk, SearchFilter, SearchResult};

#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert or replace a document together with all of its chunks.
    ///
    /// Chunks previously stored for the same document id are removed.
    async fn upsert_document(&self, document: &Document, chunks: &[EmbeddedChunk]) -> DomainResult<()>;

    /// Nearest chunks to `embedding` by cosine similarity, best first.
    async fn search(
        &self,
        embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> DomainResult<Vec<SearchResult>>;

    async fn get_document(&self, id: &str) -> DomainResult<Option<Document>>;

    /// Id of a document previously indexed from `source` in `namespace`.
    async fn find_by_source(&self, namespace: &str, source: &str) -> DomainResult<Option<String>>;

    /// Documents, newest first, optionally restricted to one namespace.
    async fn list_documents(&self, namespace: Option<&str>) -> DomainResult<Vec<Document>>;

    /// Delete a document and its chunks; `false` when it did not exist.
    async fn delete_document(&self, id: &str) -> DomainResult<bool>;

    async fn count_chunks(&self) -> DomainResult<usize>;
}
