//! RAG (Retrieval-Augmented Generation) service
//!
//! Coordinates loading, chunking, embedding, and storage for indexing, and
//! embedding plus similarity search for retrieval.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use super::document_loader;
use super::text_splitter::RecursiveTextSplitter;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ContextSnippet, Document, EmbeddedChunk, SearchFilter, SearchResult};
use crate::domain::ports::{ChunkStore, EmbeddingProvider};

/// Separator placed between snippets in prompt context.
const CONTEXT_SEPARATOR: &str = "\n\n";

/// RAG service for document indexing and semantic search
pub struct RagService {
    store: Arc<dyn ChunkStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    splitter: RecursiveTextSplitter,
    min_score: Option<f32>,
}

impl RagService {
    pub fn new(
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        splitter: RecursiveTextSplitter,
    ) -> Self {
        Self {
            store,
            embedder,
            splitter,
            min_score: None,
        }
    }

    /// Drop search hits scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = (min_score > 0.0).then_some(min_score);
        self
    }

    /// Chunk, embed, and store one document.
    ///
    /// # Arguments
    /// * `namespace` - Workspace the document belongs to
    /// * `title` - Display title, reported in search results
    /// * `content` - Full document text
    /// * `source` - File path or URL; re-indexing the same source replaces the
    ///   earlier document instead of duplicating it
    pub async fn index_document(
        &self,
        namespace: &str,
        title: &str,
        content: &str,
        source: Option<String>,
    ) -> DomainResult<Document> {
        let mut document = Document::new(namespace, title, source);
        if let Some(src) = &document.source {
            if let Some(existing) = self.store.find_by_source(namespace, src).await? {
                debug!(document_id = %existing, source = %src, "re-indexing existing document");
                document.id = existing;
            }
        }

        let chunks = self.splitter.create_chunks(content, &document.id);
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.embedder.max_batch_size().max(1)) {
            embeddings.extend(self.embedder.embed_batch(batch).await?);
        }
        if embeddings.len() != chunks.len() {
            return Err(DomainError::ExecutionFailed(format!(
                "embedding provider returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        let embedded: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect();

        document.chunk_count = embedded.len();
        self.store.upsert_document(&document, &embedded).await?;

        info!(
            document_id = %document.id,
            namespace = %namespace,
            chunks = document.chunk_count,
            "indexed document '{}'",
            document.title
        );
        Ok(document)
    }

    /// Load a file from disk and index it.
    pub async fn index_file(&self, namespace: &str, path: &Path) -> DomainResult<Document> {
        let loaded = document_loader::load_file(path).await?;
        self.index_document(namespace, &loaded.title, &loaded.content, Some(loaded.source))
            .await
    }

    /// Index every supported file below `dir`, in path order.
    pub async fn index_directory(&self, namespace: &str, dir: &Path) -> DomainResult<Vec<Document>> {
        let files = document_loader::collect_files(dir).await?;
        let mut documents = Vec::with_capacity(files.len());
        for file in files {
            documents.push(self.index_file(namespace, &file).await?);
        }
        Ok(documents)
    }

    /// Top `limit` chunks for `query`, best first.
    pub async fn search(
        &self,
        query: &str,
        namespace: Option<&str>,
        limit: usize,
    ) -> DomainResult<Vec<SearchResult>> {
        if query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        let filter = SearchFilter {
            namespace: namespace.map(str::to_string),
            min_score: self.min_score,
        };
        let results = self.store.search(&embedding, &filter, limit).await?;

        debug!(query = %query, results = results.len(), "semantic search");
        Ok(results)
    }

    /// Prompt context: one `[From: title]` block per result, full content.
    pub fn format_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| format!("[From: {}]\n{}", r.title, r.content))
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR)
    }

    /// Truncated snippets reported back to the caller.
    pub fn snippets(results: &[SearchResult]) -> Vec<ContextSnippet> {
        results
            .iter()
            .map(|r| ContextSnippet::new(&r.title, &r.content, r.score))
            .collect()
    }

    pub async fn list_documents(&self, namespace: Option<&str>) -> DomainResult<Vec<Document>> {
        self.store.list_documents(namespace).await
    }

    pub async fn get_document(&self, id: &str) -> DomainResult<Document> {
        self.store
            .get_document(id)
            .await?
            .ok_or_else(|| DomainError::DocumentNotFound(id.to_string()))
    }

    pub async fn delete_document(&self, id: &str) -> DomainResult<()> {
        if self.store.delete_document(id).await? {
            info!(document_id = %id, "deleted document");
            Ok(())
        } else {
            Err(DomainError::DocumentNotFound(id.to_string()))
        }
    }
}
