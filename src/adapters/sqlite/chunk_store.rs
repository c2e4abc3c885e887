//! SQLite chunk store with brute-force cosine search.
//!
//! Embeddings are stored as little-endian `f32` BLOBs. Search loads the
//! candidate rows for the namespace and ranks them in Rust, which is fine for
//! personal-scale corpora.

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::cmp::Ordering;

use super::parse_datetime;
use crate::adapters::embeddings::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Document, EmbeddedChunk, SearchFilter, SearchResult};
use crate::domain::ports::ChunkStore;

#[derive(Clone)]
pub struct SqliteChunkStore {
    pool: SqlitePool,
}

impl SqliteChunkStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChunkStore for SqliteChunkStore {
    async fn upsert_document(&self, document: &Document, chunks: &[EmbeddedChunk]) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(&document.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"INSERT INTO documents (id, namespace, title, source, chunk_count, created_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET namespace = excluded.namespace, title = excluded.title,
                   source = excluded.source, chunk_count = excluded.chunk_count"#,
        )
        .bind(&document.id)
        .bind(&document.namespace)
        .bind(&document.title)
        .bind(&document.source)
        .bind(chunks.len() as i64)
        .bind(document.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        for embedded in chunks {
            let chunk = &embedded.chunk;
            if chunk.document_id != document.id {
                return Err(DomainError::ValidationFailed(format!(
                    "chunk {} belongs to document {}, not {}",
                    chunk.id, chunk.document_id, document.id
                )));
            }
            sqlx::query(
                r#"INSERT INTO chunks (id, document_id, chunk_index, content, start_offset, end_offset, embedding)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(&chunk.id)
            .bind(&chunk.document_id)
            .bind(chunk.chunk_index as i64)
            .bind(&chunk.content)
            .bind(chunk.start_offset as i64)
            .bind(chunk.end_offset as i64)
            .bind(vec_to_blob(&embedded.embedding))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(
        &self,
        embedding: &[f32],
        filter: &SearchFilter,
        limit: usize,
    ) -> DomainResult<Vec<SearchResult>> {
        if limit == 0 || embedding.is_empty() {
            return Ok(Vec::new());
        }

        let base = "SELECT c.id, c.document_id, d.namespace, d.title, c.content, c.embedding \
                    FROM chunks c JOIN documents d ON d.id = c.document_id";
        let rows: Vec<ChunkRow> = match &filter.namespace {
            Some(namespace) => {
                sqlx::query_as(&format!("{base} WHERE d.namespace = ?"))
                    .bind(namespace)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => sqlx::query_as(base).fetch_all(&self.pool).await?,
        };

        let mut results: Vec<SearchResult> = rows
            .into_iter()
            .filter_map(|row| {
                let score = cosine_similarity(embedding, &blob_to_vec(&row.embedding));
                filter.accepts(&row.namespace, score).then(|| SearchResult {
                    chunk_id: row.id,
                    document_id: row.document_id,
                    namespace: row.namespace,
                    title: row.title,
                    content: row.content,
                    score,
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }

    async fn get_document(&self, id: &str) -> DomainResult<Option<Document>> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, namespace, title, source, chunk_count, created_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn find_by_source(&self, namespace: &str, source: &str) -> DomainResult<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT id FROM documents WHERE namespace = ? AND source = ? LIMIT 1")
                .bind(namespace)
                .bind(source)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(id,)| id))
    }

    async fn list_documents(&self, namespace: Option<&str>) -> DomainResult<Vec<Document>> {
        let base = "SELECT id, namespace, title, source, chunk_count, created_at FROM documents";
        let rows: Vec<DocumentRow> = match namespace {
            Some(ns) => {
                sqlx::query_as(&format!("{base} WHERE namespace = ? ORDER BY created_at DESC"))
                    .bind(ns)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_as(&format!("{base} ORDER BY created_at DESC"))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn delete_document(&self, id: &str) -> DomainResult<bool> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_chunks(&self) -> DomainResult<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[derive(sqlx::FromRow)]
struct ChunkRow {
    id: String,
    document_id: String,
    namespace: String,
    title: String,
    content: String,
    embedding: Vec<u8>,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    namespace: String,
    title: String,
    source: Option<String>,
    chunk_count: i64,
    created_at: String,
}

impl TryFrom<DocumentRow> for Document {
    type Error = DomainError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Document {
            id: row.id,
            namespace: row.namespace,
            title: row.title,
            source: row.source,
            chunk_count: usize::try_from(row.chunk_count).unwrap_or(0),
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}
