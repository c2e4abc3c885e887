//! Indexed documents and semantic search results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chunking::Chunk;

/// Namespace used when a document is indexed outside any workspace.
pub const DEFAULT_NAMESPACE: &str = "default";

/// A source document that has been chunked and embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub namespace: String,
    pub title: String,

    /// File path or URL the content came from
    pub source: Option<String>,

    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

impl Document {
    pub fn new(namespace: impl Into<String>, title: impl Into<String>, source: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            namespace: namespace.into(),
            title: title.into(),
            source,
            chunk_count: 0,
            created_at: Utc::now(),
        }
    }
}

/// A chunk paired with its embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Vec<f32>,
}

/// One semantic search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk_id: String,
    pub document_id: String,
    pub namespace: String,
    pub title: String,
    pub content: String,

    /// Cosine similarity in `[-1, 1]`, higher is closer
    pub score: f32,
}

/// Filter applied to a semantic search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilter {
    pub namespace: Option<String>,
    pub min_score: Option<f32>,
}

impl SearchFilter {
    pub fn namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            min_score: None,
        }
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn accepts(&self, namespace: &str, score: f32) -> bool {
        self.namespace.as_deref().is_none_or(|ns| ns == namespace)
            && self.min_score.is_none_or(|min| score >= min)
    }
}
