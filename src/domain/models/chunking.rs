//! Text chunking domain models
//!
//! Models for splitting documents into overlapping, size-bounded chunks for
//! embedding and retrieval. Sizes are measured in characters.

use serde::{Deserialize, Serialize};

/// Separators tried in priority order; `""` means character-level splitting.
pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Configuration for document chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Maximum size of each chunk in characters
    pub chunk_size: usize,

    /// Maximum overlap between consecutive chunks in characters
    pub chunk_overlap: usize,

    /// Separators in priority order (coarsest first)
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

fn default_separators() -> Vec<String> {
    DEFAULT_SEPARATORS.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ChunkingConfig {
    /// 1000 characters per chunk with 200 characters of overlap.
    fn default() -> Self {
        Self::new(1000, 200)
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            separators: default_separators(),
        }
    }

    pub fn with_separators<I, S>(mut self, separators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.separators = separators.into_iter().map(Into::into).collect();
        self
    }

    /// Validate the chunking configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err("chunk_overlap must be less than chunk_size".to_string());
        }

        Ok(())
    }
}

/// A chunk of text extracted from a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{document_id}:chunk:{index}`
    pub id: String,

    pub document_id: String,
    pub content: String,

    /// 0-based position within the document
    pub chunk_index: usize,

    /// Byte offset of the chunk start in the source text
    pub start_offset: usize,

    /// Byte offset one past the chunk end in the source text
    pub end_offset: usize,
}

impl Chunk {
    pub fn new(document_id: &str, content: String, chunk_index: usize, start_offset: usize, end_offset: usize) -> Self {
        Self {
            id: format!("{document_id}:chunk:{chunk_index}"),
            document_id: document_id.to_string(),
            content,
            chunk_index,
            start_offset,
            end_offset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChunkingConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 200);
        assert_eq!(config.separators, vec!["\n\n", "\n", ". ", " ", ""]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_overlap_at_or_above_size() {
        assert!(ChunkingConfig::new(100, 100).validate().is_err());
        assert!(ChunkingConfig::new(100, 150).validate().is_err());
        assert!(ChunkingConfig::new(0, 0).validate().is_err());
        assert!(ChunkingConfig::new(100, 0).validate().is_ok());
    }

    #[test]
    fn test_chunk_id_format() {
        let chunk = Chunk::new("doc-1", "hello".to_string(), 2, 10, 15);
        assert_eq!(chunk.id, "doc-1:chunk:2");
        assert_eq!(chunk.document_id, "doc-1");
    }
}
