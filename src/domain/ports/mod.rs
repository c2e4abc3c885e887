//! Port trait definitions (Hexagonal Architecture)
//!
//! Async trait interfaces that adapters implement:
//! - LlmProvider: chat completion against one provider's wire format
//! - EmbeddingProvider: text to dense vectors
//! - ChunkStore: storage and similarity search over embedded chunks
//! - TodoRepository / TaskTaggingTools: business data read by agents

pub mod chunk_store;
pub mod embedding;
pub mod llm_provider;
pub mod tool_provider;

pub use chunk_store::ChunkStore;
pub use embedding::EmbeddingProvider;
pub use llm_provider::{LlmError, LlmProvider, TokenStream, STREAM_BUFFER};
pub use tool_provider::{TaskTaggingTools, TodoRepository};
