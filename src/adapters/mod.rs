//! Adapters implementing the domain ports.

pub mod embeddings;
pub mod llm;
pub mod sqlite;
