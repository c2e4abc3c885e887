//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use aide::adapters::embeddings::HashingEmbeddingProvider;
use aide::adapters::llm::{MockLlmProvider, ProviderRegistry};
use aide::adapters::sqlite::{create_migrated_test_pool, SqliteChunkStore, SqliteTodoRepository};
use aide::domain::models::{ChunkingConfig, LlmConfig};
use aide::services::text_splitter::RecursiveTextSplitter;
use aide::services::{AgentFactory, RagService};
use sqlx::SqlitePool;

pub async fn setup_test_db() -> SqlitePool {
    create_migrated_test_pool()
        .await
        .expect("failed to create migrated test pool")
}

/// RAG service over an in-memory store with the offline hashing embedder.
pub fn rag_service(pool: &SqlitePool, chunk_size: usize, chunk_overlap: usize) -> Arc<RagService> {
    let splitter = RecursiveTextSplitter::new(ChunkingConfig::new(chunk_size, chunk_overlap))
        .expect("valid chunking config");
    Arc::new(RagService::new(
        Arc::new(SqliteChunkStore::new(pool.clone())),
        Arc::new(HashingEmbeddingProvider::new(256)),
        splitter,
    ))
}

/// Registry whose every provider name resolves to `mock`.
pub fn mock_registry(mock: Arc<MockLlmProvider>) -> Arc<ProviderRegistry> {
    let registry = ProviderRegistry::new(LlmConfig {
        provider: "mock".to_string(),
        model: "test-model".to_string(),
        ..Default::default()
    })
    .with_provider("mock", mock);
    Arc::new(registry)
}

/// Factory with built-in agents, `rag` and a todo repository on `pool`.
/// The agents directory does not exist, so every agent comes from the
/// built-in set.
pub fn full_factory(pool: &SqlitePool, rag: Arc<RagService>, mock: Arc<MockLlmProvider>) -> AgentFactory {
    let todos = Arc::new(SqliteTodoRepository::new(pool.clone()));
    AgentFactory::new("/nonexistent/aide/agents", mock_registry(mock))
        .with_rag(rag)
        .with_todos(Arc::clone(&todos) as _)
        .with_tagging_tools(todos as _)
}
