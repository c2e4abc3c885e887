//! Wiring from a loaded [`Config`] to the services commands use.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::adapters::embeddings::create_embedding_provider;
use crate::adapters::llm::ProviderRegistry;
use crate::adapters::sqlite::{initialize_database, PoolConfig, SqliteChunkStore, SqliteTodoRepository};
use crate::domain::models::Config;
use crate::services::{AgentFactory, AgentRouter, RagService, RecursiveTextSplitter};

/// Everything a command needs, built once per invocation.
pub struct AppServices {
    pub config: Config,
    pub rag: Arc<RagService>,
    pub todos: Arc<SqliteTodoRepository>,
    pub factory: Arc<AgentFactory>,
}

impl AppServices {
    /// Open (and migrate) the database and build the service graph.
    pub async fn connect(config: Config) -> Result<Self> {
        let pool = initialize_database(&config.database.url(), Some(PoolConfig::from(&config.database)))
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;

        let registry = Arc::new(ProviderRegistry::new(config.llm.clone()));
        let rag = Arc::new(Self::rag_service(&config, pool.clone())?);
        let todos = Arc::new(SqliteTodoRepository::new(pool));

        let factory = Arc::new(
            AgentFactory::new(&config.agents_dir, registry)
                .with_rag(Arc::clone(&rag))
                .with_todos(Arc::clone(&todos) as _)
                .with_tagging_tools(Arc::clone(&todos) as _)
                .with_rag_top_k(config.rag.top_k),
        );

        Ok(Self {
            config,
            rag,
            todos,
            factory,
        })
    }

    fn rag_service(config: &Config, pool: SqlitePool) -> Result<RagService> {
        let embedder = create_embedding_provider(&config.rag.embedding).context("Failed to create embedding provider")?;
        let splitter = RecursiveTextSplitter::new(config.rag.chunking()).context("Invalid chunking configuration")?;
        Ok(RagService::new(Arc::new(SqliteChunkStore::new(pool)), embedder, splitter).with_min_score(config.rag.min_score))
    }

    pub async fn router(&self) -> Result<AgentRouter> {
        self.factory
            .build_router(&self.config.router)
            .await
            .context("Failed to build agent router")
    }
}
