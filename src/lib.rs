//! Aide - personal productivity assistant
//!
//! Free-text queries are classified into an intent, routed to a specialized
//! LLM-backed agent (task planning, code help, document search, meeting
//! notes, todo queries), and answered, optionally with context retrieved
//! from locally indexed documents.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, port traits and errors
//! - **Adapters** (`adapters`): LLM providers, embedding providers, SQLite
//! - **Service Layer** (`services`): classifier, router, agents, splitter, RAG
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use aide::cli::service::AppServices;
//! use aide::infrastructure::config::ConfigLoader;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let services = AppServices::connect(ConfigLoader::load()?).await?;
//!     let router = services.router().await?;
//!     let answer = router.route("What's on my plate today?", vec![], Default::default(), None).await;
//!     println!("{}", answer.message);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    AgentConfig, ClassificationResult, Config, QueryIntent, RoutedResponse, WorkflowState,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AgentFactory, AgentRouter, QueryClassifier, RagService};
