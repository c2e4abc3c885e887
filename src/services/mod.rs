//! Application services: classification, routing, agents, retrieval and workspaces.

pub mod agent_factory;
pub mod agents;
pub mod classifier;
pub mod document_loader;
pub mod json_extract;
pub mod rag_service;
pub mod router;
pub mod text_splitter;
pub mod workspace;

pub use agent_factory::{builtin_config, builtin_configs, AgentFactory, BUILTIN_AGENTS};
pub use agents::{Agent, AgentCore, AgentError, AgentResponse};
pub use classifier::QueryClassifier;
pub use rag_service::RagService;
pub use router::{default_intent_map, AgentRouter, RoutedStream};
pub use text_splitter::RecursiveTextSplitter;
pub use workspace::{Workspace, WorkspaceManager};
