//! Domain models for the Aide assistant.

pub mod agent_config;
pub mod chunking;
pub mod classification;
pub mod config;
pub mod llm;
pub mod retrieval;
pub mod structured;
pub mod todo;
pub mod workflow;

pub use agent_config::AgentConfig;
pub use chunking::{Chunk, ChunkingConfig, DEFAULT_SEPARATORS};
pub use classification::{ClassificationResult, QueryIntent, FALLBACK_CONFIDENCE};
pub use config::{
    Config, DatabaseConfig, EmbeddingConfig, LlmConfig, LoggingConfig, RagConfig, RouterConfig,
};
pub use llm::{ChatMessage, LlmRequestConfig, LlmResponse, ResponseFormat, Role, TokenUsage};
pub use retrieval::{Document, EmbeddedChunk, SearchFilter, SearchResult, DEFAULT_NAMESPACE};
pub use structured::{
    ActionItem, Attendee, MeetingNotes, NamedRef, NoteTodo, ParsedNote, PersonRef, PlannedTask,
    TaskPlan,
};
pub use todo::{normalize_tag, Tag, Todo, TodoFilter, TodoPriority, TodoStatus};
pub use workflow::{ContextSnippet, RoutedResponse, WorkflowState, SNIPPET_MAX_CHARS};
