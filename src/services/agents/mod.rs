//! Specialized agents.
//!
//! Every agent is a system prompt plus an LLM call, optionally preceded by
//! retrieval or tool calls. Shared plumbing lives in [`AgentCore`].

pub mod code;
pub mod data_query;
pub mod fields;
pub mod general;
pub mod meeting;
pub mod note_parser;
pub mod rag;
pub mod task;
pub mod tagging;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

pub use code::CodeAgent;
pub use data_query::DataQueryAgent;
pub use general::GeneralAgent;
pub use meeting::MeetingAgent;
pub use note_parser::NoteParserAgent;
pub use rag::RagAgent;
pub use tagging::TaggingAgent;
pub use task::TaskAgent;

use super::rag_service::RagService;
use crate::domain::errors::DomainError;
use crate::domain::models::{
    AgentConfig, ChatMessage, ContextSnippet, LlmRequestConfig, LlmResponse, WorkflowState,
};
use crate::domain::ports::{LlmError, LlmProvider, TokenStream};

/// Context key holding the prompt-ready retrieval text.
pub const RETRIEVED_CONTEXT_KEY: &str = "retrieved_context";

/// Context key holding the serialized [`ContextSnippet`] list.
pub const CONTEXT_USED_KEY: &str = "context_used";

/// Context key naming the workspace to search; all namespaces when absent.
pub const WORKSPACE_KEY: &str = "workspace";

/// History messages forwarded to the LLM.
pub const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Retrieval failed: {0}")]
    Retrieval(DomainError),

    #[error("Tool call failed: {0}")]
    Tool(#[from] DomainError),

    #[error("Agent not found: {0}")]
    NotFound(String),

    #[error("Agent configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AgentError {
    pub const fn is_not_found(&self) -> bool {
        match self {
            Self::Tool(e) | Self::Retrieval(e) => e.is_not_found(),
            Self::NotFound(_) => true,
            _ => false,
        }
    }
}

/// Output of one agent execution.
#[derive(Debug, Clone, Default)]
pub struct AgentResponse {
    pub message: String,
    pub context_used: Vec<ContextSnippet>,
    /// Structured result for agents that parse JSON
    pub data: Option<serde_json::Value>,
}

impl AgentResponse {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context_used: Vec<ContextSnippet>) -> Self {
        self.context_used = context_used;
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

#[async_trait]
pub trait Agent: Send + Sync {
    /// Registered name, e.g. "code".
    fn name(&self) -> &str;

    /// System prompt for this turn, including any retrieved context
    /// already stored in `state`.
    fn build_system_prompt(&self, state: &WorkflowState) -> String;

    async fn execute(&self, state: &mut WorkflowState) -> Result<AgentResponse, AgentError>;

    /// Streaming execution. The default runs [`execute`](Self::execute) and
    /// delivers its message as a single chunk.
    async fn execute_stream(&self, state: &mut WorkflowState) -> Result<TokenStream, AgentError> {
        let response = self.execute(state).await?;
        state.set_context(
            CONTEXT_USED_KEY,
            serde_json::to_value(&response.context_used).unwrap_or_default(),
        );
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.send(Ok(response.message)).await;
        Ok(rx)
    }
}

/// Config, provider and optional retrieval shared by every agent.
pub struct AgentCore {
    config: AgentConfig,
    llm: Arc<dyn LlmProvider>,
    default_model: String,
    rag: Option<Arc<RagService>>,
}

impl AgentCore {
    pub fn new(config: AgentConfig, llm: Arc<dyn LlmProvider>, default_model: impl Into<String>) -> Self {
        Self {
            config,
            llm,
            default_model: default_model.into(),
            rag: None,
        }
    }

    pub fn with_rag(mut self, rag: Arc<RagService>) -> Self {
        self.rag = Some(rag);
        self
    }

    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The configured prompt, or `builtin` when the agent has none.
    pub fn system_prompt<'a>(&'a self, builtin: &'a str) -> &'a str {
        self.config.resolved_system_prompt(builtin)
    }

    pub fn request_config(&self) -> LlmRequestConfig {
        self.config.request_config(&self.default_model)
    }

    /// System prompt, recent history, then the query.
    pub fn messages(&self, system_prompt: String, state: &WorkflowState) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(HISTORY_WINDOW + 2);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(state.recent_history(HISTORY_WINDOW).iter().cloned());
        messages.push(ChatMessage::user(state.query.clone()));
        messages
    }

    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<LlmResponse, AgentError> {
        debug!(agent = %self.config.name, model = %config.model, messages = messages.len(), "LLM call");
        Ok(self.llm.chat(messages, config).await?)
    }

    pub async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        config: &LlmRequestConfig,
    ) -> Result<TokenStream, AgentError> {
        debug!(agent = %self.config.name, model = %config.model, "LLM stream");
        Ok(self.llm.chat_stream(messages, config).await?)
    }

    /// Retrieve context when the agent has RAG enabled (or `force` is set)
    /// and a retrieval service is available.
    ///
    /// Results are written into `state` under [`RETRIEVED_CONTEXT_KEY`] and
    /// [`CONTEXT_USED_KEY`], and returned as snippets.
    pub async fn retrieve(
        &self,
        state: &mut WorkflowState,
        force: bool,
    ) -> Result<Vec<ContextSnippet>, AgentError> {
        let Some(rag) = &self.rag else {
            return Ok(Vec::new());
        };
        if !(force || self.config.use_rag) {
            return Ok(Vec::new());
        }

        let query = search_query(state);
        let namespace = state.context_str(WORKSPACE_KEY).map(str::to_string);
        let results = rag
            .search(&query, namespace.as_deref(), self.config.rag_top_k)
            .await
            .map_err(AgentError::Retrieval)?;

        let snippets = RagService::snippets(&results);
        if !results.is_empty() {
            state.set_context(RETRIEVED_CONTEXT_KEY, RagService::format_context(&results));
        }
        state.set_context(
            CONTEXT_USED_KEY,
            serde_json::to_value(&snippets).unwrap_or_default(),
        );
        debug!(agent = %self.config.name, query = %query, hits = results.len(), "retrieved context");
        Ok(snippets)
    }
}

/// Search query for retrieval: an explicit `search_query` entity, else the
/// `topic` and `keywords` entities, else the raw query.
pub fn search_query(state: &WorkflowState) -> String {
    let Some(classification) = &state.classification else {
        return state.query.clone();
    };

    if let Some(explicit) = classification.entity_str("search_query").filter(|s| !s.trim().is_empty()) {
        return explicit.to_string();
    }

    let mut terms = classification.entity_list("topic");
    terms.extend(classification.entity_list("keywords"));
    if terms.is_empty() {
        state.query.clone()
    } else {
        terms.join(" ")
    }
}

/// Snippets previously stored in `state` by [`AgentCore::retrieve`].
pub fn snippets_from_state(state: &WorkflowState) -> Vec<ContextSnippet> {
    state
        .context
        .get(CONTEXT_USED_KEY)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// Append retrieved context to a base prompt.
pub fn with_retrieved_context(base: &str, state: &WorkflowState) -> String {
    match state.context_str(RETRIEVED_CONTEXT_KEY) {
        Some(context) => format!(
            "{base}\n\nRelevant excerpts from the user's documents:\n\n{context}\n\n\
             Use these excerpts when they help and mention the source title."
        ),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ClassificationResult, QueryIntent};
    use std::collections::HashMap;

    #[test]
    fn test_search_query_prefers_entities() {
        let mut entities = HashMap::new();
        entities.insert("topic".to_string(), serde_json::json!("tokio"));
        entities.insert("keywords".to_string(), serde_json::json!(["runtime", "spawn"]));
        let state = WorkflowState::new("how does that thing work?").with_classification(
            ClassificationResult::new(QueryIntent::KnowledgeSearch, 0.9, "").with_entities(entities),
        );
        assert_eq!(search_query(&state), "tokio runtime spawn");
    }

    #[test]
    fn test_search_query_falls_back_to_query() {
        let state = WorkflowState::new("find my notes");
        assert_eq!(search_query(&state), "find my notes");
    }

    #[test]
    fn test_with_retrieved_context() {
        let mut state = WorkflowState::new("q");
        assert_eq!(with_retrieved_context("base", &state), "base");
        state.set_context(RETRIEVED_CONTEXT_KEY, "[From: A]\ntext");
        assert!(with_retrieved_context("base", &state).contains("[From: A]\ntext"));
    }

    #[test]
    fn test_snippets_round_trip_through_state() {
        let mut state = WorkflowState::new("q");
        let snippets = vec![ContextSnippet::new("T", "body", 0.5)];
        state.set_context(CONTEXT_USED_KEY, serde_json::to_value(&snippets).unwrap());
        assert_eq!(snippets_from_state(&state), snippets);
    }
}
