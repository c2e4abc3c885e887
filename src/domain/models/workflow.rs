//! Per-turn routing state and its terminal output.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::classification::{ClassificationResult, QueryIntent};
use super::llm::ChatMessage;

/// Maximum characters kept per retrieval snippet in `context_used`.
pub const SNIPPET_MAX_CHARS: usize = 200;

/// Mutable accumulator for one conversation turn.
///
/// Agents read the query and history from it and may write intermediate
/// results (retrieved context, tool outputs) into `context`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowState {
    pub query: String,
    pub conversation_history: Vec<ChatMessage>,
    pub classification: Option<ClassificationResult>,
    pub context: HashMap<String, serde_json::Value>,
}

impl WorkflowState {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_context(mut self, context: HashMap<String, serde_json::Value>) -> Self {
        self.context = context;
        self
    }

    pub fn with_classification(mut self, classification: ClassificationResult) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(serde_json::Value::as_str)
    }

    pub fn set_context(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.context.insert(key.into(), value.into());
    }

    /// The last `n` history messages, oldest first.
    pub fn recent_history(&self, n: usize) -> &[ChatMessage] {
        let start = self.conversation_history.len().saturating_sub(n);
        &self.conversation_history[start..]
    }
}

/// A retrieval snippet reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnippet {
    pub title: String,
    /// At most [`SNIPPET_MAX_CHARS`] characters of the chunk
    pub content: String,
    pub score: f32,
}

impl ContextSnippet {
    pub fn new(title: impl Into<String>, content: &str, score: f32) -> Self {
        Self {
            title: title.into(),
            content: truncate_chars(content, SNIPPET_MAX_CHARS),
            score,
        }
    }
}

/// Terminal output of one routing pass. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedResponse {
    pub message: String,
    pub context_used: Vec<ContextSnippet>,
    pub intent: QueryIntent,
    pub confidence: f64,
    pub agent_type: String,
    pub classification_reasoning: String,

    /// Structured output of agents that parse LLM JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Set when the agent failed; `message` then carries the error text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RoutedResponse {
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Truncate to `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
