//! Answers questions about stored todos.
//!
//! Filters come from the classifier's entities (`status`, `priority`,
//! `project`, `tag`). The matching todos are summarised by the LLM; if the
//! LLM call fails the plain listing is returned instead.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use super::{Agent, AgentCore, AgentError, AgentResponse};
use crate::domain::models::{Todo, TodoFilter, TodoPriority, TodoStatus, WorkflowState};
use crate::domain::ports::TodoRepository;

pub const DATA_QUERY_SYSTEM_PROMPT: &str = "You answer questions about the user's todo list. Use \
only the todos listed below. Be brief; group by status or priority when that helps.";

/// Upper bound on todos placed in one prompt.
const MAX_TODOS: usize = 50;

pub struct DataQueryAgent {
    core: AgentCore,
    todos: Arc<dyn TodoRepository>,
}

impl DataQueryAgent {
    pub fn new(core: AgentCore, todos: Arc<dyn TodoRepository>) -> Self {
        Self { core, todos }
    }
}

/// Build a repository filter from classification entities.
pub fn filter_from_state(state: &WorkflowState) -> TodoFilter {
    let mut filter = TodoFilter {
        limit: Some(MAX_TODOS),
        ..Default::default()
    };
    if let Some(classification) = &state.classification {
        filter.status = classification.entity_str("status").and_then(TodoStatus::parse);
        filter.priority = classification.entity_str("priority").and_then(TodoPriority::parse);
        filter.project = classification
            .entity_str("project")
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string);
        filter.tag = classification
            .entity_str("tag")
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string);
    }
    filter
}

fn listing(todos: &[Todo]) -> String {
    todos.iter().map(Todo::prompt_line).collect::<Vec<_>>().join("\n")
}

#[async_trait]
impl Agent for DataQueryAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn build_system_prompt(&self, state: &WorkflowState) -> String {
        let base = self.core.system_prompt(DATA_QUERY_SYSTEM_PROMPT);
        match state.context_str("todos") {
            Some(todos) => format!("{base}\n\nTodos:\n{todos}"),
            None => base.to_string(),
        }
    }

    async fn execute(&self, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let filter = filter_from_state(state);
        let todos = self.todos.list(&filter).await?;

        let data = serde_json::json!({
            "count": todos.len(),
            "todos": todos,
        });
        if todos.is_empty() {
            return Ok(AgentResponse::text("No matching todos found.").with_data(data));
        }

        let plain = listing(&todos);
        state.set_context("todos", plain.clone());

        let messages = self.core.messages(self.build_system_prompt(state), state);
        let message = match self.core.complete(&messages, &self.core.request_config()).await {
            Ok(response) => response.content,
            Err(e) => {
                warn!(agent = %self.core.name(), error = %e, "summary failed, returning plain listing");
                plain
            }
        };
        Ok(AgentResponse::text(message).with_data(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::MockLlmProvider;
    use crate::adapters::sqlite::{create_migrated_test_pool, SqliteTodoRepository};
    use crate::domain::models::{AgentConfig, ClassificationResult, QueryIntent};
    use std::collections::HashMap;

    async fn repo_with_todos() -> Arc<SqliteTodoRepository> {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = Arc::new(SqliteTodoRepository::new(pool));
        repo.create(&Todo::new("Draft budget").with_priority(TodoPriority::High))
            .await
            .unwrap();
        repo.create(&Todo::new("Water plants").with_status(TodoStatus::Completed))
            .await
            .unwrap();
        repo
    }

    fn state_with(entities: serde_json::Value) -> WorkflowState {
        let entities: HashMap<String, serde_json::Value> = serde_json::from_value(entities).unwrap();
        WorkflowState::new("what's left?")
            .with_classification(ClassificationResult::new(QueryIntent::TaskStatus, 0.9, "").with_entities(entities))
    }

    #[test]
    fn test_filter_from_entities() {
        let filter = filter_from_state(&state_with(serde_json::json!({"status": "done", "priority": "urgent"})));
        assert_eq!(filter.status, Some(TodoStatus::Completed));
        assert_eq!(filter.priority, Some(TodoPriority::Urgent));
        assert_eq!(filter.limit, Some(MAX_TODOS));
    }

    #[tokio::test]
    async fn test_summarises_filtered_todos() {
        let llm = Arc::new(MockLlmProvider::with_default_response("One todo left: Draft budget."));
        let agent = DataQueryAgent::new(AgentCore::new(AgentConfig::new("data"), llm.clone(), "m"), repo_with_todos().await);

        let mut state = state_with(serde_json::json!({"status": "pending"}));
        let response = agent.execute(&mut state).await.unwrap();
        assert_eq!(response.message, "One todo left: Draft budget.");
        assert_eq!(response.data.unwrap()["count"], 1);

        let system = &llm.calls().await[0].messages[0].content;
        assert!(system.contains("Draft budget"));
        assert!(!system.contains("Water plants"));
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back_to_listing() {
        let llm = Arc::new(MockLlmProvider::new());
        llm.push_failure("down").await;
        let agent = DataQueryAgent::new(AgentCore::new(AgentConfig::new("data"), llm, "m"), repo_with_todos().await);

        let response = agent.execute(&mut state_with(serde_json::json!({}))).await.unwrap();
        assert!(response.message.contains("Draft budget"));
        assert!(response.message.contains("Water plants"));
    }
}
