//! Task planning: breaks a goal into concrete, prioritized tasks.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::fields::{opt_string, records};
use super::{with_retrieved_context, Agent, AgentCore, AgentError, AgentResponse};
use crate::domain::models::{ResponseFormat, TaskPlan, WorkflowState};
use crate::services::json_extract::parse_llm_json;

pub const TASK_SYSTEM_PROMPT: &str = r#"You are a planning assistant. Help the user prepare for what they describe by breaking it into concrete, actionable tasks.

Respond with a JSON object only:
{
  "response": "short friendly explanation of the plan",
  "tasks": [
    {"title": "task title", "description": "optional detail", "priority": "low|medium|high|urgent", "due_date": "YYYY-MM-DD or null"}
  ]
}"#;

pub struct TaskAgent {
    core: AgentCore,
}

impl TaskAgent {
    pub const fn new(core: AgentCore) -> Self {
        Self { core }
    }
}

/// Map a raw reply into a [`TaskPlan`]; never fails.
pub fn parse_task_plan(raw: &str) -> TaskPlan {
    match parse_llm_json::<Value>(raw) {
        Ok(value) if value.is_object() => TaskPlan {
            response: opt_string(&value, "response")
                .or_else(|| opt_string(&value, "message"))
                .unwrap_or_default(),
            tasks: records(&value, "tasks", "title"),
            parse_error: None,
        },
        Ok(_) => TaskPlan {
            response: raw.trim().to_string(),
            parse_error: Some("expected a JSON object".to_string()),
            ..Default::default()
        },
        Err(e) => TaskPlan {
            response: raw.trim().to_string(),
            parse_error: Some(e.to_string()),
            ..Default::default()
        },
    }
}

#[async_trait]
impl Agent for TaskAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn build_system_prompt(&self, state: &WorkflowState) -> String {
        let mut prompt = self.core.system_prompt(TASK_SYSTEM_PROMPT).to_string();
        if let Some(deadline) = state.classification.as_ref().and_then(|c| c.entity_str("deadline")) {
            prompt.push_str(&format!("\n\nThe user's deadline: {deadline}."));
        }
        with_retrieved_context(&prompt, state)
    }

    async fn execute(&self, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let context_used = self.core.retrieve(state, false).await?;
        let messages = self.core.messages(self.build_system_prompt(state), state);
        let config = self
            .core
            .request_config()
            .with_response_format(ResponseFormat::JsonObject);
        let response = self.core.complete(&messages, &config).await?;

        let plan = parse_task_plan(&response.content);
        if let Some(err) = &plan.parse_error {
            warn!(agent = %self.core.name(), error = %err, "task plan was not valid JSON");
        }

        let message = if plan.response.is_empty() {
            plan.tasks
                .iter()
                .map(|t| format!("- {}", t.title))
                .collect::<Vec<_>>()
                .join("\n")
        } else {
            plan.response.clone()
        };

        Ok(AgentResponse::text(message)
            .with_context(context_used)
            .with_data(serde_json::to_value(&plan).unwrap_or_default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::MockLlmProvider;
    use crate::domain::models::AgentConfig;
    use std::sync::Arc;

    #[test]
    fn test_parse_task_plan() {
        let plan = parse_task_plan(
            "```json\n{\"response\": \"Here is a plan\", \"tasks\": [\"Research the company\", \
             {\"title\": \"Mock interview\", \"priority\": \"high\", \"due_date\": null},]}\n```",
        );
        assert!(plan.parse_error.is_none());
        assert_eq!(plan.response, "Here is a plan");
        assert_eq!(plan.tasks.len(), 2);
        assert_eq!(plan.tasks[0].title, "Research the company");
        assert_eq!(plan.tasks[1].priority.as_deref(), Some("high"));
        assert!(plan.tasks[1].due_date.is_none());
    }

    #[test]
    fn test_parse_task_plan_degrades() {
        let plan = parse_task_plan("Just practice a lot.");
        assert!(plan.parse_error.is_some());
        assert_eq!(plan.response, "Just practice a lot.");
        assert!(plan.tasks.is_empty());
    }

    #[tokio::test]
    async fn test_execute_requests_json() {
        let llm = Arc::new(MockLlmProvider::with_default_response(
            r#"{"response": "Plan ready", "tasks": [{"title": "Update CV"}]}"#,
        ));
        let agent = TaskAgent::new(AgentCore::new(AgentConfig::new("task"), llm.clone(), "m"));
        let response = agent.execute(&mut WorkflowState::new("prepare for interview")).await.unwrap();

        assert_eq!(response.message, "Plan ready");
        assert_eq!(response.data.unwrap()["tasks"][0]["title"], "Update CV");
        assert_eq!(llm.calls().await[0].config.response_format, ResponseFormat::JsonObject);
    }
}
