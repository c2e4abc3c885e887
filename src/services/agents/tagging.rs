//! Suggests and applies tags for one todo.
//!
//! Not reached through intent routing: callers put the todo id into the
//! workflow context under `todo_id`.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::fields::strings;
use super::{Agent, AgentCore, AgentError, AgentResponse};
use crate::domain::models::{normalize_tag, ChatMessage, Tag, Todo, WorkflowState};
use crate::domain::ports::TaskTaggingTools;
use crate::services::json_extract::{extract_json_block, parse_llm_json};

pub const TAGGING_SYSTEM_PROMPT: &str = "You label todos with short tags. Prefer tags that already \
exist. Reply with a JSON array of 1 to 5 lowercase tags and nothing else, for example \
[\"work\", \"finance\"].";

pub const TODO_ID_KEY: &str = "todo_id";

const MAX_TAGS: usize = 5;

pub struct TaggingAgent {
    core: AgentCore,
    tools: Arc<dyn TaskTaggingTools>,
}

impl TaggingAgent {
    pub fn new(core: AgentCore, tools: Arc<dyn TaskTaggingTools>) -> Self {
        Self { core, tools }
    }
}

/// Tag names from a reply: a JSON array, `{"tags": [...]}`, or an array
/// embedded in prose. Normalized, deduplicated, at most five.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let parsed = parse_llm_json::<Value>(raw).ok().or_else(|| {
        let block = extract_json_block(raw);
        let (start, end) = (block.find('[')?, block.rfind(']')?);
        (end > start)
            .then(|| serde_json::from_str(&block[start..=end]).ok())
            .flatten()
    });

    let names = match parsed {
        Some(Value::Array(items)) => strings(&serde_json::json!({ "tags": items }), "tags"),
        Some(object @ Value::Object(_)) => strings(&object, "tags"),
        _ => Vec::new(),
    };

    let mut tags: Vec<String> = Vec::new();
    for name in names.iter().map(|n| normalize_tag(n)) {
        if !name.is_empty() && !tags.contains(&name) {
            tags.push(name);
        }
    }
    tags.truncate(MAX_TAGS);
    tags
}

fn describe(todo: &Todo, existing: &[Tag]) -> String {
    let mut text = format!("Todo: {}", todo.title);
    if let Some(description) = &todo.description {
        text.push_str(&format!("\nDescription: {description}"));
    }
    if let Some(project) = &todo.project {
        text.push_str(&format!("\nProject: {project}"));
    }
    let names: Vec<&str> = existing.iter().map(|t| t.name.as_str()).collect();
    if names.is_empty() {
        text.push_str("\nExisting tags: (none)");
    } else {
        text.push_str(&format!("\nExisting tags: {}", names.join(", ")));
    }
    text
}

#[async_trait]
impl Agent for TaggingAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn build_system_prompt(&self, _state: &WorkflowState) -> String {
        self.core.system_prompt(TAGGING_SYSTEM_PROMPT).to_string()
    }

    async fn execute(&self, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let todo_id = state
            .context_str(TODO_ID_KEY)
            .ok_or_else(|| AgentError::InvalidInput(format!("context.{TODO_ID_KEY} is required")))
            .and_then(|raw| {
                Uuid::parse_str(raw).map_err(|e| AgentError::InvalidInput(format!("invalid todo id '{raw}': {e}")))
            })?;

        let todo = self.tools.get_todo(todo_id).await?;
        let existing = self.tools.list_tags().await?;

        let messages = vec![
            ChatMessage::system(self.build_system_prompt(state)),
            ChatMessage::user(describe(&todo, &existing)),
        ];
        let response = self.core.complete(&messages, &self.core.request_config()).await?;

        let suggested = parse_tags(&response.content);
        if suggested.is_empty() {
            warn!(agent = %self.core.name(), todo_id = %todo_id, "no tags in LLM reply");
            return Ok(AgentResponse::text(format!("No tags suggested for '{}'.", todo.title))
                .with_data(serde_json::json!({ "todo_id": todo_id, "applied": [], "tags": todo.tags })));
        }

        let tags = self.tools.apply_tags(todo_id, &suggested).await?;
        info!(todo_id = %todo_id, applied = ?suggested, "tagged todo");

        Ok(
            AgentResponse::text(format!("Tagged '{}' with: {}", todo.title, suggested.join(", "))).with_data(
                serde_json::json!({ "todo_id": todo_id, "applied": suggested, "tags": tags }),
            ),
        )
    }
}
