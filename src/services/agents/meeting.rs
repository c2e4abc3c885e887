//! Meeting note extraction.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::fields::{opt_string, records, string_or_empty, strings};
use super::{Agent, AgentCore, AgentError, AgentResponse};
use crate::domain::models::{MeetingNotes, ResponseFormat, WorkflowState};
use crate::services::json_extract::parse_llm_json;

pub const MEETING_SYSTEM_PROMPT: &str = r#"You turn raw meeting notes into structured minutes.

Respond with a JSON object only:
{
  "title": "meeting title or null",
  "date": "YYYY-MM-DD or null",
  "attendees": [{"name": "...", "role": "optional"}],
  "summary": "two or three sentence summary",
  "decisions": ["decision"],
  "action_items": [{"task": "...", "owner": "optional", "due_date": "optional"}],
  "cleaned_notes": "the notes rewritten as clean markdown"
}"#;

pub struct MeetingAgent {
    core: AgentCore,
}

impl MeetingAgent {
    pub const fn new(core: AgentCore) -> Self {
        Self { core }
    }
}

/// Map a raw reply into [`MeetingNotes`]; never fails. On parse failure the
/// raw reply is kept as `cleaned_notes`.
pub fn parse_meeting_notes(raw: &str) -> MeetingNotes {
    let value = match parse_llm_json::<Value>(raw) {
        Ok(value) if value.is_object() => value,
        Ok(_) => return degraded(raw, "expected a JSON object".to_string()),
        Err(e) => return degraded(raw, e.to_string()),
    };

    MeetingNotes {
        title: opt_string(&value, "title"),
        date: opt_string(&value, "date"),
        attendees: records(&value, "attendees", "name"),
        summary: string_or_empty(&value, "summary"),
        decisions: strings(&value, "decisions"),
        action_items: records(&value, "action_items", "task"),
        cleaned_notes: opt_string(&value, "cleaned_notes").unwrap_or_else(|| raw.trim().to_string()),
        parse_error: None,
    }
}

fn degraded(raw: &str, error: String) -> MeetingNotes {
    MeetingNotes {
        cleaned_notes: raw.trim().to_string(),
        parse_error: Some(error),
        ..Default::default()
    }
}

#[async_trait]
impl Agent for MeetingAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn build_system_prompt(&self, _state: &WorkflowState) -> String {
        self.core.system_prompt(MEETING_SYSTEM_PROMPT).to_string()
    }

    async fn execute(&self, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let messages = self.core.messages(self.build_system_prompt(state), state);
        let config = self
            .core
            .request_config()
            .with_response_format(ResponseFormat::JsonObject);
        let response = self.core.complete(&messages, &config).await?;

        let notes = parse_meeting_notes(&response.content);
        if let Some(err) = &notes.parse_error {
            warn!(agent = %self.core.name(), error = %err, "meeting notes were not valid JSON");
        }

        let message = if notes.summary.is_empty() {
            notes.cleaned_notes.clone()
        } else {
            notes.summary.clone()
        };
        Ok(AgentResponse::text(message).with_data(serde_json::to_value(&notes).unwrap_or_default()))
    }
}
