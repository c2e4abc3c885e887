//! Extracts todos, people, organizations and projects from a free-form note.

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use super::fields::{opt_string, records};
use super::{Agent, AgentCore, AgentError, AgentResponse};
use crate::domain::models::{ParsedNote, ResponseFormat, WorkflowState};
use crate::services::json_extract::parse_llm_json;

pub const NOTE_PARSER_SYSTEM_PROMPT: &str = r#"You extract structured data from a personal note.

Respond with a JSON object only:
{
  "todos": [{"title": "...", "priority": "low|medium|high|urgent", "due_date": "YYYY-MM-DD or null"}],
  "persons": [{"name": "...", "organization": "optional", "role": "optional"}],
  "organizations": [{"name": "...", "description": "optional"}],
  "projects": [{"name": "...", "description": "optional"}],
  "cleaned_notes": "the note rewritten clearly"
}
Use empty lists when nothing applies. Do not invent entities."#;

pub struct NoteParserAgent {
    core: AgentCore,
}

impl NoteParserAgent {
    pub const fn new(core: AgentCore) -> Self {
        Self { core }
    }
}

/// Map a raw reply into a [`ParsedNote`]; never fails.
pub fn parse_note(raw: &str) -> ParsedNote {
    let value = match parse_llm_json::<Value>(raw) {
        Ok(value) if value.is_object() => value,
        Ok(_) => return degraded(raw, "expected a JSON object".to_string()),
        Err(e) => return degraded(raw, e.to_string()),
    };

    ParsedNote {
        todos: records(&value, "todos", "title"),
        persons: records(&value, "persons", "name"),
        organizations: records(&value, "organizations", "name"),
        projects: records(&value, "projects", "name"),
        cleaned_notes: opt_string(&value, "cleaned_notes").unwrap_or_else(|| raw.trim().to_string()),
        parse_error: None,
    }
}

fn degraded(raw: &str, error: String) -> ParsedNote {
    ParsedNote {
        cleaned_notes: raw.trim().to_string(),
        parse_error: Some(error),
        ..Default::default()
    }
}

fn summarize(note: &ParsedNote) -> String {
    if note.parse_error.is_some() {
        return note.cleaned_notes.clone();
    }
    format!(
        "Found {} todo(s), {} person(s), {} organization(s), {} project(s).",
        note.todos.len(),
        note.persons.len(),
        note.organizations.len(),
        note.projects.len()
    )
}

#[async_trait]
impl Agent for NoteParserAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn build_system_prompt(&self, _state: &WorkflowState) -> String {
        self.core.system_prompt(NOTE_PARSER_SYSTEM_PROMPT).to_string()
    }

    async fn execute(&self, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let messages = self.core.messages(self.build_system_prompt(state), state);
        let config = self
            .core
            .request_config()
            .with_response_format(ResponseFormat::JsonObject);
        let response = self.core.complete(&messages, &config).await?;

        let note = parse_note(&response.content);
        if let Some(err) = &note.parse_error {
            warn!(agent = %self.core.name(), error = %err, "parsed note was not valid JSON");
        }
        Ok(AgentResponse::text(summarize(&note)).with_data(serde_json::to_value(&note).unwrap_or_default()))
    }
}
