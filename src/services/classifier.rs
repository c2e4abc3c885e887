//! Intent classification.
//!
//! One LLM call per query, no retries. Anything that goes wrong (transport
//! error, non-JSON reply, wrong shape) yields
//! [`ClassificationResult::fallback`]: `general_chat` at confidence 0.5.

use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

use super::agents::AgentCore;
use super::json_extract::{parse_llm_json, JsonExtractError};
use crate::domain::models::{
    ChatMessage, ClassificationResult, QueryIntent, ResponseFormat, FALLBACK_CONFIDENCE,
};

/// History messages shown to the classifier.
const CLASSIFIER_HISTORY: usize = 4;

pub struct QueryClassifier {
    core: AgentCore,
}

/// Built-in classifier prompt listing every intent.
pub fn default_classifier_prompt() -> String {
    let intents = QueryIntent::all()
        .iter()
        .map(|i| format!("- {}: {}", i.as_str(), i.description()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You classify the user's message for a personal productivity assistant.

Intents:
{intents}

Respond with a JSON object only:
{{
  "intent": "one of the intent names above",
  "confidence": 0.0 to 1.0,
  "reasoning": "one short sentence",
  "entities": {{"topic": "...", "keywords": ["..."], "language": "...", "project": "...", "status": "...", "deadline": "..."}},
  "suggested_context": "what to search for, or null"
}}
Only include entities that appear in the message."#
    )
}

impl QueryClassifier {
    pub const fn new(core: AgentCore) -> Self {
        Self { core }
    }

    pub fn build_system_prompt(&self) -> String {
        self.core
            .config()
            .system_prompt
            .clone()
            .unwrap_or_else(default_classifier_prompt)
    }

    fn build_messages(&self, query: &str, history: &[ChatMessage]) -> Vec<ChatMessage> {
        let recent = &history[history.len().saturating_sub(CLASSIFIER_HISTORY)..];
        let user = if recent.is_empty() {
            format!("Message: {query}")
        } else {
            let transcript = recent
                .iter()
                .map(|m| format!("{}: {}", m.role.as_str(), m.content))
                .collect::<Vec<_>>()
                .join("\n");
            format!("Recent conversation:\n{transcript}\n\nMessage: {query}")
        };
        vec![ChatMessage::system(self.build_system_prompt()), ChatMessage::user(user)]
    }

    /// Classify `query`; never fails.
    #[instrument(skip(self, query, history), fields(query_len = query.len()))]
    pub async fn classify(&self, query: &str, history: &[ChatMessage]) -> ClassificationResult {
        let messages = self.build_messages(query, history);
        let config = self
            .core
            .request_config()
            .with_response_format(ResponseFormat::JsonObject);

        let response = match self.core.complete(&messages, &config).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "classification call failed, using fallback");
                return ClassificationResult::fallback(e.to_string());
            }
        };

        match parse_classification(&response.content) {
            Ok(result) => {
                debug!(intent = %result.intent, confidence = result.confidence, "classified");
                result
            }
            Err(e) => {
                warn!(error = %e, "unparseable classification, using fallback");
                ClassificationResult::fallback(e.to_string())
            }
        }
    }
}

/// Parse a classifier reply.
///
/// Unknown intents map to `general_chat`; confidence is clamped to
/// `[0, 1]` and defaults to 0.5 when absent or not a number.
pub fn parse_classification(raw: &str) -> Result<ClassificationResult, JsonExtractError> {
    let value: Value = parse_llm_json(raw)?;
    let Value::Object(map) = value else {
        return Err(JsonExtractError {
            message: "expected a JSON object".to_string(),
        });
    };

    let intent = map
        .get("intent")
        .and_then(Value::as_str)
        .map_or(QueryIntent::GeneralChat, QueryIntent::from_str_lossy);

    let confidence = match map.get("confidence") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(FALLBACK_CONFIDENCE),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(FALLBACK_CONFIDENCE),
        _ => FALLBACK_CONFIDENCE,
    };

    let reasoning = map
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let entities: HashMap<String, Value> = match map.get("entities") {
        Some(Value::Object(entities)) => entities
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => HashMap::new(),
    };

    let mut result = ClassificationResult::new(intent, confidence, reasoning).with_entities(entities);
    if let Some(context) = map
        .get("suggested_context")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
    {
        result = result.with_suggested_context(context);
    }
    Ok(result)
}
