//! Query classification models.
//!
//! A [`ClassificationResult`] is produced once per incoming query and consumed
//! by the router to pick a specialized agent.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Coarse category of a user's query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryIntent {
    /// Look something up in indexed documents
    KnowledgeSearch,
    /// Plan work, break goals into steps
    TaskPlanning,
    /// Ask about progress of existing todos
    TaskStatus,
    /// Query stored business data (todos, projects, people)
    DataQuery,
    /// Small talk or anything without a better home
    GeneralChat,
    /// Extract structure from meeting notes
    MeetingNote,
    /// Programming help
    CodeHelp,
    /// Open-ended research over documents
    Research,
    /// Classifier could not decide
    Unclear,
}

impl QueryIntent {
    /// Every intent, in declaration order.
    pub const fn all() -> [Self; 9] {
        [
            Self::KnowledgeSearch,
            Self::TaskPlanning,
            Self::TaskStatus,
            Self::DataQuery,
            Self::GeneralChat,
            Self::MeetingNote,
            Self::CodeHelp,
            Self::Research,
            Self::Unclear,
        ]
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::KnowledgeSearch => "knowledge_search",
            Self::TaskPlanning => "task_planning",
            Self::TaskStatus => "task_status",
            Self::DataQuery => "data_query",
            Self::GeneralChat => "general_chat",
            Self::MeetingNote => "meeting_note",
            Self::CodeHelp => "code_help",
            Self::Research => "research",
            Self::Unclear => "unclear",
        }
    }

    /// Parse an intent string produced by an LLM.
    ///
    /// Matching ignores case, surrounding whitespace and `-`/space vs `_`.
    /// Unknown strings map to [`QueryIntent::GeneralChat`].
    pub fn from_str_lossy(value: &str) -> Self {
        Self::parse(value).unwrap_or(Self::GeneralChat)
    }

    /// Strict parse, `None` for unknown intents.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace(['-', ' '], "_");
        Self::all().into_iter().find(|i| i.as_str() == normalized)
    }

    /// One-line description used in the classifier prompt.
    pub const fn description(&self) -> &'static str {
        match self {
            Self::KnowledgeSearch => "looking up information in the user's documents or notes",
            Self::TaskPlanning => "planning work, preparing for something, breaking a goal into steps",
            Self::TaskStatus => "asking about progress or state of existing todos",
            Self::DataQuery => "asking about stored projects, people, organizations or todos",
            Self::GeneralChat => "greetings, small talk, general questions",
            Self::MeetingNote => "raw meeting notes to be summarised or structured",
            Self::CodeHelp => "programming, debugging, code review",
            Self::Research => "open-ended research that combines several documents",
            Self::Unclear => "the request cannot be understood",
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueryIntent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| {
            let valid: Vec<&str> = Self::all().iter().map(Self::as_str).collect();
            format!("unknown intent '{s}', expected one of: {}", valid.join(", "))
        })
    }
}

/// Result of classifying one query. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: QueryIntent,

    /// Always within `[0.0, 1.0]`
    pub confidence: f64,

    pub reasoning: String,

    #[serde(default)]
    pub entities: HashMap<String, serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_context: Option<String>,
}

/// Confidence assigned when the classifier cannot produce a real answer.
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

impl ClassificationResult {
    pub fn new(intent: QueryIntent, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            intent,
            confidence: clamp_confidence(confidence),
            reasoning: reasoning.into(),
            entities: HashMap::new(),
            suggested_context: None,
        }
    }

    /// Safe default used whenever classification fails.
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self::new(QueryIntent::GeneralChat, FALLBACK_CONFIDENCE, reason)
    }

    /// Result for a caller-forced intent.
    pub fn forced(intent: QueryIntent) -> Self {
        Self::new(intent, 1.0, format!("intent forced to {intent}"))
    }

    pub fn with_entities(mut self, entities: HashMap<String, serde_json::Value>) -> Self {
        self.entities = entities;
        self
    }

    pub fn with_suggested_context(mut self, context: impl Into<String>) -> Self {
        self.suggested_context = Some(context.into());
        self
    }

    pub fn is_confident(&self, threshold: f64) -> bool {
        self.confidence >= threshold
    }

    /// String-valued entity, if present.
    pub fn entity_str(&self, key: &str) -> Option<&str> {
        self.entities.get(key).and_then(serde_json::Value::as_str)
    }

    /// Entity as a list of strings; a single string becomes a one-element list.
    pub fn entity_list(&self, key: &str) -> Vec<String> {
        match self.entities.get(key) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .filter(|s| !s.trim().is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Clamp into `[0, 1]`; NaN becomes the fallback confidence.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        FALLBACK_CONFIDENCE
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_round_trip_strings() {
        for intent in QueryIntent::all() {
            assert_eq!(QueryIntent::parse(intent.as_str()), Some(intent));
        }
    }

    #[test]
    fn test_intent_lossy_parsing() {
        assert_eq!(QueryIntent::from_str_lossy("Task-Planning"), QueryIntent::TaskPlanning);
        assert_eq!(QueryIntent::from_str_lossy(" code help "), QueryIntent::CodeHelp);
        assert_eq!(QueryIntent::from_str_lossy("weather"), QueryIntent::GeneralChat);
        assert_eq!(QueryIntent::from_str_lossy(""), QueryIntent::GeneralChat);
    }

    #[test]
    fn test_intent_from_str_error_lists_options() {
        let err = "nope".parse::<QueryIntent>().unwrap_err();
        assert!(err.contains("knowledge_search"));
    }

    #[test]
    fn test_fallback() {
        let result = ClassificationResult::fallback("LLM offline");
        assert_eq!(result.intent, QueryIntent::GeneralChat);
        assert!((result.confidence - 0.5).abs() < f64::EPSILON);
        assert!(result.entities.is_empty());
        assert_eq!(result.reasoning, "LLM offline");
    }

    #[test]
    fn test_forced_is_full_confidence() {
        let result = ClassificationResult::forced(QueryIntent::CodeHelp);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert!((ClassificationResult::new(QueryIntent::Research, 3.0, "").confidence - 1.0).abs() < f64::EPSILON);
        assert!(ClassificationResult::new(QueryIntent::Research, -1.0, "").confidence.abs() < f64::EPSILON);
        assert!((clamp_confidence(f64::NAN) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_entity_list_accepts_string_or_array() {
        let mut entities = HashMap::new();
        entities.insert("keywords".to_string(), serde_json::json!(["rust", "async"]));
        entities.insert("topic".to_string(), serde_json::json!("interview"));
        let result = ClassificationResult::new(QueryIntent::Research, 0.9, "").with_entities(entities);

        assert_eq!(result.entity_list("keywords"), vec!["rust", "async"]);
        assert_eq!(result.entity_list("topic"), vec!["interview"]);
        assert!(result.entity_list("missing").is_empty());
        assert_eq!(result.entity_str("topic"), Some("interview"));
    }
}
