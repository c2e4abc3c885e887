//! Intent-based routing to specialized agents.
//!
//! Resolution order for one query:
//! 1. a forced intent skips classification (confidence 1.0)
//! 2. otherwise the classifier runs; results below the confidence threshold
//!    go to the default agent
//! 3. the intent's mapped agent runs if registered, else the default agent

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::agents::{snippets_from_state, Agent, AgentError};
use super::classifier::QueryClassifier;
use crate::domain::models::{
    ChatMessage, ClassificationResult, ContextSnippet, QueryIntent, RoutedResponse, RouterConfig,
    WorkflowState,
};
use crate::domain::ports::TokenStream;

/// Intent to agent name, before config overrides.
pub fn default_intent_map() -> HashMap<QueryIntent, String> {
    [
        (QueryIntent::KnowledgeSearch, "rag"),
        (QueryIntent::Research, "rag"),
        (QueryIntent::TaskPlanning, "task"),
        (QueryIntent::TaskStatus, "data"),
        (QueryIntent::DataQuery, "data"),
        (QueryIntent::GeneralChat, "general"),
        (QueryIntent::MeetingNote, "meeting"),
        (QueryIntent::CodeHelp, "code"),
        (QueryIntent::Unclear, "general"),
    ]
    .into_iter()
    .map(|(intent, agent)| (intent, agent.to_string()))
    .collect()
}

/// Routing metadata plus the chosen agent's live token stream.
pub struct RoutedStream {
    pub intent: QueryIntent,
    pub confidence: f64,
    pub agent_type: String,
    pub classification_reasoning: String,
    pub context_used: Vec<ContextSnippet>,
    pub tokens: TokenStream,
}

pub struct AgentRouter {
    classifier: QueryClassifier,
    agents: HashMap<String, Arc<dyn Agent>>,
    intent_agents: HashMap<QueryIntent, String>,
    default_agent: String,
    confidence_threshold: f64,
}

impl AgentRouter {
    pub fn new(classifier: QueryClassifier, default_agent: impl Into<String>) -> Self {
        Self {
            classifier,
            agents: HashMap::new(),
            intent_agents: default_intent_map(),
            default_agent: default_agent.into(),
            confidence_threshold: RouterConfig::default().confidence_threshold,
        }
    }

    /// Router with threshold, default agent and intent overrides from config.
    /// Override keys that are not intents are skipped with a warning.
    pub fn from_config(classifier: QueryClassifier, config: &RouterConfig) -> Self {
        let mut router =
            Self::new(classifier, &config.default_agent).with_confidence_threshold(config.confidence_threshold);
        for (intent_name, agent) in &config.intent_agents {
            match QueryIntent::parse(intent_name) {
                Some(intent) => router.map_intent(intent, agent.clone()),
                None => warn!(intent = %intent_name, "ignoring agent override for unknown intent"),
            }
        }
        router
    }

    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.register(agent);
        self
    }

    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        self.agents.insert(agent.name().to_string(), agent);
    }

    pub fn map_intent(&mut self, intent: QueryIntent, agent: impl Into<String>) {
        self.intent_agents.insert(intent, agent.into());
    }

    /// Agent names referenced by the intent map plus the default agent.
    pub fn required_agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.intent_agents.values().cloned().collect();
        names.push(self.default_agent.clone());
        names.sort();
        names.dedup();
        names
    }

    pub fn registered_agents(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub const fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub const fn classifier(&self) -> &QueryClassifier {
        &self.classifier
    }

    async fn resolve(
        &self,
        query: &str,
        history: &[ChatMessage],
        force_intent: Option<QueryIntent>,
    ) -> ClassificationResult {
        match force_intent {
            Some(intent) => ClassificationResult::forced(intent),
            None => self.classifier.classify(query, history).await,
        }
    }

    /// Agent for a classification: the mapped agent when confident and
    /// registered, otherwise the default agent.
    pub fn select(&self, classification: &ClassificationResult) -> Result<Arc<dyn Agent>, AgentError> {
        if classification.is_confident(self.confidence_threshold) {
            if let Some(agent) = self
                .intent_agents
                .get(&classification.intent)
                .and_then(|name| self.agents.get(name))
            {
                return Ok(Arc::clone(agent));
            }
        } else {
            info!(
                confidence = classification.confidence,
                threshold = self.confidence_threshold,
                "low confidence, using default agent"
            );
        }

        self.agents
            .get(&self.default_agent)
            .cloned()
            .ok_or_else(|| AgentError::Configuration(format!("default agent '{}' is not registered", self.default_agent)))
    }

    /// Classify (unless forced), run the selected agent, and wrap the result.
    ///
    /// Agent failures do not propagate: they come back as a response with
    /// `error` set and the error text as the message.
    #[instrument(skip(self, query, history, context), fields(forced = force_intent.is_some()))]
    pub async fn route(
        &self,
        query: &str,
        history: Vec<ChatMessage>,
        context: HashMap<String, Value>,
        force_intent: Option<QueryIntent>,
    ) -> RoutedResponse {
        let classification = self.resolve(query, &history, force_intent).await;

        let mut response = RoutedResponse {
            message: String::new(),
            context_used: Vec::new(),
            intent: classification.intent,
            confidence: classification.confidence,
            agent_type: self.default_agent.clone(),
            classification_reasoning: classification.reasoning.clone(),
            data: None,
            error: None,
        };

        let agent = match self.select(&classification) {
            Ok(agent) => agent,
            Err(e) => {
                error!(error = %e, "no agent available");
                response.message = format!("Error: {e}");
                response.error = Some(e.to_string());
                return response;
            }
        };
        response.agent_type = agent.name().to_string();

        let mut state = WorkflowState::new(query)
            .with_history(history)
            .with_context(context)
            .with_classification(classification);

        match agent.execute(&mut state).await {
            Ok(output) => {
                info!(intent = %response.intent, agent = %response.agent_type, "routed");
                response.message = output.message;
                response.context_used = output.context_used;
                response.data = output.data;
            }
            Err(e) => {
                error!(agent = %response.agent_type, error = %e, "agent failed");
                response.message = format!("Error: {e}");
                response.error = Some(e.to_string());
            }
        }
        response
    }

    /// Same resolution as [`route`](Self::route), but hands back the
    /// agent's token stream unmodified.
    #[instrument(skip(self, query, history, context), fields(forced = force_intent.is_some()))]
    pub async fn route_stream(
        &self,
        query: &str,
        history: Vec<ChatMessage>,
        context: HashMap<String, Value>,
        force_intent: Option<QueryIntent>,
    ) -> Result<RoutedStream, AgentError> {
        let classification = self.resolve(query, &history, force_intent).await;
        let agent = self.select(&classification)?;

        let intent = classification.intent;
        let confidence = classification.confidence;
        let classification_reasoning = classification.reasoning.clone();

        let mut state = WorkflowState::new(query)
            .with_history(history)
            .with_context(context)
            .with_classification(classification);
        let tokens = agent.execute_stream(&mut state).await?;

        info!(intent = %intent, agent = %agent.name(), "routed (streaming)");
        Ok(RoutedStream {
            intent,
            confidence,
            agent_type: agent.name().to_string(),
            classification_reasoning,
            context_used: snippets_from_state(&state),
            tokens,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::llm::MockLlmProvider;
    use crate::domain::models::AgentConfig;
    use crate::services::agents::{AgentCore, CodeAgent, GeneralAgent};

    fn router(classifier_reply: &str) -> (AgentRouter, Arc<MockLlmProvider>, Arc<MockLlmProvider>) {
        let classifier_llm = Arc::new(MockLlmProvider::with_default_response(classifier_reply));
        let agent_llm = Arc::new(MockLlmProvider::with_default_response("agent reply"));
        let classifier = QueryClassifier::new(AgentCore::new(AgentConfig::new("classifier"), classifier_llm.clone(), "m"));
        let router = AgentRouter::new(classifier, "general")
            .with_agent(Arc::new(GeneralAgent::new(AgentCore::new(AgentConfig::new("general"), agent_llm.clone(), "m"))))
            .with_agent(Arc::new(CodeAgent::new(AgentCore::new(AgentConfig::new("code"), agent_llm.clone(), "m"))));
        (router, classifier_llm, agent_llm)
    }

    #[test]
    fn test_default_map_covers_every_intent() {
        let map = default_intent_map();
        for intent in QueryIntent::all() {
            assert!(map.contains_key(&intent), "{intent} unmapped");
        }
        assert_eq!(map[&QueryIntent::Research], "rag");
        assert_eq!(map[&QueryIntent::TaskStatus], "data");
    }

    #[tokio::test]
    async fn test_forced_intent_skips_classifier() {
        let (router, classifier_llm, agent_llm) = router("{}");
        let response = router
            .route("Hello!", Vec::new(), HashMap::new(), Some(QueryIntent::GeneralChat))
            .await;
        assert!((response.confidence - 1.0).abs() < f64::EPSILON);
        assert_eq!(response.agent_type, "general");
        assert_eq!(classifier_llm.call_count().await, 0);
        assert_eq!(agent_llm.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_confident_intent_routes_to_mapped_agent() {
        let (router, _, _) = router(r#"{"intent": "code_help", "confidence": 0.9, "reasoning": "code"}"#);
        let response = router.route("fix my loop", Vec::new(), HashMap::new(), None).await;
        assert_eq!(response.intent, QueryIntent::CodeHelp);
        assert_eq!(response.agent_type, "code");
        assert_eq!(response.classification_reasoning, "code");
        assert_eq!(response.message, "agent reply");
    }

    #[tokio::test]
    async fn test_low_confidence_uses_default() {
        let (router, _, _) = router(r#"{"intent": "code_help", "confidence": 0.1}"#);
        let response = router.route("hmm", Vec::new(), HashMap::new(), None).await;
        assert_eq!(response.intent, QueryIntent::CodeHelp);
        assert_eq!(response.agent_type, "general");
    }

    #[tokio::test]
    async fn test_unregistered_agent_uses_default() {
        let (router, _, _) = router(r#"{"intent": "meeting_note", "confidence": 0.95}"#);
        let response = router.route("notes...", Vec::new(), HashMap::new(), None).await;
        assert_eq!(response.agent_type, "general");
    }

    #[tokio::test]
    async fn test_agent_failure_becomes_error_response() {
        let (router, _, agent_llm) = router("{}");
        agent_llm.push_failure("boom").await;
        let response = router
            .route("hi", Vec::new(), HashMap::new(), Some(QueryIntent::GeneralChat))
            .await;
        assert!(response.is_error());
        assert!(response.message.contains("boom"));
    }

    #[tokio::test]
    async fn test_missing_default_agent() {
        let classifier = QueryClassifier::new(AgentCore::new(
            AgentConfig::new("classifier"),
            Arc::new(MockLlmProvider::new()),
            "m",
        ));
        let router = AgentRouter::new(classifier, "general");
        let response = router
            .route("hi", Vec::new(), HashMap::new(), Some(QueryIntent::GeneralChat))
            .await;
        assert!(response.error.unwrap().contains("default agent 'general'"));
    }

    #[tokio::test]
    async fn test_config_overrides() {
        let (_, classifier_llm, _) = router("{}");
        let classifier = QueryClassifier::new(AgentCore::new(AgentConfig::new("classifier"), classifier_llm, "m"));
        let config = RouterConfig {
            confidence_threshold: 0.8,
            intent_agents: [("code_help".to_string(), "general".to_string()), ("bogus".to_string(), "x".to_string())]
                .into_iter()
                .collect(),
            ..Default::default()
        };
        let router = AgentRouter::from_config(classifier, &config);
        assert!((router.confidence_threshold() - 0.8).abs() < f64::EPSILON);
        assert!(!router.required_agents().contains(&"code".to_string()));
    }

    #[tokio::test]
    async fn test_route_stream_passes_tokens_through() {
        let (router, _, _) = router("{}");
        let mut routed = router
            .route_stream("Hello!", Vec::new(), HashMap::new(), Some(QueryIntent::GeneralChat))
            .await
            .unwrap();
        assert_eq!(routed.agent_type, "general");

        let mut text = String::new();
        while let Some(chunk) = routed.tokens.recv().await {
            text.push_str(&chunk.unwrap());
        }
        assert_eq!(text, "agent reply");
    }
}
