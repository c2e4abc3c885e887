//! Programming help.

use async_trait::async_trait;

use super::{with_retrieved_context, Agent, AgentCore, AgentError, AgentResponse};
use crate::domain::models::WorkflowState;
use crate::domain::ports::TokenStream;

pub const CODE_SYSTEM_PROMPT: &str = "You are an experienced software engineer helping with code. \
Give working, idiomatic examples in fenced code blocks with the language named. Explain the why \
briefly after the code. Point out bugs, edge cases and security issues you notice.";

pub struct CodeAgent {
    core: AgentCore,
}

impl CodeAgent {
    pub const fn new(core: AgentCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Agent for CodeAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn build_system_prompt(&self, state: &WorkflowState) -> String {
        let mut prompt = self.core.system_prompt(CODE_SYSTEM_PROMPT).to_string();

        let classification = state.classification.as_ref();
        if let Some(language) = classification.and_then(|c| c.entity_str("language")) {
            prompt.push_str(&format!("\n\nThe user is working in {language}."));
        }
        if let Some(framework) = classification.and_then(|c| c.entity_str("framework")) {
            prompt.push_str(&format!(" Framework: {framework}."));
        }

        with_retrieved_context(&prompt, state)
    }

    async fn execute(&self, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let context_used = self.core.retrieve(state, false).await?;
        let messages = self.core.messages(self.build_system_prompt(state), state);
        let response = self.core.complete(&messages, &self.core.request_config()).await?;
        Ok(AgentResponse::text(response.content).with_context(context_used))
    }

    async fn execute_stream(&self, state: &mut WorkflowState) -> Result<TokenStream, AgentError> {
        self.core.retrieve(state, false).await?;
        let messages = self.core.messages(self.build_system_prompt(state), state);
        self.core.complete_stream(&messages, &self.core.request_config()).await
    }
}
