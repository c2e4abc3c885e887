//! Fallback conversational agent.

use async_trait::async_trait;

use super::{with_retrieved_context, Agent, AgentCore, AgentError, AgentResponse};
use crate::domain::models::WorkflowState;
use crate::domain::ports::TokenStream;

pub const GENERAL_SYSTEM_PROMPT: &str = "You are Aide, a concise and friendly personal productivity \
assistant. Answer directly. When you do not know something, say so instead of guessing.";

pub struct GeneralAgent {
    core: AgentCore,
}

impl GeneralAgent {
    pub const fn new(core: AgentCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Agent for GeneralAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn build_system_prompt(&self, state: &WorkflowState) -> String {
        with_retrieved_context(self.core.system_prompt(GENERAL_SYSTEM_PROMPT), state)
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
