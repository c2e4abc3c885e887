//! Question answering over indexed documents.

use async_trait::async_trait;

use super::{with_retrieved_context, Agent, AgentCore, AgentError, AgentResponse, RETRIEVED_CONTEXT_KEY};
use crate::domain::models::WorkflowState;
use crate::domain::ports::TokenStream;

pub const RAG_SYSTEM_PROMPT: &str = "You answer questions using the user's own documents. Base the \
answer on the excerpts provided and cite them by title as [From: title]. If the excerpts do not \
contain the answer, say that the documents do not cover it before offering general knowledge.";

const NO_DOCUMENTS_NOTE: &str = "\n\nNo indexed documents matched this question.";

/// Always retrieves, regardless of the `use_rag` flag.
pub struct RagAgent {
    core: AgentCore,
}

impl RagAgent {
    pub const fn new(core: AgentCore) -> Self {
        Self { core }
    }
}

#[async_trait]
impl Agent for RagAgent {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn build_system_prompt(&self, state: &WorkflowState) -> String {
        let base = self.core.system_prompt(RAG_SYSTEM_PROMPT);
        if state.context.contains_key(RETRIEVED_CONTEXT_KEY) {
            with_retrieved_context(base, state)
        } else {
            format!("{base}{NO_DOCUMENTS_NOTE}")
        }
    }

    async fn execute(&self, state: &mut WorkflowState) -> Result<AgentResponse, AgentError> {
        let context_used = self.core.retrieve(state, true).await?;
        let messages = self.core.messages(self.build_system_prompt(state), state);
        let response = self.core.complete(&messages, &self.core.request_config()).await?;
        Ok(AgentResponse::text(response.content).with_context(context_used))
    }

    async fn execute_stream(&self, state: &mut WorkflowState) -> Result<TokenStream, AgentError> {
        self.core.retrieve(state, true).await?;
        let messages = self.core.messages(self.build_system_prompt(state), state);
        self.core.complete_stream(&messages, &self.core.request_config()).await
    }
}
