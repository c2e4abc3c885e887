//! Domain errors for the Aide assistant.

use thiserror::Error;
use uuid::Uuid;

/// Domain-level errors that can occur in the Aide system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Todo not found: {0}")]
    TodoNotFound(Uuid),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent configuration not found: {0}")]
    AgentConfigNotFound(String),

    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl DomainError {
    /// Whether this error describes a missing resource.
    ///
    /// The CLI maps these to a "not found" message; an HTTP layer would map
    /// them to 404.
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TodoNotFound(_)
                | Self::DocumentNotFound(_)
                | Self::AgentNotFound(_)
                | Self::AgentConfigNotFound(_)
                | Self::WorkspaceNotFound(_)
        )
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for DomainError {
    fn from(err: serde_yaml::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}
