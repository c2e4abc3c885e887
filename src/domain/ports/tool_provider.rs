//! Business-data ports used by the data-query and tagging agents.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Tag, Todo, TodoFilter};

/// Todo persistence.
#[async_trait]
pub trait TodoRepository: Send + Sync {
    async fn create(&self, todo: &Todo) -> DomainResult<()>;

    async fn get(&self, id: Uuid) -> DomainResult<Option<Todo>>;

    /// Todos matching `filter`, highest priority first, then by due date.
    async fn list(&self, filter: &TodoFilter) -> DomainResult<Vec<Todo>>;
}

/// The three operations the tagging agent needs.
#[async_trait]
pub trait TaskTaggingTools: Send + Sync {
    /// Fetch a todo, failing with `TodoNotFound` when absent.
    async fn get_todo(&self, id: Uuid) -> DomainResult<Todo>;

    /// Every known tag, sorted by name.
    async fn list_tags(&self) -> DomainResult<Vec<Tag>>;

    /// Attach tags to a todo, creating unknown tags.
    ///
    /// Names are normalized first; tags already on the todo are kept.
    /// Returns the todo's full tag list afterwards.
    async fn apply_tags(&self, todo_id: Uuid, tags: &[String]) -> DomainResult<Vec<String>>;
}
