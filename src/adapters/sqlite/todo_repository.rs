//! SQLite implementation of the todo ports.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use uuid::Uuid;

use super::{parse_datetime, parse_uuid};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{normalize_tag, Tag, Todo, TodoFilter, TodoPriority, TodoStatus};
use crate::domain::ports::{TaskTaggingTools, TodoRepository};

const SELECT_TODOS: &str = "SELECT id, title, description, status, priority, due_date, project, created_at, updated_at FROM todos";

/// Sort key: urgent first, then earliest due date, then oldest.
const ORDER_TODOS: &str = " ORDER BY CASE priority WHEN 'urgent' THEN 0 WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END, due_date IS NULL, due_date, created_at";

#[derive(Clone)]
pub struct SqliteTodoRepository {
    pool: SqlitePool,
}

impl SqliteTodoRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn tags_for(&self, todo_id: &str) -> DomainResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT t.name FROM tags t JOIN todo_tags tt ON tt.tag_id = t.id WHERE tt.todo_id = ? ORDER BY t.name",
        )
        .bind(todo_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    async fn hydrate(&self, row: TodoRow) -> DomainResult<Todo> {
        let tags = self.tags_for(&row.id).await?;
        let mut todo: Todo = row.try_into()?;
        todo.tags = tags;
        Ok(todo)
    }
}

#[async_trait]
impl TodoRepository for SqliteTodoRepository {
    async fn create(&self, todo: &Todo) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO todos (id, title, description, status, priority, due_date, project, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(todo.id.to_string())
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.status.as_str())
        .bind(todo.priority.as_str())
        .bind(todo.due_date.map(|d| d.to_string()))
        .bind(&todo.project)
        .bind(todo.created_at.to_rfc3339())
        .bind(todo.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        if !todo.tags.is_empty() {
            self.apply_tags(todo.id, &todo.tags).await?;
        }
        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Todo>> {
        let row: Option<TodoRow> = sqlx::query_as(&format!("{SELECT_TODOS} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn list(&self, filter: &TodoFilter) -> DomainResult<Vec<Todo>> {
        let mut query = format!("{SELECT_TODOS} WHERE 1=1");
        let mut bindings: Vec<String> = Vec::new();

        if let Some(status) = filter.status {
            query.push_str(" AND status = ?");
            bindings.push(status.as_str().to_string());
        }

        if let Some(priority) = filter.priority {
            query.push_str(" AND priority = ?");
            bindings.push(priority.as_str().to_string());
        }

        if let Some(project) = &filter.project {
            query.push_str(" AND project = ? COLLATE NOCASE");
            bindings.push(project.clone());
        }

        if let Some(tag) = &filter.tag {
            query.push_str(
                " AND id IN (SELECT tt.todo_id FROM todo_tags tt JOIN tags t ON t.id = tt.tag_id WHERE t.name = ?)",
            );
            bindings.push(normalize_tag(tag));
        }

        query.push_str(ORDER_TODOS);

        if let Some(limit) = filter.limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }

        let mut q = sqlx::query_as::<_, TodoRow>(&query);
        for binding in &bindings {
            q = q.bind(binding);
        }

        let rows: Vec<TodoRow> = q.fetch_all(&self.pool).await?;
        let mut todos = Vec::with_capacity(rows.len());
        for row in rows {
            todos.push(self.hydrate(row).await?);
        }
        Ok(todos)
    }
}

#[async_trait]
impl TaskTaggingTools for SqliteTodoRepository {
    async fn get_todo(&self, id: Uuid) -> DomainResult<Todo> {
        TodoRepository::get(self, id).await?.ok_or(DomainError::TodoNotFound(id))
    }

    async fn list_tags(&self) -> DomainResult<Vec<Tag>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id, name)| Tag { id, name }).collect())
    }

    async fn apply_tags(&self, todo_id: Uuid, tags: &[String]) -> DomainResult<Vec<String>> {
        let id = todo_id.to_string();
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM todos WHERE id = ?")
            .bind(&id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(DomainError::TodoNotFound(todo_id));
        }

        let names: BTreeSet<String> = tags
            .iter()
            .map(|t| normalize_tag(t))
            .filter(|t| !t.is_empty())
            .collect();

        let mut tx = self.pool.begin().await?;
        for name in &names {
            sqlx::query("INSERT OR IGNORE INTO tags (name) VALUES (?)")
                .bind(name)
                .execute(&mut *tx)
                .await?;
            sqlx::query(
                "INSERT OR IGNORE INTO todo_tags (todo_id, tag_id) SELECT ?, id FROM tags WHERE name = ?",
            )
            .bind(&id)
            .bind(name)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("UPDATE todos SET updated_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(&id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        self.tags_for(&id).await
    }
}

#[derive(sqlx::FromRow)]
struct TodoRow {
    id: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<String>,
    project: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<TodoRow> for Todo {
    type Error = DomainError;

    fn try_from(row: TodoRow) -> Result<Self, Self::Error> {
        let status = TodoStatus::parse(&row.status)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid status: {}", row.status)))?;
        let priority = TodoPriority::parse(&row.priority)
            .ok_or_else(|| DomainError::SerializationError(format!("Invalid priority: {}", row.priority)))?;
        let due_date = row
            .due_date
            .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
            .transpose()
            .map_err(|e| DomainError::SerializationError(e.to_string()))?;

        Ok(Todo {
            id: parse_uuid(&row.id)?,
            title: row.title,
            description: row.description,
            status,
            priority,
            due_date,
            project: row.project,
            tags: Vec::new(),
            created_at: parse_datetime(&row.created_at)?,
            updated_at: parse_datetime(&row.updated_at)?,
        })
    }
}
