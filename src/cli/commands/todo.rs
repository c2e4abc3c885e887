//! `aide todo` commands.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::cli::display::{action_success, colorize_priority, colorize_status, list_table, output, render_list, truncate, CommandOutput};
use crate::cli::service::AppServices;
use crate::domain::models::{normalize_tag, Config, Todo, TodoFilter, TodoPriority, TodoStatus, WorkflowState};
use crate::domain::ports::{TaskTaggingTools, TodoRepository};
use crate::services::agents::tagging::TODO_ID_KEY;
use crate::services::Agent;

#[derive(Args, Debug)]
pub struct TodoArgs {
    #[command(subcommand)]
    pub command: TodoCommands,
}

#[derive(Subcommand, Debug)]
pub enum TodoCommands {
    /// Add a todo
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// low, medium, high or urgent
        #[arg(short, long, value_parser = parse_priority, default_value = "medium")]
        priority: TodoPriority,
        #[arg(long)]
        project: Option<String>,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<NaiveDate>,
    },
    /// List todos
    List {
        #[arg(short, long, value_parser = parse_status)]
        status: Option<TodoStatus>,
        #[arg(short, long, value_parser = parse_priority)]
        priority: Option<TodoPriority>,
        #[arg(long)]
        project: Option<String>,
        #[arg(short, long)]
        tag: Option<String>,
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
    /// Tag a todo: explicit tags, or let the tagging agent suggest them
    Tag {
        id: Uuid,
        /// Tags to apply (comma-separated); omit to ask the agent
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },
}

fn parse_priority(value: &str) -> Result<TodoPriority, String> {
    TodoPriority::parse(value).ok_or_else(|| format!("unknown priority '{value}'"))
}

fn parse_status(value: &str) -> Result<TodoStatus, String> {
    TodoStatus::parse(value).ok_or_else(|| format!("unknown status '{value}'"))
}

#[derive(Debug, Serialize)]
struct TodoCreated {
    success: bool,
    todo: Todo,
}

impl CommandOutput for TodoCreated {
    fn to_human(&self) -> String {
        action_success(&format!("Added todo {} ({})", self.todo.title, self.todo.id))
    }
}

#[derive(Debug, Serialize)]
struct TodoList {
    todos: Vec<Todo>,
}

impl CommandOutput for TodoList {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "status", "priority", "title", "project", "due", "tags"]);
        for todo in &self.todos {
            table.add_row(vec![
                todo.id.to_string(),
                colorize_status(todo.status.as_str()).to_string(),
                colorize_priority(todo.priority.as_str()).to_string(),
                truncate(&todo.title, 48),
                todo.project.clone().unwrap_or_default(),
                todo.due_date.map(|d| d.to_string()).unwrap_or_default(),
                todo.tags.join(", "),
            ]);
        }
        render_list("todo", &table, self.todos.len())
    }
}

#[derive(Debug, Serialize)]
struct TagOutput {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

impl CommandOutput for TagOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

pub async fn execute(args: TodoArgs, config: Config, json_mode: bool) -> Result<()> {
    let services = AppServices::connect(config).await?;

    match args.command {
        TodoCommands::Add {
            title,
            description,
            priority,
            project,
            due,
        } => {
            if title.trim().is_empty() {
                anyhow::bail!("Todo title cannot be empty");
            }
            let mut todo = Todo::new(title.trim()).with_priority(priority);
            todo.description = description;
            todo.project = project;
            todo.due_date = due;
            services.todos.create(&todo).await.context("Failed to add todo")?;
            output(&TodoCreated { success: true, todo }, json_mode);
        }
        TodoCommands::List {
            status,
            priority,
            project,
            tag,
            limit,
        } => {
            let filter = TodoFilter {
                status,
                priority,
                project,
                tag: tag.as_deref().map(normalize_tag),
                limit: Some(limit),
            };
            let todos = services.todos.list(&filter).await.context("Failed to list todos")?;
            output(&TodoList { todos }, json_mode);
        }
        TodoCommands::Tag { id, tags } => {
            let result = if tags.is_empty() {
                let agent = services.factory.create("tagging").await?;
                let mut state = WorkflowState::new("tag todo");
                state.set_context(TODO_ID_KEY, id.to_string());
                let response = agent.execute(&mut state).await?;
                TagOutput {
                    success: true,
                    message: response.message,
                    data: response.data,
                }
            } else {
                let todo = services.todos.get_todo(id).await?;
                let applied = services.todos.apply_tags(id, &tags).await?;
                TagOutput {
                    success: true,
                    message: format!("'{}' is now tagged: {}", todo.title, applied.join(", ")),
                    data: Some(serde_json::json!({ "todo_id": id, "tags": applied })),
                }
            };
            output(&result, json_mode);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_parsers() {
        assert_eq!(parse_priority("critical"), Ok(TodoPriority::Urgent));
        assert_eq!(parse_status("done"), Ok(TodoStatus::Completed));
        assert!(parse_status("someday").is_err());
    }
}
