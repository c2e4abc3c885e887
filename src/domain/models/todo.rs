//! Todo and tag models read by the data-query and tagging agents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TodoStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "pending" | "todo" | "open" => Some(Self::Pending),
            "in_progress" | "active" | "doing" => Some(Self::InProgress),
            "completed" | "done" | "complete" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TodoPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TodoPriority {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" | "normal" => Some(Self::Medium),
            "high" => Some(Self::High),
            "urgent" | "critical" => Some(Self::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for TodoPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub due_date: Option<NaiveDate>,
    pub project: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            status: TodoStatus::default(),
            priority: TodoPriority::default(),
            due_date: None,
            project: None,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_priority(mut self, priority: TodoPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: TodoStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Single-line rendering used in LLM prompts.
    pub fn prompt_line(&self) -> String {
        let mut line = format!("- [{}] {} (priority: {})", self.status, self.title, self.priority);
        if let Some(due) = self.due_date {
            line.push_str(&format!(", due {due}"));
        }
        if let Some(project) = &self.project {
            line.push_str(&format!(", project {project}"));
        }
        if !self.tags.is_empty() {
            line.push_str(&format!(", tags: {}", self.tags.join(", ")));
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Normalize a tag name: trimmed, lowercase, inner whitespace as `-`.
pub fn normalize_tag(name: &str) -> String {
    name.trim()
        .trim_start_matches('#')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    pub project: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_aliases() {
        assert_eq!(TodoStatus::parse("done"), Some(TodoStatus::Completed));
        assert_eq!(TodoStatus::parse("In Progress"), Some(TodoStatus::InProgress));
        assert_eq!(TodoStatus::parse("canceled"), Some(TodoStatus::Cancelled));
        assert_eq!(TodoStatus::parse("whenever"), None);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(TodoPriority::Urgent > TodoPriority::High);
        assert!(TodoPriority::Low < TodoPriority::Medium);
        assert_eq!(TodoPriority::parse("critical"), Some(TodoPriority::Urgent));
    }

    #[test]
    fn test_prompt_line() {
        let todo = Todo::new("Write report")
            .with_priority(TodoPriority::High)
            .with_project("Q3")
            .with_due_date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let line = todo.prompt_line();
        assert!(line.contains("[pending] Write report"));
        assert!(line.contains("priority: high"));
        assert!(line.contains("due 2024-05-01"));
        assert!(line.contains("project Q3"));
    }

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("  #Deep Work "), "deep-work");
        assert_eq!(normalize_tag("Urgent"), "urgent");
    }
}
