//! Terminal styling via `console`.

use console::{style, StyledObject};

use crate::domain::models::QueryIntent;

/// Color for todo status values.
pub fn colorize_status(status: &str) -> StyledObject<&str> {
    match status {
        "completed" => style(status).green().bold(),
        "in_progress" => style(status).yellow(),
        "pending" => style(status).blue(),
        "cancelled" => style(status).dim(),
        _ => style(status),
    }
}

/// Urgent = red bold, high = red, low = dim.
pub fn colorize_priority(priority: &str) -> StyledObject<&str> {
    match priority {
        "urgent" => style(priority).red().bold(),
        "high" => style(priority).red(),
        "low" => style(priority).dim(),
        _ => style(priority),
    }
}

pub fn colorize_intent(intent: QueryIntent) -> StyledObject<&'static str> {
    match intent {
        QueryIntent::Unclear => style(intent.as_str()).dim(),
        QueryIntent::CodeHelp => style(intent.as_str()).magenta(),
        QueryIntent::KnowledgeSearch | QueryIntent::Research => style(intent.as_str()).cyan(),
        _ => style(intent.as_str()).green(),
    }
}

pub fn heading(text: &str) -> String {
    style(text).bold().underlined().to_string()
}

pub fn dim(text: &str) -> String {
    style(text).dim().to_string()
}

pub fn action_success(message: &str) -> String {
    format!("{} {}", style("\u{2713}").green().bold(), message)
}

pub fn action_failure(message: &str) -> String {
    format!("{} {}", style("\u{2717}").red().bold(), message)
}
