//! `aide ask`: classify, route, and print the agent's answer.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;

use crate::cli::display::{colorize_intent, dim, output, CommandOutput};
use crate::cli::service::AppServices;
use crate::domain::models::{Config, ContextSnippet, QueryIntent, RoutedResponse};
use crate::services::agents::WORKSPACE_KEY;
use crate::services::AgentRouter;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// The question or request
    pub query: String,

    /// Skip classification and route straight to this intent
    #[arg(short, long, value_parser = parse_intent)]
    pub intent: Option<QueryIntent>,

    /// Workspace whose documents are searched
    #[arg(short, long)]
    pub workspace: Option<String>,

    /// Print tokens as they arrive
    #[arg(short, long)]
    pub stream: bool,
}

fn parse_intent(value: &str) -> Result<QueryIntent, String> {
    QueryIntent::parse(value).ok_or_else(|| {
        let known: Vec<&str> = QueryIntent::all().iter().map(QueryIntent::as_str).collect();
        format!("unknown intent '{value}', expected one of: {}", known.join(", "))
    })
}

#[derive(Debug, Serialize)]
struct AskOutput {
    #[serde(flatten)]
    response: RoutedResponse,
}

impl CommandOutput for AskOutput {
    fn to_human(&self) -> String {
        let r = &self.response;
        let mut text = r.message.clone();
        if !r.context_used.is_empty() {
            text.push_str(&format!("\n\n{}", sources_line(&r.context_used)));
        }
        text.push_str(&format!("\n{}", footer(r.intent, r.confidence, &r.agent_type)));
        text
    }
}

fn sources_line(snippets: &[ContextSnippet]) -> String {
    let titles: Vec<String> = snippets
        .iter()
        .map(|s| format!("{} ({:.2})", s.title, s.score))
        .collect();
    dim(&format!("Sources: {}", titles.join(", ")))
}

fn footer(intent: QueryIntent, confidence: f64, agent: &str) -> String {
    format!(
        "{} {} {}",
        colorize_intent(intent),
        dim(&format!("{confidence:.2} ->")),
        dim(agent)
    )
}

pub async fn execute(args: AskArgs, config: Config, json_mode: bool) -> Result<()> {
    let services = AppServices::connect(config).await?;
    let router = services.router().await?;

    let mut context: HashMap<String, Value> = HashMap::new();
    if let Some(workspace) = &args.workspace {
        context.insert(WORKSPACE_KEY.to_string(), Value::String(workspace.clone()));
    }

    if args.stream {
        return stream(&router, args, context, json_mode).await;
    }

    let response = router.route(&args.query, Vec::new(), context, args.intent).await;
    if let Some(error) = &response.error {
        anyhow::bail!("{} agent failed: {error}", response.agent_type);
    }
    output(&AskOutput { response }, json_mode);
    Ok(())
}

async fn stream(
    router: &AgentRouter,
    args: AskArgs,
    context: HashMap<String, Value>,
    json_mode: bool,
) -> Result<()> {
    let mut routed = router
        .route_stream(&args.query, Vec::new(), context, args.intent)
        .await
        .context("Failed to start streaming response")?;

    let mut message = String::new();
    let mut stdout = std::io::stdout();
    while let Some(chunk) = routed.tokens.recv().await {
        let chunk = chunk.context("Stream interrupted")?;
        if !json_mode {
            stdout.write_all(chunk.as_bytes())?;
            stdout.flush()?;
        }
        message.push_str(&chunk);
    }

    if json_mode {
        let response = RoutedResponse {
            message,
            context_used: routed.context_used,
            intent: routed.intent,
            confidence: routed.confidence,
            agent_type: routed.agent_type,
            classification_reasoning: routed.classification_reasoning,
            data: None,
            error: None,
        };
        output(&AskOutput { response }, true);
    } else {
        println!();
        if !routed.context_used.is_empty() {
            println!("\n{}", sources_line(&routed.context_used));
        }
        println!("{}", footer(routed.intent, routed.confidence, &routed.agent_type));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intent() {
        assert_eq!(parse_intent("code_help"), Ok(QueryIntent::CodeHelp));
        assert_eq!(parse_intent("Meeting-Note"), Ok(QueryIntent::MeetingNote));
        let err = parse_intent("weather").unwrap_err();
        assert!(err.contains("knowledge_search"));
    }
}
