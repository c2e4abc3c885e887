//! `aide agent` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::sync::Arc;

use crate::adapters::llm::ProviderRegistry;
use crate::cli::display::{dim, list_table, output, render_list, truncate, CommandOutput};
use crate::domain::models::{AgentConfig, Config};
use crate::infrastructure::logging::mask_secret;
use crate::services::AgentFactory;

#[derive(Args, Debug)]
pub struct AgentArgs {
    #[command(subcommand)]
    pub command: AgentCommands,
}

#[derive(Subcommand, Debug)]
pub enum AgentCommands {
    /// List agents (built-in and from the agents directory)
    List,
    /// Show one agent's effective configuration
    Show { name: String },
}

#[derive(Debug, Serialize)]
struct AgentRow {
    #[serde(flatten)]
    config: AgentConfig,
    source: &'static str,
}

#[derive(Debug, Serialize)]
struct AgentList {
    agents: Vec<AgentRow>,
    default_model: String,
}

impl CommandOutput for AgentList {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "class", "model", "rag", "source", "description"]);
        for row in &self.agents {
            let c = &row.config;
            table.add_row(vec![
                c.name.clone(),
                c.class.clone(),
                c.model.clone().unwrap_or_else(|| dim(&self.default_model)),
                if c.use_rag { format!("top {}", c.rag_top_k) } else { "-".to_string() },
                row.source.to_string(),
                truncate(&c.description, 48),
            ]);
        }
        render_list("agent", &table, self.agents.len())
    }
}

#[derive(Debug, Serialize)]
struct AgentDetail {
    #[serde(flatten)]
    config: AgentConfig,
    source: &'static str,
}

impl CommandOutput for AgentDetail {
    fn to_human(&self) -> String {
        let c = &self.config;
        let mut lines = vec![
            format!("Name:            {}", c.name),
            format!("Class:           {}", c.class),
            format!("Source:          {}", self.source),
            format!("Provider:        {}", c.provider.as_deref().unwrap_or("(default)")),
            format!("Model:           {}", c.model.as_deref().unwrap_or("(default)")),
            format!("Temperature:     {}", c.temperature),
            format!("Max tokens:      {}", c.max_tokens),
            format!("Timeout:         {}s", c.timeout),
            format!("Response format: {:?}", c.response_format),
            format!(
                "RAG:             {}",
                if c.use_rag { format!("yes (top {})", c.rag_top_k) } else { "no".to_string() }
            ),
        ];
        if let Some(url) = &c.base_url {
            lines.push(format!("Base URL:        {url}"));
        }
        if !c.description.is_empty() {
            lines.push(format!("\n{}", c.description));
        }
        if let Some(prompt) = &c.system_prompt {
            lines.push(format!("\nSystem prompt:\n{prompt}"));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: AgentArgs, config: Config, json_mode: bool) -> Result<()> {
    let default_model = config.llm.model.clone();
    let factory = AgentFactory::new(&config.agents_dir, Arc::new(ProviderRegistry::new(config.llm)));

    match args.command {
        AgentCommands::List => {
            let configs = factory.list_configs().await.context("Failed to load agent configs")?;
            let agents = configs
                .into_iter()
                .map(|c| AgentRow {
                    source: source(&factory, &c.name),
                    config: masked(c),
                })
                .collect();
            output(&AgentList { agents, default_model }, json_mode);
        }
        AgentCommands::Show { name } => {
            let config = factory
                .config(&name)
                .await
                .with_context(|| format!("Failed to load agent '{name}'"))?;
            output(
                &AgentDetail {
                    source: source(&factory, &name),
                    config: masked(config),
                },
                json_mode,
            );
        }
    }
    Ok(())
}

fn source(factory: &AgentFactory, name: &str) -> &'static str {
    if factory.agents_dir().join(name).is_dir() {
        "directory"
    } else {
        "built-in"
    }
}

fn masked(mut config: AgentConfig) -> AgentConfig {
    config.api_key = config.api_key.as_deref().map(mask_secret);
    config
}
