//! Command-line interface for `aide`.

pub mod commands;
pub mod display;
pub mod progress;
pub mod service;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::redact_secrets;

use commands::{
    agent::AgentArgs, ask::AskArgs, classify::ClassifyArgs, config::ConfigArgs, init::InitArgs, rag::RagArgs,
    todo::TodoArgs, workspace::WorkspaceArgs,
};

#[derive(Parser, Debug)]
#[command(name = "aide")]
#[command(about = "Aide - personal assistant with intent routing and local RAG", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Config file to use instead of .aide/config.yaml
    #[arg(short, long, global = true, env = "AIDE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the .aide directory, config, agents and database
    Init(InitArgs),

    /// Manage workspaces (document namespaces)
    Workspace(WorkspaceArgs),

    /// Show or change configuration
    Config(ConfigArgs),

    /// Inspect agent configurations
    Agent(AgentArgs),

    /// Classify a query without running an agent
    Classify(ClassifyArgs),

    /// Route a query to the best agent and print the answer
    Ask(AskArgs),

    /// Index and search documents
    Rag(RagArgs),

    /// Manage todos
    Todo(TodoArgs),
}

/// Load configuration from `--config` or the project hierarchy.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Print an error (human or JSON) and exit with status 1.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    let message = redact_secrets(&format!("{err:#}"));
    if json_mode {
        let body = serde_json::json!({ "success": false, "error": message });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{}", display::action_failure(&format!("Error: {message}")));
    }
    std::process::exit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["aide", "classify", "hello there", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Classify(_)));
    }
}
