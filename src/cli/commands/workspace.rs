//! `aide workspace` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::display::{action_success, list_table, output, render_list, CommandOutput};
use crate::cli::service::AppServices;
use crate::domain::models::Config;
use crate::services::{Workspace, WorkspaceManager};

#[derive(Args, Debug)]
pub struct WorkspaceArgs {
    #[command(subcommand)]
    pub command: WorkspaceCommands,
}

#[derive(Subcommand, Debug)]
pub enum WorkspaceCommands {
    /// Create a workspace
    Create {
        name: String,
        /// Short description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// List workspaces
    List,
    /// Show a workspace and its indexed documents
    Show { name: String },
    /// Remove a workspace directory
    Remove {
        name: String,
        /// Also delete its indexed documents
        #[arg(long)]
        purge: bool,
    },
}

#[derive(Debug, Serialize)]
struct WorkspaceList {
    workspaces: Vec<Workspace>,
}

impl CommandOutput for WorkspaceList {
    fn to_human(&self) -> String {
        let mut table = list_table(&["name", "description", "created"]);
        for ws in &self.workspaces {
            table.add_row(vec![
                ws.name.clone(),
                ws.description.clone(),
                ws.created_at.format("%Y-%m-%d").to_string(),
            ]);
        }
        render_list("workspace", &table, self.workspaces.len())
    }
}

#[derive(Debug, Serialize)]
struct WorkspaceDetail {
    #[serde(flatten)]
    workspace: Workspace,
    path: String,
    documents: usize,
    chunks: usize,
}

impl CommandOutput for WorkspaceDetail {
    fn to_human(&self) -> String {
        let ws = &self.workspace;
        let mut lines = vec![
            format!("Name:        {}", ws.name),
            format!("Path:        {}", self.path),
            format!("Created at:  {}", ws.created_at.format("%Y-%m-%d %H:%M:%S UTC")),
            format!("Documents:   {} ({} chunks)", self.documents, self.chunks),
        ];
        if !ws.description.is_empty() {
            lines.insert(1, format!("Description: {}", ws.description));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
struct ActionOutput {
    success: bool,
    message: String,
}

impl CommandOutput for ActionOutput {
    fn to_human(&self) -> String {
        action_success(&self.message)
    }
}

pub async fn execute(args: WorkspaceArgs, config: Config, json_mode: bool) -> Result<()> {
    let manager = WorkspaceManager::new(&config.workspaces_dir);

    match args.command {
        WorkspaceCommands::Create { name, description } => {
            let ws = manager
                .create(&name, &description)
                .await
                .context("Failed to create workspace")?;
            output(
                &ActionOutput {
                    success: true,
                    message: format!("Created workspace '{}' at {}", ws.name, ws.path.display()),
                },
                json_mode,
            );
        }
        WorkspaceCommands::List => {
            let workspaces = manager.list().await.context("Failed to list workspaces")?;
            output(&WorkspaceList { workspaces }, json_mode);
        }
        WorkspaceCommands::Show { name } => {
            let workspace = manager.get(&name).await?;
            let services = AppServices::connect(config).await?;
            let documents = services.rag.list_documents(Some(&name)).await?;
            let chunks = documents.iter().map(|d| d.chunk_count).sum();
            output(
                &WorkspaceDetail {
                    path: workspace.path.display().to_string(),
                    workspace,
                    documents: documents.len(),
                    chunks,
                },
                json_mode,
            );
        }
        WorkspaceCommands::Remove { name, purge } => {
            manager.remove(&name).await.context("Failed to remove workspace")?;
            let mut message = format!("Removed workspace '{name}'");
            if purge {
                let services = AppServices::connect(config).await?;
                let documents = services.rag.list_documents(Some(&name)).await?;
                for doc in &documents {
                    services.rag.delete_document(&doc.id).await?;
                }
                message.push_str(&format!(" and {} indexed document(s)", documents.len()));
            }
            output(&ActionOutput { success: true, message }, json_mode);
        }
    }
    Ok(())
}
