//! `aide rag` commands: index, search, list and delete documents.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::display::{action_success, dim, list_table, one_line, output, render_list, truncate, CommandOutput};
use crate::cli::progress::create_spinner;
use crate::cli::service::AppServices;
use crate::domain::models::{Config, Document, SearchResult, DEFAULT_NAMESPACE};
use crate::services::document_loader;

#[derive(Args, Debug)]
pub struct RagArgs {
    #[command(subcommand)]
    pub command: RagCommands,
}

#[derive(Subcommand, Debug)]
pub enum RagCommands {
    /// Index a file, or every supported file under a directory
    Index {
        path: PathBuf,
        /// Workspace (namespace) to index into
        #[arg(short, long, default_value = DEFAULT_NAMESPACE)]
        workspace: String,
    },
    /// Semantic search over indexed chunks
    Search {
        query: String,
        /// Restrict to one workspace
        #[arg(short, long)]
        workspace: Option<String>,
        /// Number of results (defaults to rag.top_k)
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// List indexed documents
    List {
        #[arg(short, long)]
        workspace: Option<String>,
    },
    /// Delete an indexed document and its chunks
    Delete { id: String },
}

#[derive(Debug, Serialize)]
struct IndexOutput {
    success: bool,
    workspace: String,
    documents: Vec<Document>,
    failed: Vec<FailedFile>,
}

#[derive(Debug, Serialize)]
struct FailedFile {
    path: String,
    error: String,
}

impl CommandOutput for IndexOutput {
    fn to_human(&self) -> String {
        let chunks: usize = self.documents.iter().map(|d| d.chunk_count).sum();
        let mut lines = vec![action_success(&format!(
            "Indexed {} document(s), {chunks} chunk(s) into '{}'",
            self.documents.len(),
            self.workspace
        ))];
        for doc in &self.documents {
            lines.push(format!("  {} {}", doc.title, dim(&format!("({} chunks)", doc.chunk_count))));
        }
        for failed in &self.failed {
            lines.push(format!("  skipped {}: {}", failed.path, failed.error));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
struct SearchOutput {
    query: String,
    results: Vec<SearchResult>,
}

impl CommandOutput for SearchOutput {
    fn to_human(&self) -> String {
        if self.results.is_empty() {
            return "No matching chunks found.".to_string();
        }
        self.results
            .iter()
            .enumerate()
            .map(|(i, r)| {
                format!(
                    "{}. {} {}\n   {}",
                    i + 1,
                    r.title,
                    dim(&format!("[{}] score {:.3}", r.namespace, r.score)),
                    truncate(&one_line(&r.content), 160)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Serialize)]
struct DocumentList {
    documents: Vec<Document>,
}

impl CommandOutput for DocumentList {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "workspace", "title", "chunks", "indexed"]);
        for doc in &self.documents {
            table.add_row(vec![
                doc.id.clone(),
                doc.namespace.clone(),
                truncate(&doc.title, 40),
                doc.chunk_count.to_string(),
                doc.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]);
        }
        render_list("document", &table, self.documents.len())
    }
}

#[derive(Debug, Serialize)]
struct DeleteOutput {
    success: bool,
    id: String,
}

impl CommandOutput for DeleteOutput {
    fn to_human(&self) -> String {
        action_success(&format!("Deleted document {}", self.id))
    }
}

pub async fn execute(args: RagArgs, config: Config, json_mode: bool) -> Result<()> {
    let top_k = config.rag.top_k;
    let services = AppServices::connect(config).await?;
    let rag = &services.rag;

    match args.command {
        RagCommands::Index { path, workspace } => {
            let files = if path.is_dir() {
                document_loader::collect_files(&path).await?
            } else {
                vec![path.clone()]
            };

            let spinner = create_spinner(format!("Indexing {} file(s)", files.len()), json_mode);
            let mut documents = Vec::new();
            let mut failed = Vec::new();
            for file in &files {
                spinner.set_message(format!("Indexing {}", file.display()));
                match rag.index_file(&workspace, file).await {
                    Ok(doc) => documents.push(doc),
                    // A single explicit file is all-or-nothing.
                    Err(e) if files.len() == 1 => {
                        spinner.finish_and_clear();
                        return Err(e).with_context(|| format!("Failed to index {}", file.display()));
                    }
                    Err(e) => failed.push(FailedFile {
                        path: file.display().to_string(),
                        error: e.to_string(),
                    }),
                }
            }
            spinner.finish_and_clear();

            output(
                &IndexOutput {
                    success: failed.is_empty(),
                    workspace,
                    documents,
                    failed,
                },
                json_mode,
            );
        }
        RagCommands::Search {
            query,
            workspace,
            limit,
        } => {
            let results = rag
                .search(&query, workspace.as_deref(), limit.unwrap_or(top_k))
                .await
                .context("Search failed")?;
            output(&SearchOutput { query, results }, json_mode);
        }
        RagCommands::List { workspace } => {
            let documents = rag.list_documents(workspace.as_deref()).await?;
            output(&DocumentList { documents }, json_mode);
        }
        RagCommands::Delete { id } => {
            rag.delete_document(&id).await?;
            output(&DeleteOutput { success: true, id }, json_mode);
        }
    }
    Ok(())
}
