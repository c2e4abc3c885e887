//! Workspaces: named directories whose name doubles as the RAG namespace.
//!
//! ```text
//! <workspaces_dir>/
//!   default/
//!     workspace.yaml
//!     documents/
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::domain::errors::{DomainError, DomainResult};

pub const MANIFEST_FILE: &str = "workspace.yaml";
pub const DOCUMENTS_DIR: &str = "documents";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Filled on load, never written
    #[serde(skip)]
    pub path: PathBuf,
}

impl Workspace {
    pub fn documents_dir(&self) -> PathBuf {
        self.path.join(DOCUMENTS_DIR)
    }
}

/// Names are used as directory names and namespaces: ASCII letters, digits,
/// `-` and `_`, starting with a letter or digit.
pub fn validate_workspace_name(name: &str) -> DomainResult<()> {
    let valid = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DomainError::ValidationFailed(format!(
            "invalid workspace name '{name}': use letters, digits, '-' or '_'"
        )))
    }
}

pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn create(&self, name: &str, description: &str) -> DomainResult<Workspace> {
        validate_workspace_name(name)?;
        let path = self.root.join(name);
        if path.join(MANIFEST_FILE).exists() {
            return Err(DomainError::ValidationFailed(format!("workspace '{name}' already exists")));
        }

        fs::create_dir_all(path.join(DOCUMENTS_DIR)).await.map_err(io_error)?;
        let workspace = Workspace {
            name: name.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
            path,
        };
        let yaml = serde_yaml::to_string(&workspace).map_err(|e| DomainError::SerializationError(e.to_string()))?;
        fs::write(workspace.path.join(MANIFEST_FILE), yaml).await.map_err(io_error)?;

        info!(workspace = %name, "created workspace");
        Ok(workspace)
    }

    /// Load one workspace. A directory without a manifest (for example one
    /// created by hand) still counts, using its modification time.
    pub async fn get(&self, name: &str) -> DomainResult<Workspace> {
        validate_workspace_name(name)?;
        let path = self.root.join(name);
        if !path.is_dir() {
            return Err(DomainError::WorkspaceNotFound(name.to_string()));
        }

        let manifest = path.join(MANIFEST_FILE);
        if manifest.is_file() {
            let content = fs::read_to_string(&manifest).await.map_err(io_error)?;
            let mut workspace: Workspace =
                serde_yaml::from_str(&content).map_err(|e| DomainError::SerializationError(e.to_string()))?;
            workspace.path = path;
            return Ok(workspace);
        }

        let created_at = fs::metadata(&path)
            .await
            .and_then(|m| m.modified())
            .map_or_else(|_| Utc::now(), DateTime::<Utc>::from);
        Ok(Workspace {
            name: name.to_string(),
            description: String::new(),
            created_at,
            path,
        })
    }

    /// All workspaces, sorted by name. Hidden directories are skipped.
    pub async fn list(&self) -> DomainResult<Vec<Workspace>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.root).await.map_err(io_error)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
            let name = entry.file_name().to_string_lossy().to_string();
            if entry.path().is_dir() && validate_workspace_name(&name).is_ok() {
                names.push(name);
            }
        }
        names.sort();

        let mut workspaces = Vec::with_capacity(names.len());
        for name in names {
            workspaces.push(self.get(&name).await?);
        }
        Ok(workspaces)
    }

    pub async fn remove(&self, name: &str) -> DomainResult<()> {
        let workspace = self.get(name).await?;
        fs::remove_dir_all(&workspace.path).await.map_err(io_error)?;
        info!(workspace = %name, "removed workspace");
        Ok(())
    }
}

fn io_error(err: std::io::Error) -> DomainError {
    DomainError::ExecutionFailed(err.to_string())
}
