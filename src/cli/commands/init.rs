//! Implementation of the `aide init` command.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::display::{output, CommandOutput};
use crate::domain::models::{Config, DEFAULT_NAMESPACE};
use crate::infrastructure::config::{CONFIG_FILE, PROJECT_DIR};
use crate::services::builtin_configs;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite existing config and agent files (the database is kept)
    #[arg(long, short)]
    pub force: bool,

    /// Target directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub directories_created: Vec<String>,
    pub config_written: bool,
    pub agents_written: usize,
    pub database_initialized: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if !self.directories_created.is_empty() {
            lines.push("\nCreated directories:".to_string());
            for dir in &self.directories_created {
                lines.push(format!("  - {dir}"));
            }
        }
        if self.config_written {
            lines.push(format!("\nWrote {PROJECT_DIR}/{CONFIG_FILE}"));
        }
        if self.agents_written > 0 {
            lines.push(format!("Wrote {} agent config(s)", self.agents_written));
        }
        if self.database_initialized {
            lines.push(format!("Database initialized at {PROJECT_DIR}/aide.db"));
        }
        lines.join("\n")
    }
}

pub async fn execute(args: InitArgs, json_mode: bool) -> Result<()> {
    let target_path = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };

    let project_dir = target_path.join(PROJECT_DIR);
    let config_path = project_dir.join(CONFIG_FILE);

    if config_path.exists() && !args.force {
        let output_data = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to rewrite config and agents.".to_string(),
            initialized_path: target_path,
            directories_created: vec![],
            config_written: false,
            agents_written: 0,
            database_initialized: false,
        };
        output(&output_data, json_mode);
        return Ok(());
    }

    let config = Config::default();
    let agents_dir = target_path.join(&config.agents_dir);
    let dirs = [
        project_dir.clone(),
        project_dir.join("logs"),
        agents_dir.clone(),
        target_path.join(&config.workspaces_dir).join(DEFAULT_NAMESPACE),
    ];

    let mut directories_created = vec![];
    for dir in &dirs {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let relative = dir.strip_prefix(&target_path).unwrap_or(dir);
            directories_created.push(relative.to_string_lossy().to_string());
        }
    }

    let yaml = serde_yaml::to_string(&config).context("Failed to serialize default config")?;
    fs::write(&config_path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    let agents_written = write_builtin_agents(&agents_dir, config.rag.top_k, args.force).await?;

    let db_path = target_path.join(&config.database.path);
    let db_url = format!("sqlite:{}", db_path.display());
    let pool = initialize_database(&db_url, None)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;

    let output_data = InitOutput {
        success: true,
        message: if args.force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        initialized_path: target_path,
        directories_created,
        config_written: true,
        agents_written,
        database_initialized: true,
    };
    output(&output_data, json_mode);
    Ok(())
}

/// Write one `<agents_dir>/<name>/config.yaml` per built-in agent, leaving
/// existing files alone unless `overwrite` is set.
async fn write_builtin_agents(agents_dir: &Path, rag_top_k: usize, overwrite: bool) -> Result<usize> {
    let mut count = 0;
    for mut config in builtin_configs() {
        if config.use_rag {
            config.rag_top_k = rag_top_k;
        }
        let dir = agents_dir.join(&config.name);
        let file_path = dir.join("config.yaml");
        if file_path.exists() && !overwrite {
            continue;
        }
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let yaml = config.to_yaml()?;
        fs::write(&file_path, yaml)
            .await
            .with_context(|| format!("Failed to write agent config {}", file_path.display()))?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AgentConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init_creates_layout() {
        let dir = TempDir::new().unwrap();
        let args = InitArgs {
            force: false,
            path: dir.path().to_path_buf(),
        };
        execute(args, true).await.unwrap();

        let root = dir.path();
        assert!(root.join(".aide/config.yaml").is_file());
        assert!(root.join(".aide/aide.db").is_file());
        assert!(root.join(".aide/workspaces/default").is_dir());

        let general = AgentConfig::from_dir(root.join(".aide/agents/general")).unwrap();
        assert_eq!(general.name, "general");
        let data = AgentConfig::from_dir(root.join(".aide/agents/data")).unwrap();
        assert_eq!(data.class, "data_query");
    }

    #[tokio::test]
    async fn test_builtin_agents_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let agents = dir.path().join("agents");
        assert_eq!(write_builtin_agents(&agents, 5, false).await.unwrap(), 9);

        std::fs::write(agents.join("general/config.yaml"), "name: general\ntemperature: 0.9\n").unwrap();
        assert_eq!(write_builtin_agents(&agents, 5, false).await.unwrap(), 0);
        let general = AgentConfig::from_dir(agents.join("general")).unwrap();
        assert!((general.temperature - 0.9).abs() < f32::EPSILON);

        assert_eq!(write_builtin_agents(&agents, 3, true).await.unwrap(), 9);
        let rag = AgentConfig::from_dir(agents.join("rag")).unwrap();
        assert_eq!(rag.rag_top_k, 3);
    }
}
