//! `aide config` commands.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::cli::display::{action_success, output, CommandOutput};
use crate::cli::load_config;
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::logging::mask_secret;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration (API keys masked)
    Show,
    /// Print one value by dotted key, e.g. `rag.chunk_size`
    Get { key: String },
    /// Set a value in the project config file
    Set { key: String, value: String },
    /// Print the config file location
    Path,
}

#[derive(Debug, Serialize)]
struct ConfigView {
    config: serde_json::Value,
}

impl CommandOutput for ConfigView {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }

    fn to_json(&self) -> serde_json::Value {
        self.config.clone()
    }
}

#[derive(Debug, Serialize)]
struct ValueOutput {
    key: String,
    value: serde_json::Value,
}

impl CommandOutput for ValueOutput {
    fn to_human(&self) -> String {
        match &self.value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => serde_yaml::to_string(other).unwrap_or_default().trim_end().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SetOutput {
    success: bool,
    key: String,
    value: serde_json::Value,
    file: PathBuf,
}

impl CommandOutput for SetOutput {
    fn to_human(&self) -> String {
        action_success(&format!("Set {} = {} in {}", self.key, self.value, self.file.display()))
    }
}

#[derive(Debug, Serialize)]
struct PathOutput {
    path: PathBuf,
    exists: bool,
}

impl CommandOutput for PathOutput {
    fn to_human(&self) -> String {
        if self.exists {
            self.path.display().to_string()
        } else {
            format!("{} (not created yet, run `aide init`)", self.path.display())
        }
    }
}

pub fn execute(args: ConfigArgs, config_path: Option<&Path>, json_mode: bool) -> Result<()> {
    let file = config_path.map_or_else(|| ConfigLoader::config_path(Path::new(".")), Path::to_path_buf);

    match args.command {
        ConfigCommands::Show => {
            let config = load_config(config_path)?;
            output(&ConfigView { config: masked(&config)? }, json_mode);
        }
        ConfigCommands::Get { key } => {
            let config = load_config(config_path)?;
            let value = ConfigLoader::get_value(&config, &key)
                .with_context(|| format!("Unknown config key '{key}'"))?;
            let value = if is_secret_key(&key) {
                value.as_str().map_or(value.clone(), |s| serde_json::Value::String(mask_secret(s)))
            } else {
                value
            };
            output(&ValueOutput { key, value }, json_mode);
        }
        ConfigCommands::Set { key, value } => {
            let config = ConfigLoader::set_value(&file, &key, &value)?;
            let value = ConfigLoader::get_value(&config, &key).unwrap_or(serde_json::Value::Null);
            output(
                &SetOutput {
                    success: true,
                    key,
                    value,
                    file,
                },
                json_mode,
            );
        }
        ConfigCommands::Path => {
            let exists = file.is_file();
            output(&PathOutput { path: file, exists }, json_mode);
        }
    }
    Ok(())
}

fn is_secret_key(key: &str) -> bool {
    key.ends_with("api_key")
}

/// The config as JSON with every `api_key` masked.
fn masked(config: &Config) -> Result<serde_json::Value> {
    let mut value = serde_json::to_value(config).context("Failed to serialize config")?;
    for pointer in ["/llm/api_key", "/rag/embedding/api_key"] {
        if let Some(slot) = value.pointer_mut(pointer) {
            if let Some(secret) = slot.as_str() {
                *slot = serde_json::Value::String(mask_secret(secret));
            }
        }
    }
    Ok(value)
}
