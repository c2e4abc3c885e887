//! Agent configuration loading.
//!
//! Each agent lives in its own directory under the agents root:
//!
//! ```text
//! agents/
//!   code/
//!     config.yaml   # AgentConfig fields
//!     prompt.md     # optional system prompt, used when config has none
//! ```
//!
//! Configurations are read-only after load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::llm::{LlmRequestConfig, ResponseFormat};

/// File names probed inside an agent directory.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["config.yaml", "config.yml"];

/// Optional system prompt file inside an agent directory.
pub const PROMPT_FILE_NAME: &str = "prompt.md";

/// Static per-agent settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawAgentConfig")]
pub struct AgentConfig {
    pub name: String,
    pub description: String,

    /// Agent implementation to instantiate (e.g. "code", "rag")
    pub class: String,

    /// Model name; `None` falls back to the global LLM default
    pub model: Option<String>,

    /// Provider name; `None` falls back to the global LLM default
    pub provider: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Endpoint override (`llm_url` in YAML is accepted as an alias)
    pub base_url: Option<String>,

    pub max_tokens: u32,
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout: u64,

    pub response_format: ResponseFormat,
    pub use_rag: bool,
    pub rag_top_k: usize,

    pub system_prompt: Option<String>,
}

pub const DEFAULT_MAX_TOKENS: u32 = 10_000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RAG_TOP_K: usize = 5;

/// Wire shape of `config.yaml`, before alias resolution.
#[derive(Debug, Deserialize)]
struct RawAgentConfig {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    provider: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    llm_url: Option<String>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    timeout: Option<u64>,
    #[serde(default)]
    response_format: Option<serde_yaml::Value>,
    #[serde(default)]
    use_rag: Option<bool>,
    #[serde(default)]
    rag_top_k: Option<usize>,
    #[serde(default)]
    system_prompt: Option<String>,
}

impl From<RawAgentConfig> for AgentConfig {
    fn from(raw: RawAgentConfig) -> Self {
        let class = raw
            .class
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| raw.name.clone());

        Self {
            name: raw.name,
            description: raw.description,
            class,
            model: non_empty(raw.model),
            provider: non_empty(raw.provider),
            api_key: non_empty(raw.api_key),
            base_url: non_empty(raw.llm_url).or_else(|| non_empty(raw.base_url)),
            max_tokens: raw.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: raw.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            timeout: raw.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS),
            response_format: raw
                .response_format
                .as_ref()
                .map(parse_response_format)
                .unwrap_or_default(),
            use_rag: raw.use_rag.unwrap_or(false),
            rag_top_k: raw.rag_top_k.unwrap_or(DEFAULT_RAG_TOP_K),
            system_prompt: non_empty(raw.system_prompt),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accepts `json`, `json_object`, or `{type: json_object}`.
fn parse_response_format(value: &serde_yaml::Value) -> ResponseFormat {
    let kind = match value {
        serde_yaml::Value::String(s) => Some(s.as_str()),
        serde_yaml::Value::Mapping(map) => map.get("type").and_then(serde_yaml::Value::as_str),
        _ => None,
    };
    match kind.map(str::to_lowercase).as_deref() {
        Some("json" | "json_object") => ResponseFormat::JsonObject,
        _ => ResponseFormat::Text,
    }
}

impl AgentConfig {
    /// Minimal config for a named agent with every default applied.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        RawAgentConfig {
            name,
            description: String::new(),
            class: None,
            model: None,
            provider: None,
            api_key: None,
            base_url: None,
            llm_url: None,
            max_tokens: None,
            temperature: None,
            timeout: None,
            response_format: None,
            use_rag: None,
            rag_top_k: None,
            system_prompt: None,
        }
        .into()
    }

    /// Parse a YAML document.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse agent config YAML")
    }

    /// Load a single YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read agent config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid agent config {}", path.display()))
    }

    /// Load an agent directory (`config.yaml` plus optional `prompt.md`).
    ///
    /// A missing `name` is taken from the directory name.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let config_path = CONFIG_FILE_NAMES
            .iter()
            .map(|f| dir.join(f))
            .find(|p| p.is_file())
            .with_context(|| format!("No config.yaml in agent directory {}", dir.display()))?;

        let mut config = Self::from_file(&config_path)?;

        if config.name.is_empty() {
            config.name = dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            if config.class.is_empty() {
                config.class.clone_from(&config.name);
            }
        }

        if config.system_prompt.is_none() {
            let prompt_path = dir.join(PROMPT_FILE_NAME);
            if prompt_path.is_file() {
                let prompt = std::fs::read_to_string(&prompt_path)
                    .with_context(|| format!("Failed to read {}", prompt_path.display()))?;
                config.system_prompt = non_empty(Some(prompt));
            }
        }

        Ok(config)
    }

    /// Serialize for writing a `config.yaml`.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize agent config")
    }

    /// The configured system prompt or the agent's built-in one.
    pub fn resolved_system_prompt<'a>(&'a self, builtin: &'a str) -> &'a str {
        self.system_prompt.as_deref().unwrap_or(builtin)
    }

    /// Generation parameters, filling the model from `default_model`.
    pub fn request_config(&self, default_model: &str) -> LlmRequestConfig {
        LlmRequestConfig {
            model: self.model.clone().unwrap_or_else(|| default_model.to_string()),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout_secs: self.timeout,
            response_format: self.response_format,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = class.into();
        self
    }

    pub fn with_rag(mut self, top_k: usize) -> Self {
        self.use_rag = true;
        self.rag_top_k = top_k;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_llm_url_sets_base_url() {
        let config = AgentConfig::from_yaml(
            "name: code\nllm_url: http://gpu-box:8080\nmodel: qwen2.5-coder\n",
        )
        .unwrap();
        assert_eq!(config.base_url.as_deref(), Some("http://gpu-box:8080"));
    }

    #[test]
    fn test_defaults_applied() {
        let config = AgentConfig::from_yaml("name: general\n").unwrap();
        assert_eq!(config.max_tokens, 10_000);
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.timeout, 120);
        assert!(!config.use_rag);
        assert_eq!(config.rag_top_k, 5);
        assert_eq!(config.class, "general");
        assert_eq!(config.response_format, ResponseFormat::Text);
        assert!(config.base_url.is_none());
    }

    #[test]
    fn test_full_schema() {
        let yaml = r"
name: meeting
description: Extracts structure from meeting notes
class: meeting
model: gpt-4o-mini
provider: openai
api_key: sk-test
base_url: https://api.openai.com/v1
max_tokens: 2000
temperature: 0.2
timeout: 30
response_format: json
use_rag: true
rag_top_k: 3
system_prompt: You extract meetings.
";
        let config = AgentConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.provider.as_deref(), Some("openai"));
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.timeout, 30);
        assert_eq!(config.response_format, ResponseFormat::JsonObject);
        assert!(config.use_rag);
        assert_eq!(config.rag_top_k, 3);
        assert_eq!(config.resolved_system_prompt("builtin"), "You extract meetings.");
    }

    #[test]
    fn test_response_format_mapping_form() {
        let config = AgentConfig::from_yaml("name: x\nresponse_format:\n  type: json_object\n").unwrap();
        assert_eq!(config.response_format, ResponseFormat::JsonObject);
    }

    #[test]
    fn test_request_config_uses_default_model() {
        let config = AgentConfig::new("general");
        let request = config.request_config("llama3.1");
        assert_eq!(request.model, "llama3.1");
        assert_eq!(request.max_tokens, 10_000);
    }

    #[test]
    fn test_from_dir_reads_prompt_and_infers_name() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("code");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.yaml"), "temperature: 0.1\n").unwrap();
        std::fs::write(dir.join("prompt.md"), "You review Rust code.").unwrap();

        let config = AgentConfig::from_dir(&dir).unwrap();
        assert_eq!(config.name, "code");
        assert_eq!(config.class, "code");
        assert_eq!(config.system_prompt.as_deref(), Some("You review Rust code."));
    }

    #[test]
    fn test_from_dir_missing_config() {
        let temp = TempDir::new().unwrap();
        assert!(AgentConfig::from_dir(temp.path()).is_err());
    }

    #[test]
    fn test_yaml_round_trip_preserves_base_url() {
        let config = AgentConfig::from_yaml("name: rag\nllm_url: http://localhost:11434\n").unwrap();
        let yaml = config.to_yaml().unwrap();
        let reparsed = AgentConfig::from_yaml(&yaml).unwrap();
        assert_eq!(reparsed, config);
    }
}
