use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::chunking::ChunkingConfig;

/// Main configuration structure for Aide
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Directory holding one sub-directory per agent
    #[serde(default = "default_agents_dir")]
    pub agents_dir: String,

    /// Directory holding one sub-directory per workspace
    #[serde(default = "default_workspaces_dir")]
    pub workspaces_dir: String,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Defaults for agents that leave provider settings unset
    #[serde(default)]
    pub llm: LlmConfig,

    /// Retrieval configuration
    #[serde(default)]
    pub rag: RagConfig,

    /// Intent routing configuration
    #[serde(default)]
    pub router: RouterConfig,
}

fn default_agents_dir() -> String {
    ".aide/agents".to_string()
}

fn default_workspaces_dir() -> String {
    ".aide/workspaces".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            agents_dir: default_agents_dir(),
            workspaces_dir: default_workspaces_dir(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            llm: LlmConfig::default(),
            rag: RagConfig::default(),
            router: RouterConfig::default(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".aide/aide.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rotated log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Number of days to retain logs
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            retention_days: default_retention_days(),
        }
    }
}

/// Provider names understood by the provider registry.
pub const KNOWN_PROVIDERS: [&str; 5] = ["huggingface", "openai", "anthropic", "ollama", "mock"];

/// Global LLM defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LlmConfig {
    /// One of: huggingface, openai, anthropic, ollama
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Endpoint override; provider default when unset
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key; provider-specific env var when unset
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_model() -> String {
    "llama3.1".to_string()
}

const fn default_timeout_secs() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RagConfig {
    /// Maximum chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Results scoring below this are dropped
    #[serde(default)]
    pub min_score: f32,

    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

const fn default_chunk_size() -> usize {
    1000
}

const fn default_chunk_overlap() -> usize {
    200
}

const fn default_top_k() -> usize {
    5
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            min_score: 0.0,
            embedding: EmbeddingConfig::default(),
        }
    }
}

impl RagConfig {
    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig::new(self.chunk_size, self.chunk_overlap)
    }
}

/// Embedding provider names understood by the factory.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 3] = ["hashing", "openai", "ollama"];

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    /// One of: hashing (offline), openai, ollama
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_dimension")]
    pub dimension: usize,
}

fn default_embedding_provider() -> String {
    "hashing".to_string()
}

const fn default_dimension() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            base_url: None,
            api_key: None,
            dimension: default_dimension(),
        }
    }
}

/// Intent routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RouterConfig {
    /// Classifications below this confidence go to the default agent
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,

    #[serde(default = "default_agent")]
    pub default_agent: String,

    /// Agent used by the classifier itself
    #[serde(default = "default_classifier_agent")]
    pub classifier_agent: String,

    /// Intent name to agent name overrides
    #[serde(default)]
    pub intent_agents: HashMap<String, String>,
}

const fn default_confidence_threshold() -> f64 {
    0.3
}

fn default_agent() -> String {
    "general".to_string()
}

fn default_classifier_agent() -> String {
    "classifier".to_string()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            default_agent: default_agent(),
            classifier_agent: default_classifier_agent(),
            intent_agents: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.database.path, ".aide/aide.db");
        assert_eq!(config.database.url(), "sqlite:.aide/aide.db");
        assert_eq!(config.rag.chunk_size, 1000);
        assert_eq!(config.router.default_agent, "general");
        assert!((config.router.confidence_threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.rag.embedding.provider, "hashing");
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str("llm:\n  provider: openai\n").unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model, "llama3.1");
        assert_eq!(config.rag.top_k, 5);
    }

    #[test]
    fn test_rag_chunking() {
        let rag = RagConfig {
            chunk_size: 300,
            chunk_overlap: 30,
            ..Default::default()
        };
        let chunking = rag.chunking();
        assert_eq!(chunking.chunk_size, 300);
        assert_eq!(chunking.chunk_overlap, 30);
    }
}
