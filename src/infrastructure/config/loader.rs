use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::models::config::{Config, KNOWN_EMBEDDING_PROVIDERS, KNOWN_PROVIDERS};

/// Project directory holding config, agents and the database.
pub const PROJECT_DIR: &str = ".aide";

/// Primary config file, created by `aide init`.
pub const CONFIG_FILE: &str = "config.yaml";

/// Optional local overrides, never written by the CLI.
pub const LOCAL_CONFIG_FILE: &str = "local.yaml";

/// Prefix for environment overrides; `__` separates nested keys.
pub const ENV_PREFIX: &str = "AIDE_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid chunking: chunk_overlap ({overlap}) must be less than chunk_size ({size}) and chunk_size must be positive")]
    InvalidChunking { size: usize, overlap: usize },

    #[error("Invalid top_k: {0}. Must be at least 1")]
    InvalidTopK(usize),

    #[error("Invalid confidence_threshold: {0}. Must be between 0.0 and 1.0")]
    InvalidConfidenceThreshold(f64),

    #[error("Unknown LLM provider: {0}. Must be one of: {known}", known = KNOWN_PROVIDERS.join(", "))]
    UnknownProvider(String),

    #[error("Unknown embedding provider: {0}. Must be one of: {known}", known = KNOWN_EMBEDDING_PROVIDERS.join(", "))]
    UnknownEmbeddingProvider(String),

    #[error("Invalid embedding dimension: {0}. Must be at least 1")]
    InvalidDimension(usize),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .aide/config.yaml (project config, created by init)
    /// 3. .aide/local.yaml (project local overrides, optional)
    /// 4. Environment variables (AIDE_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        Self::load_from_root(Path::new("."))
    }

    /// Same as [`load`](Self::load) with `.aide/` resolved under `root`.
    pub fn load_from_root(root: &Path) -> Result<Config> {
        let project = root.join(PROJECT_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(project.join(CONFIG_FILE)))
            .merge(Yaml::file(project.join(LOCAL_CONFIG_FILE)))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file; env overrides still apply.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Path of the project config file under `root`.
    pub fn config_path(root: &Path) -> PathBuf {
        root.join(PROJECT_DIR).join(CONFIG_FILE)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }

        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if !KNOWN_PROVIDERS.contains(&config.llm.provider.to_lowercase().as_str()) {
            return Err(ConfigError::UnknownProvider(config.llm.provider.clone()));
        }

        let rag = &config.rag;
        if rag.chunking().validate().is_err() {
            return Err(ConfigError::InvalidChunking {
                size: rag.chunk_size,
                overlap: rag.chunk_overlap,
            });
        }

        if rag.top_k == 0 {
            return Err(ConfigError::InvalidTopK(rag.top_k));
        }

        let embedding = &rag.embedding;
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&embedding.provider.to_lowercase().as_str()) {
            return Err(ConfigError::UnknownEmbeddingProvider(embedding.provider.clone()));
        }

        if embedding.dimension == 0 {
            return Err(ConfigError::InvalidDimension(embedding.dimension));
        }

        let threshold = config.router.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidConfidenceThreshold(threshold));
        }

        if config.router.default_agent.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "router.default_agent cannot be empty".to_string(),
            ));
        }

        if config.router.classifier_agent.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "router.classifier_agent cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Value at a dotted key path such as `rag.chunk_size`.
    pub fn get_value(config: &Config, key: &str) -> Option<serde_json::Value> {
        let root = serde_json::to_value(config).ok()?;
        key.split('.')
            .filter(|part| !part.is_empty())
            .try_fold(root, |value, part| value.get(part).cloned())
    }

    /// Set a dotted key in a YAML config file, creating the file and any
    /// intermediate mappings as needed.
    ///
    /// The value is parsed as YAML, so `512`, `true` and `[a, b]` keep their
    /// types. The result must still load and validate, otherwise the file is
    /// left untouched.
    pub fn set_value(path: &Path, key: &str, raw_value: &str) -> Result<Config> {
        let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
        if parts.is_empty() {
            anyhow::bail!("Config key cannot be empty");
        }

        let mut document: serde_yaml::Value = if path.is_file() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_yaml::from_str(&content).with_context(|| format!("Invalid YAML in {}", path.display()))?
        } else {
            serde_yaml::Value::Mapping(serde_yaml::Mapping::new())
        };
        if document.is_null() {
            document = serde_yaml::Value::Mapping(serde_yaml::Mapping::new());
        }

        let value: serde_yaml::Value =
            serde_yaml::from_str(raw_value).unwrap_or_else(|_| serde_yaml::Value::String(raw_value.to_string()));

        let mut cursor = &mut document;
        for part in &parts[..parts.len() - 1] {
            let map = cursor
                .as_mapping_mut()
                .with_context(|| format!("Cannot set '{key}': '{part}' is not a mapping"))?;
            let entry = map
                .entry(serde_yaml::Value::String((*part).to_string()))
                .or_insert_with(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
            cursor = entry;
        }
        let last = parts[parts.len() - 1];
        cursor
            .as_mapping_mut()
            .with_context(|| format!("Cannot set '{key}': parent is not a mapping"))?
            .insert(serde_yaml::Value::String(last.to_string()), value);

        let yaml = serde_yaml::to_string(&document).context("Failed to serialize config")?;
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::string(&yaml))
            .extract()
            .with_context(|| format!("Invalid value for '{key}'"))?;
        Self::validate(&config)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_default_config_is_valid() {
        ConfigLoader::validate(&Config::default()).expect("Default config should be valid");
    }

    #[test]
    fn test_validate_empty_database_path() {
        let mut config = Config::default();
        config.database.path = String::new();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::EmptyDatabasePath
        ));
    }

    #[test]
    fn test_validate_zero_max_connections() {
        let mut config = Config::default();
        config.database.max_connections = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxConnections(0)
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogFormat(_)
        ));
    }

    #[test]
    fn test_validate_overlap_not_below_size() {
        let mut config = Config::default();
        config.rag.chunk_size = 100;
        config.rag.chunk_overlap = 100;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidChunking { size: 100, overlap: 100 }
        ));
    }

    #[test]
    fn test_validate_threshold_range() {
        let mut config = Config::default();
        config.router.confidence_threshold = 1.5;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidConfidenceThreshold(_)
        ));
    }

    #[test]
    fn test_validate_unknown_providers() {
        let mut config = Config::default();
        config.llm.provider = "skynet".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::UnknownProvider(_)
        ));

        let mut config = Config::default();
        config.rag.embedding.provider = "magic".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::UnknownEmbeddingProvider(_)
        ));
    }

    #[test]
    fn test_validate_empty_default_agent() {
        let mut config = Config::default();
        config.router.default_agent = " ".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ValidationFailed(_)
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(base_file, "rag:\n  chunk_size: 800\nlogging:\n  level: info\n  format: json").unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "logging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.logging.level, "debug", "Override should win for nested fields");
        assert_eq!(config.logging.format, "json", "Base value should persist when not overridden");
        assert_eq!(config.rag.chunk_size, 800);
        assert_eq!(config.rag.chunk_overlap, 200);
    }

    #[test]
    fn test_load_from_file_missing() {
        assert!(ConfigLoader::load_from_file("/definitely/not/here.yaml").is_err());
    }

    #[test]
    fn test_get_value() {
        let config = Config::default();
        assert_eq!(ConfigLoader::get_value(&config, "rag.chunk_size"), Some(serde_json::json!(1000)));
        assert_eq!(ConfigLoader::get_value(&config, "router.default_agent"), Some(serde_json::json!("general")));
        assert!(ConfigLoader::get_value(&config, "rag.nope").is_none());
    }

    #[test]
    fn test_set_value_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".aide/config.yaml");

        let config = ConfigLoader::set_value(&path, "rag.chunk_size", "512").unwrap();
        assert_eq!(config.rag.chunk_size, 512);
        ConfigLoader::set_value(&path, "llm.provider", "openai").unwrap();

        let reloaded = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(reloaded.rag.chunk_size, 512);
        assert_eq!(reloaded.llm.provider, "openai");
    }

    #[test]
    fn test_set_value_rejects_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "rag:\n  chunk_size: 300\n").unwrap();

        assert!(ConfigLoader::set_value(&path, "rag.chunk_overlap", "400").is_err());
        let unchanged = std::fs::read_to_string(&path).unwrap();
        assert!(!unchanged.contains("chunk_overlap"));
    }
}
