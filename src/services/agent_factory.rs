//! Agent construction from per-directory configs.
//!
//! Configs are read from `<agents_dir>/<name>/config.yaml` on first use and
//! cached by name. Names without a directory fall back to the built-in
//! config of the same name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::agents::{
    Agent, AgentCore, AgentError, CodeAgent, DataQueryAgent, GeneralAgent, MeetingAgent, NoteParserAgent,
    RagAgent, TaggingAgent, TaskAgent,
};
use super::classifier::QueryClassifier;
use super::rag_service::RagService;
use super::router::AgentRouter;
use crate::adapters::llm::ProviderRegistry;
use crate::domain::models::agent_config::CONFIG_FILE_NAMES;
use crate::domain::models::{AgentConfig, ResponseFormat, RouterConfig};
use crate::domain::ports::{TaskTaggingTools, TodoRepository};

/// Agents shipped with the binary, in display order.
pub const BUILTIN_AGENTS: [&str; 9] = [
    "classifier",
    "general",
    "code",
    "task",
    "rag",
    "meeting",
    "note_parser",
    "data",
    "tagging",
];

/// Built-in config for `name`, if it is one of [`BUILTIN_AGENTS`].
pub fn builtin_config(name: &str) -> Option<AgentConfig> {
    let config = AgentConfig::new(name);
    let config = match name {
        "classifier" => {
            let mut c = config.with_description("Classifies queries into intents");
            c.temperature = 0.1;
            c.max_tokens = 500;
            c.response_format = ResponseFormat::JsonObject;
            c
        }
        "general" => config.with_description("General conversation and fallback"),
        "code" => {
            let mut c = config.with_description("Programming help and code review");
            c.temperature = 0.2;
            c
        }
        "task" => {
            let mut c = config.with_description("Breaks goals into actionable tasks");
            c.response_format = ResponseFormat::JsonObject;
            c
        }
        "rag" => config
            .with_description("Answers questions from indexed documents")
            .with_rag(5),
        "meeting" => {
            let mut c = config.with_description("Structures meeting notes");
            c.temperature = 0.2;
            c.response_format = ResponseFormat::JsonObject;
            c
        }
        "note_parser" => {
            let mut c = config.with_description("Extracts todos, people and projects from notes");
            c.temperature = 0.2;
            c.response_format = ResponseFormat::JsonObject;
            c
        }
        "data" => config
            .with_class("data_query")
            .with_description("Answers questions about stored todos"),
        "tagging" => {
            let mut c = config.with_description("Suggests and applies todo tags");
            c.temperature = 0.2;
            c
        }
        _ => return None,
    };
    Some(config)
}

pub fn builtin_configs() -> Vec<AgentConfig> {
    BUILTIN_AGENTS.iter().filter_map(|name| builtin_config(name)).collect()
}

pub struct AgentFactory {
    agents_dir: PathBuf,
    registry: Arc<ProviderRegistry>,
    rag: Option<Arc<RagService>>,
    todos: Option<Arc<dyn TodoRepository>>,
    tagging_tools: Option<Arc<dyn TaskTaggingTools>>,
    rag_top_k: Option<usize>,
    configs: RwLock<HashMap<String, AgentConfig>>,
}

impl AgentFactory {
    pub fn new(agents_dir: impl Into<PathBuf>, registry: Arc<ProviderRegistry>) -> Self {
        Self {
            agents_dir: agents_dir.into(),
            registry,
            rag: None,
            todos: None,
            tagging_tools: None,
            rag_top_k: None,
            configs: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_rag(mut self, rag: Arc<RagService>) -> Self {
        self.rag = Some(rag);
        self
    }

    pub fn with_todos(mut self, todos: Arc<dyn TodoRepository>) -> Self {
        self.todos = Some(todos);
        self
    }

    pub fn with_tagging_tools(mut self, tools: Arc<dyn TaskTaggingTools>) -> Self {
        self.tagging_tools = Some(tools);
        self
    }

    /// Retrieval depth for built-in agents that use RAG. Directory configs keep their own value.
    pub fn with_rag_top_k(mut self, top_k: usize) -> Self {
        self.rag_top_k = Some(top_k);
        self
    }

    pub fn agents_dir(&self) -> &Path {
        &self.agents_dir
    }

    /// Config for `name`, loaded once and cached.
    pub async fn config(&self, name: &str) -> Result<AgentConfig, AgentError> {
        if let Some(config) = self.configs.read().await.get(name) {
            return Ok(config.clone());
        }

        let mut configs = self.configs.write().await;
        if let Some(config) = configs.get(name) {
            return Ok(config.clone());
        }
        let config = self.load_config(name)?;
        configs.insert(name.to_string(), config.clone());
        Ok(config)
    }

    fn load_config(&self, name: &str) -> Result<AgentConfig, AgentError> {
        let dir = self.agents_dir.join(name);
        if has_config(&dir) {
            debug!(agent = %name, dir = %dir.display(), "loading agent config");
            let mut config =
                AgentConfig::from_dir(&dir).map_err(|e| AgentError::Configuration(format!("{e:#}")))?;
            // The directory name is the registered name.
            config.name = name.to_string();
            return Ok(config);
        }
        let mut config = builtin_config(name).ok_or_else(|| AgentError::NotFound(name.to_string()))?;
        if let (true, Some(top_k)) = (config.use_rag, self.rag_top_k) {
            config.rag_top_k = top_k;
        }
        Ok(config)
    }

    /// Every agent on disk plus built-ins without a directory, sorted by name.
    pub async fn list_configs(&self) -> Result<Vec<AgentConfig>, AgentError> {
        let mut names: Vec<String> = BUILTIN_AGENTS.iter().map(|n| (*n).to_string()).collect();
        if let Ok(entries) = std::fs::read_dir(&self.agents_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if has_config(&path) {
                    names.push(entry.file_name().to_string_lossy().to_string());
                }
            }
        }
        names.sort();
        names.dedup();

        let mut configs = Vec::with_capacity(names.len());
        for name in names {
            configs.push(self.config(&name).await?);
        }
        Ok(configs)
    }

    async fn core(&self, config: AgentConfig) -> Result<AgentCore, AgentError> {
        let llm = self.registry.for_agent(&config).await?;
        let core = AgentCore::new(config, llm, self.registry.default_model());
        Ok(match &self.rag {
            Some(rag) => core.with_rag(Arc::clone(rag)),
            None => core,
        })
    }

    /// Instantiate the agent registered as `name`, dispatching on its class.
    pub async fn create(&self, name: &str) -> Result<Arc<dyn Agent>, AgentError> {
        let config = self.config(name).await?;
        let class = config.class.to_lowercase();
        let core = self.core(config).await?;

        let agent: Arc<dyn Agent> = match class.as_str() {
            "general" => Arc::new(GeneralAgent::new(core)),
            "code" => Arc::new(CodeAgent::new(core)),
            "task" => Arc::new(TaskAgent::new(core)),
            "rag" => Arc::new(RagAgent::new(core)),
            "meeting" => Arc::new(MeetingAgent::new(core)),
            "note_parser" => Arc::new(NoteParserAgent::new(core)),
            "data_query" | "data" => {
                let todos = self.todos.clone().ok_or_else(|| {
                    AgentError::Configuration(format!("agent '{name}' needs a todo repository"))
                })?;
                Arc::new(DataQueryAgent::new(core, todos))
            }
            "tagging" => {
                let tools = self.tagging_tools.clone().ok_or_else(|| {
                    AgentError::Configuration(format!("agent '{name}' needs tagging tools"))
                })?;
                Arc::new(TaggingAgent::new(core, tools))
            }
            "classifier" => {
                return Err(AgentError::Configuration(format!(
                    "agent '{name}' is a classifier and cannot be routed to"
                )))
            }
            other => {
                return Err(AgentError::Configuration(format!(
                    "agent '{name}' has unknown class '{other}'"
                )))
            }
        };
        Ok(agent)
    }

    pub async fn create_classifier(&self, name: &str) -> Result<QueryClassifier, AgentError> {
        let config = self.config(name).await?;
        Ok(QueryClassifier::new(self.core(config).await?))
    }

    /// Router with every agent the intent map references.
    ///
    /// Agents that fail to build are skipped with a warning; the default
    /// agent must build.
    pub async fn build_router(&self, config: &RouterConfig) -> Result<AgentRouter, AgentError> {
        let classifier = self.create_classifier(&config.classifier_agent).await?;
        let mut router = AgentRouter::from_config(classifier, config);

        for name in router.required_agents() {
            match self.create(&name).await {
                Ok(agent) => router.register(agent),
                Err(e) if name == config.default_agent => return Err(e),
                Err(e) => warn!(agent = %name, error = %e, "agent unavailable, intent will use the default agent"),
            }
        }
        Ok(router)
    }
}

fn has_config(dir: &Path) -> bool {
    CONFIG_FILE_NAMES.iter().any(|f| dir.join(f).is_file())
}
