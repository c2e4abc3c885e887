//! LLM provider adapters.

mod http;

pub mod anthropic;
pub mod huggingface;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod registry;

pub use anthropic::{AnthropicConfig, AnthropicProvider};
pub use huggingface::{HuggingFaceConfig, HuggingFaceProvider};
pub use mock::{MockCall, MockLlmProvider};
pub use ollama::{OllamaConfig, OllamaProvider};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use registry::ProviderRegistry;
