//! mockexam-providers: LLM provider integrations and the exam services built on them.
//!
//! Implements the `LlmProvider` trait for Anthropic, OpenAI, and Ollama, and
//! the generation, essay grading and feedback services on top of any provider.

pub mod anthropic;
pub mod config;
mod http;
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod services;

pub use config::{create_provider, load_config, load_config_from, MockexamConfig, ProviderConfig};
pub use mockexam_core::error::ProviderError;
pub use services::LlmExamServices;
