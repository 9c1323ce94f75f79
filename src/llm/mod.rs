pub mod enhance;
pub mod providers;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EnhancementConfig;

/// LLM provider types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum LlmProvider {
    LmStudio,
    OpenAi,
}

/// Connection settings for one LLM provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl From<&EnhancementConfig> for LlmConfig {
    fn from(config: &EnhancementConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
        }
    }
}

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Trait for LLM providers
#[async_trait]
pub trait Llm: Send + Sync {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LlmResponse>;
    async fn is_available(&self) -> bool;
    fn provider_type(&self) -> LlmProvider;
}

/// Create LLM instance based on configuration
pub fn create_llm(config: &LlmConfig) -> Result<Box<dyn Llm>> {
    match config.provider {
        LlmProvider::LmStudio => Ok(Box::new(providers::LmStudioProvider::new(config.clone())?)),
        LlmProvider::OpenAi => Ok(Box::new(providers::OpenAiProvider::new(config.clone())?)),
    }
}
