use super::{ChatMessage, Llm, LlmConfig, LlmProvider, LlmResponse};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// LMStudio provider implementation
pub struct LmStudioProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct LmStudioRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct LmStudioResponse {
    choices: Vec<LmStudioChoice>,
    usage: Option<LmStudioUsage>,
}

#[derive(Debug, Deserialize)]
struct LmStudioChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct LmStudioUsage {
    total_tokens: u32,
}

impl LmStudioProvider {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Llm for LmStudioProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LlmResponse> {
        let endpoint = self
            .config
            .endpoint
            .as_ref()
            .ok_or_else(|| anyhow!("LMStudio endpoint not configured"))?;

        let request = LmStudioRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!("Sending request to LMStudio at {}", endpoint);

        let response = self.client.post(endpoint).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("LMStudio API error {}: {}", status, text));
        }

        let llm_response: LmStudioResponse = response.json().await?;

        let content = llm_response
            .choices
            .first()
            .ok_or_else(|| anyhow!("No response from LMStudio"))?
            .message
            .content
            .clone();

        let tokens_used = llm_response.usage.map(|u| u.total_tokens);

        Ok(LlmResponse {
            content,
            tokens_used,
        })
    }

    async fn is_available(&self) -> bool {
        let endpoint = match &self.config.endpoint {
            Some(ep) => ep,
            None => return false,
        };

        let health_endpoint = endpoint.replace("/v1/chat/completions", "/health");

        match self.client.get(&health_endpoint).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LlmProvider {
        LlmProvider::LmStudio
    }
}

/// OpenAI provider implementation
pub struct OpenAiProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    total_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("OpenAI API key required"));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Llm for OpenAiProvider {
    async fn chat(&self, messages: Vec<ChatMessage>) -> Result<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("OpenAI API key not configured"))?;

        let request = OpenAiRequest {
            model: self.config.model.clone(),
            messages,
            max_completion_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let url = "https://api.openai.com/v1/chat/completions";

        debug!("Sending request to OpenAI API");

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error {}: {}", status, text));
        }

        let openai_response: OpenAiResponse = response.json().await?;

        let content = openai_response
            .choices
            .first()
            .ok_or_else(|| anyhow!("No response from OpenAI"))?
            .message
            .content
            .clone();

        let tokens_used = openai_response.usage.map(|u| u.total_tokens);

        Ok(LlmResponse {
            content,
            tokens_used,
        })
    }

    async fn is_available(&self) -> bool {
        if let Some(api_key) = &self.config.api_key {
            let url = "https://api.openai.com/v1/models";

            match self
                .client
                .get(url)
                .header("Authorization", format!("Bearer {}", api_key))
                .send()
                .await
            {
                Ok(response) => response.status().is_success(),
                Err(_) => false,
            }
        } else {
            false
        }
    }

    fn provider_type(&self) -> LlmProvider {
        LlmProvider::OpenAi
    }
}
