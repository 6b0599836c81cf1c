//! Groq API client for news analysis
//!
//! Thin wrapper over the chat-completions endpoint; the analyzer owns the
//! prompt and the parsing of whatever comes back.

use crate::config::LlmConfig;
use crate::error::{BuzzError, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Per-call deadline; analysis calls are small and must stay short
const CALL_TIMEOUT_SECS: u64 = 10;

/// Groq API client configuration
#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl GroqConfig {
    pub fn from_llm_config(cfg: &LlmConfig) -> Option<Self> {
        cfg.api_key.as_ref().map(|key| Self {
            api_key: key.clone(),
            base_url: cfg.base_url.clone(),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
        })
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Groq API client
#[derive(Clone)]
pub struct GroqClient {
    config: GroqConfig,
    http: Client,
}

impl GroqClient {
    pub fn new(config: GroqConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(CALL_TIMEOUT_SECS))
            .build()
            .map_err(BuzzError::Http)?;
        Ok(Self { config, http })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a single-message completion and return the raw response text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(BuzzError::Http)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(BuzzError::RateLimited("Groq: HTTP 429".into()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            warn!("Groq API error: {} - {}", status, snippet);
            return Err(BuzzError::Provider {
                status: status.as_u16(),
                body: snippet,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BuzzError::Parse(format!("Groq response: {e}")))?;
        let content = parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();
        debug!("Groq response received: {} chars", content.len());
        Ok(content)
    }
}
