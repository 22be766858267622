//! LLM chat-completion client.
//!
//! The pipeline talks to the model through [`LlmClient`] only; the
//! production implementation targets an Azure OpenAI-style deployment
//! endpoint, and tests substitute a scripted client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// The role of the message author (`system` or `user` here).
    pub role: String,

    /// The content of the message.
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Response-format constraint sent with every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
        }
    }
}

/// A chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    pub response_format: ResponseFormat,
}

/// A chat completion response (OpenAI format; extra fields ignored).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response was not parseable: {0}")]
    InvalidResponse(String),
}

/// Chat-completion seam the pipeline depends on.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError>;
}

/// Endpoint configuration for the production client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
}

impl LlmConfig {
    /// Read from `LLM_ENDPOINT` / `LLM_API_KEY` / `LLM_DEPLOYMENT` /
    /// `LLM_API_VERSION`. Returns `None` unless endpoint, key, and
    /// deployment are all present.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("LLM_ENDPOINT").ok()?;
        let api_key = std::env::var("LLM_API_KEY").ok()?;
        let deployment = std::env::var("LLM_DEPLOYMENT").ok()?;
        let api_version =
            std::env::var("LLM_API_VERSION").unwrap_or_else(|_| "2024-02-01".to_string());
        Some(Self {
            endpoint,
            api_key,
            deployment,
            api_version,
        })
    }
}

/// Client for an Azure OpenAI-style chat-completions deployment.
pub struct AzureOpenAiClient {
    config: LlmConfig,
    http: reqwest::Client,
}

impl AzureOpenAiClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn completions_url(&self) -> String {
        let base = self.config.endpoint.trim_end_matches('/');
        format!(
            "{base}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.deployment, self.config.api_version
        )
    }
}

#[async_trait]
impl LlmClient for AzureOpenAiClient {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        debug!(
            deployment = %self.config.deployment,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        let response = self
            .http
            .post(self.completions_url())
            .header("api-key", &self.config.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}
