//! Chat-completion client. Speaks the OpenAI-compatible
//! `/v1/chat/completions` shape so local runtimes (Ollama, llama.cpp) and
//! hosted providers work through one code path.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use coplan_core::config::LlmConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion request timed out")]
    Timeout,
    #[error("provider rate limit hit")]
    RateLimited,
    #[error("provider rejected credentials")]
    Auth,
    #[error("provider returned status {status}")]
    Upstream { status: u16 },
    #[error("provider returned an empty completion")]
    EmptyCompletion,
    #[error("transport failure: {0}")]
    Transport(String),
}

#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub prompt: String,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}

pub struct HttpLlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl HttpLlmClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|error| LlmError::Transport(error.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": &request.system_prompt},
                {"role": "user", "content": &request.prompt}
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let mut builder =
            self.http.post(format!("{}/v1/chat/completions", self.base_url)).json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(map_transport_error)?;
        classify_status(response.status().as_u16())?;

        let parsed: ChatResponse =
            response.json().await.map_err(map_transport_error)?;
        extract_content(parsed)
    }
}

fn map_transport_error(error: reqwest::Error) -> LlmError {
    if error.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Transport(error.to_string())
    }
}

fn classify_status(status: u16) -> Result<(), LlmError> {
    match status {
        200..=299 => Ok(()),
        429 => Err(LlmError::RateLimited),
        401 | 403 => Err(LlmError::Auth),
        other => Err(LlmError::Upstream { status: other }),
    }
}

fn extract_content(response: ChatResponse) -> Result<String, LlmError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(LlmError::EmptyCompletion);
    }
    Ok(trimmed.to_string())
}
