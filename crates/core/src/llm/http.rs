//! OpenAI-compatible chat completions client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{ChatMessage, ChatModel, ChatResponse, LlmError};
use crate::models::{LlmProvider, ModelConfig};

const AZURE_ENDPOINT_ENV: &str = "AZURE_OPENAI_ENDPOINT";
const AZURE_API_VERSION_ENV: &str = "AZURE_OPENAI_API_VERSION";
const AZURE_DEFAULT_API_VERSION: &str = "2024-06-01";
const MAX_ERROR_BODY_CHARS: usize = 2_000;

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat model backed by an HTTP chat completions endpoint
#[derive(Debug, Clone)]
pub struct HttpChatModel {
    client: reqwest::Client,
    config: ModelConfig,
    url: String,
    headers: HeaderMap,
}

impl HttpChatModel {
    /// Build a client from config, reading the provider's API key from the
    /// environment.
    pub fn from_config(config: &ModelConfig) -> Result<Self, LlmError> {
        let api_key = match config.provider.api_key_env() {
            Some(var) => match std::env::var(var) {
                Ok(key) if !key.trim().is_empty() => Some(key),
                _ => return Err(LlmError::MissingApiKey(var)),
            },
            None => None,
        };
        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit key (`None` for keyless local servers).
    pub fn with_api_key(config: &ModelConfig, api_key: Option<String>) -> Result<Self, LlmError> {
        let url = completions_url(config)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            if config.provider == LlmProvider::Azure {
                let value = HeaderValue::from_str(&key)
                    .map_err(|_| LlmError::Http("invalid API key header".to_string()))?;
                headers.insert("api-key", value);
            } else {
                let value = HeaderValue::from_str(&format!("Bearer {}", key))
                    .map_err(|_| LlmError::Http("invalid API key header".to_string()))?;
                headers.insert(AUTHORIZATION, value);
            }
        }

        Ok(Self {
            client: reqwest::Client::new(),
            config: config.clone(),
            url,
            headers,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Azure addresses the deployment in the path and ignores `model` in the
/// body; everyone else takes `<base>/chat/completions`.
fn completions_url(config: &ModelConfig) -> Result<String, LlmError> {
    if config.provider == LlmProvider::Azure {
        let endpoint = config
            .base_url
            .clone()
            .or_else(|| std::env::var(AZURE_ENDPOINT_ENV).ok())
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                LlmError::MissingEndpoint(format!("set {} or a base URL", AZURE_ENDPOINT_ENV))
            })?;
        let api_version = std::env::var(AZURE_API_VERSION_ENV)
            .unwrap_or_else(|_| AZURE_DEFAULT_API_VERSION.to_string());
        return Ok(format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            config.model,
            api_version
        ));
    }

    let base = config.resolved_base_url().ok_or_else(|| {
        LlmError::MissingEndpoint(format!("no base URL for provider {}", config.provider))
    })?;
    Ok(format!("{}/chat/completions", base))
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError> {
        let body = CompletionRequest {
            model: (self.config.provider != LlmProvider::Azure).then_some(self.config.model.as_str()),
            messages,
            temperature: self.config.temperature,
        };

        tracing::debug!(
            provider = %self.config.provider,
            model = %self.config.model,
            messages = messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .client
            .post(&self.url)
            .headers(self.headers.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                body: preview(&text, MAX_ERROR_BODY_CHARS),
            });
        }

        let parsed: CompletionResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::Response(format!("invalid completion payload: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Response("completion has no message content".to_string()))?;

        Ok(ChatResponse { content })
    }
}
