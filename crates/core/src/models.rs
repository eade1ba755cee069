//! # Skillflow Models
//!
//! Centralized LLM endpoint configuration. Every provider is reached through
//! an OpenAI-compatible chat completions API; the provider decides the
//! default base URL, default model and which environment variable holds the
//! API key.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported LLM providers
///
/// - OpenAI - `OPENAI_API_KEY`
/// - Azure OpenAI - `AZURE_OPENAI_API_KEY` (+ `AZURE_OPENAI_ENDPOINT`)
/// - OpenRouter (Gateway) - `OPENROUTER_API_KEY`
/// - Anthropic (compat endpoint) - `ANTHROPIC_API_KEY`
/// - DeepSeek - `DEEPSEEK_API_KEY`
/// - Grok (xAI) - `XAI_API_KEY`
/// - Ollama (local) - no key
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    #[serde(rename = "openai")]
    OpenAI,
    Azure,
    OpenRouter,
    Anthropic,
    DeepSeek,
    Grok,
    Ollama,
}

impl LlmProvider {
    /// Get all available providers
    pub fn all() -> Vec<LlmProvider> {
        vec![
            LlmProvider::OpenAI,
            LlmProvider::Azure,
            LlmProvider::OpenRouter,
            LlmProvider::Anthropic,
            LlmProvider::DeepSeek,
            LlmProvider::Grok,
            LlmProvider::Ollama,
        ]
    }

    /// Display name for CLI output
    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "OpenAI",
            LlmProvider::Azure => "Azure OpenAI",
            LlmProvider::OpenRouter => "OpenRouter",
            LlmProvider::Anthropic => "Anthropic",
            LlmProvider::DeepSeek => "DeepSeek",
            LlmProvider::Grok => "Grok",
            LlmProvider::Ollama => "Ollama",
        }
    }

    /// Environment variable holding the API key, if the provider needs one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            LlmProvider::OpenAI => Some("OPENAI_API_KEY"),
            LlmProvider::Azure => Some("AZURE_OPENAI_API_KEY"),
            LlmProvider::OpenRouter => Some("OPENROUTER_API_KEY"),
            LlmProvider::Anthropic => Some("ANTHROPIC_API_KEY"),
            LlmProvider::DeepSeek => Some("DEEPSEEK_API_KEY"),
            LlmProvider::Grok => Some("XAI_API_KEY"),
            LlmProvider::Ollama => None,
        }
    }

    /// Default base URL. Azure has none: the resource endpoint comes from
    /// `AZURE_OPENAI_ENDPOINT` or an explicit base URL.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            LlmProvider::OpenAI => Some("https://api.openai.com/v1"),
            LlmProvider::Azure => None,
            LlmProvider::OpenRouter => Some("https://openrouter.ai/api/v1"),
            LlmProvider::Anthropic => Some("https://api.anthropic.com/v1"),
            LlmProvider::DeepSeek => Some("https://api.deepseek.com/v1"),
            LlmProvider::Grok => Some("https://api.x.ai/v1"),
            LlmProvider::Ollama => Some("http://localhost:11434/v1"),
        }
    }

    /// Default model (for Azure this is the deployment name)
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenAI => "gpt-4o-mini",
            LlmProvider::Azure => "gpt-4o",
            LlmProvider::OpenRouter => "openai/gpt-4o-mini",
            LlmProvider::Anthropic => "claude-sonnet-4-20250514",
            LlmProvider::DeepSeek => "deepseek-chat",
            LlmProvider::Grok => "grok-2",
            LlmProvider::Ollama => "llama3.1",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            LlmProvider::OpenAI => "openai",
            LlmProvider::Azure => "azure",
            LlmProvider::OpenRouter => "openrouter",
            LlmProvider::Anthropic => "anthropic",
            LlmProvider::DeepSeek => "deepseek",
            LlmProvider::Grok => "grok",
            LlmProvider::Ollama => "ollama",
        };
        f.write_str(slug)
    }
}

impl FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAI),
            "azure" | "azure_openai" | "azure-openai" => Ok(LlmProvider::Azure),
            "openrouter" => Ok(LlmProvider::OpenRouter),
            "anthropic" => Ok(LlmProvider::Anthropic),
            "deepseek" => Ok(LlmProvider::DeepSeek),
            "grok" | "xai" => Ok(LlmProvider::Grok),
            "ollama" => Ok(LlmProvider::Ollama),
            other => Err(format!("unknown LLM provider '{}'", other)),
        }
    }
}

/// Configuration for LLM model selection
///
/// ## Example
/// ```rust,ignore
/// use skillflow_core::models::{ModelConfig, LlmProvider};
///
/// let config = ModelConfig::with_provider(LlmProvider::OpenRouter, "openai/gpt-4o")
///     .with_temperature(0.0);
/// let model = HttpChatModel::from_config(&config)?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelConfig {
    /// LLM provider to use
    #[serde(default)]
    pub provider: LlmProvider,
    /// Model name (deployment name for Azure)
    pub model: String,
    /// Optional base URL override for OpenAI-compatible APIs
    #[serde(default)]
    pub base_url: Option<String>,
    /// Sampling temperature; the pipeline wants deterministic output
    #[serde(default)]
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::with_provider(LlmProvider::default(), LlmProvider::default().default_model())
    }
}

impl ModelConfig {
    /// Create a new model config with the default provider
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_provider(LlmProvider::default(), model)
    }

    /// Create config for a specific provider
    pub fn with_provider(provider: LlmProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            base_url: None,
            temperature: 0.0,
        }
    }

    /// Set base URL (for OpenAI-compatible endpoints)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Base URL actually used: explicit override, then provider default.
    pub fn resolved_base_url(&self) -> Option<String> {
        self.base_url
            .clone()
            .or_else(|| self.provider.default_base_url().map(str::to_string))
            .map(|url| url.trim_end_matches('/').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn test_provider_round_trips_through_str() {
        for provider in LlmProvider::all() {
            let parsed: LlmProvider = provider.to_string().parse().unwrap();
            assert_eq!(parsed, provider);
        }
        assert!("mystery".parse::<LlmProvider>().is_err());
    }

    #[test]
    fn test_resolved_base_url() {
        let config = ModelConfig::with_provider(LlmProvider::Ollama, "llama3.1");
        assert_eq!(
            config.resolved_base_url().as_deref(),
            Some("http://localhost:11434/v1")
        );

        let config = config.with_base_url("http://gpu-box:8000/v1/");
        assert_eq!(
            config.resolved_base_url().as_deref(),
            Some("http://gpu-box:8000/v1")
        );

        let azure = ModelConfig::with_provider(LlmProvider::Azure, "gpt-4o");
        assert_eq!(azure.resolved_base_url(), None);
    }

    #[test]
    fn test_model_config_serialization() {
        let config = ModelConfig::with_provider(LlmProvider::OpenRouter, "openai/gpt-4o");
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("openrouter"));
        assert!(json.contains("openai/gpt-4o"));
    }
}
