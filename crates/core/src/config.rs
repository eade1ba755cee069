//! Runtime configuration.
//!
//! Resolution order is defaults, then environment, then whatever the caller
//! overrides (the CLI applies its flags on top of [`SkillflowConfig::from_env`]).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::llm::{HttpChatModel, LlmError};
use crate::models::{LlmProvider, ModelConfig};
use crate::skills::{PluginLoader, SkillExecutor, SkillRegistry};

pub const SKILLS_BASE_PATH_ENV: &str = "SKILLS_BASE_PATH";
pub const PROVIDER_ENV: &str = "SKILLFLOW_PROVIDER";
pub const MODEL_ENV: &str = "SKILLFLOW_MODEL";
pub const BASE_URL_ENV: &str = "SKILLFLOW_BASE_URL";
pub const TEMPERATURE_ENV: &str = "SKILLFLOW_TEMPERATURE";
pub const SKILL_TIMEOUT_ENV: &str = "SKILLFLOW_SKILL_TIMEOUT_SECS";
pub const ALLOW_PROCESS_SKILLS_ENV: &str = "SKILLFLOW_ALLOW_PROCESS_SKILLS";

const DEFAULT_SKILLS_DIR: &str = "./skills";
const DEFAULT_SKILL_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillflowConfig {
    /// Root scanned for `<skill>/skill.yaml`
    pub skills_dir: PathBuf,
    #[serde(default)]
    pub model: ModelConfig,
    /// Per-invocation limit for subprocess skills; 0 disables it
    pub skill_timeout_secs: u64,
    pub allow_process_skills: bool,
}

impl Default for SkillflowConfig {
    fn default() -> Self {
        Self {
            skills_dir: PathBuf::from(DEFAULT_SKILLS_DIR),
            model: ModelConfig::default(),
            skill_timeout_secs: DEFAULT_SKILL_TIMEOUT_SECS,
            allow_process_skills: true,
        }
    }
}

impl SkillflowConfig {
    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Defaults overlaid with values from `lookup`. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get(SKILLS_BASE_PATH_ENV) {
            config.skills_dir = PathBuf::from(dir);
        }

        if let Some(provider) = get(PROVIDER_ENV) {
            let provider = provider
                .parse::<LlmProvider>()
                .map_err(|reason| ConfigError::InvalidValue { var: PROVIDER_ENV, reason })?;
            config.model = ModelConfig::with_provider(provider, provider.default_model());
        }
        if let Some(model) = get(MODEL_ENV) {
            config.model.model = model;
        }
        if let Some(url) = get(BASE_URL_ENV) {
            config.model.base_url = Some(url);
        }
        if let Some(temperature) = get(TEMPERATURE_ENV) {
            config.model.temperature = temperature
                .trim()
                .parse::<f32>()
                .map_err(|e| ConfigError::InvalidValue {
                    var: TEMPERATURE_ENV,
                    reason: e.to_string(),
                })?;
        }
        if let Some(timeout) = get(SKILL_TIMEOUT_ENV) {
            config.skill_timeout_secs = timeout
                .trim()
                .parse::<u64>()
                .map_err(|e| ConfigError::InvalidValue {
                    var: SKILL_TIMEOUT_ENV,
                    reason: e.to_string(),
                })?;
        }
        if let Some(allow) = get(ALLOW_PROCESS_SKILLS_ENV) {
            config.allow_process_skills = parse_bool(&allow).ok_or_else(|| ConfigError::InvalidValue {
                var: ALLOW_PROCESS_SKILLS_ENV,
                reason: format!("expected true/false, got '{}'", allow),
            })?;
        }

        Ok(config)
    }

    pub fn skill_timeout(&self) -> Option<Duration> {
        (self.skill_timeout_secs > 0).then(|| Duration::from_secs(self.skill_timeout_secs))
    }

    /// Scans `skills_dir` once; the result is read-only afterwards.
    pub fn load_registry(&self) -> Arc<SkillRegistry> {
        Arc::new(SkillRegistry::load(&self.skills_dir))
    }

    /// Loader with no compiled-in skills; register them before building the executor.
    pub fn plugin_loader(&self) -> PluginLoader {
        PluginLoader::new()
            .with_process_skills(self.allow_process_skills)
            .with_process_timeout(self.skill_timeout())
    }

    pub fn build_executor(&self, registry: Arc<SkillRegistry>, loader: PluginLoader) -> Arc<SkillExecutor> {
        Arc::new(SkillExecutor::with_loader(registry, Arc::new(loader)))
    }

    pub fn chat_model(&self) -> Result<HttpChatModel, LlmError> {
        HttpChatModel::from_config(&self.model)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
