//! # LLM Capability
//!
//! The orchestration graph only ever sees [`ChatModel`]: an ordered list of
//! role-tagged messages in, one text response out. Concrete clients live in
//! submodules.
//!
//! - `http` - OpenAI-compatible chat completions over `reqwest`
//! - `scripted` - replays canned responses (tests, offline runs)

pub mod http;
pub mod scripted;

pub use http::HttpChatModel;
pub use scripted::ScriptedChatModel;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Author of a chat turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A single role-tagged chat turn
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Model reply. Content is untrusted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    pub content: String,
}

impl ChatResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Failures of the model-call capability. These are the only faults allowed
/// to abort a pipeline run.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing API key: set {0}")]
    MissingApiKey(&'static str),
    #[error("missing endpoint: {0}")]
    MissingEndpoint(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response error: {0}")]
    Response(String),
}

/// Capability mapping role-tagged messages to one text response
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError>;
}

#[async_trait]
impl ChatModel for Arc<dyn ChatModel> {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError> {
        (**self).invoke(messages).await
    }
}
