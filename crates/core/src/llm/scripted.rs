//! Deterministic chat model that replays queued responses.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ChatMessage, ChatModel, ChatResponse, LlmError};

enum ScriptedReply {
    Text(String),
    Fail(String),
}

/// Replays replies in order and records every request it receives.
///
/// Once the script runs out the fallback reply (if any) is returned for
/// every further call; without a fallback the call fails.
#[derive(Default)]
pub struct ScriptedChatModel {
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: Option<String>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChatModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| ScriptedReply::Text(r.into()))
                    .collect(),
            ),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Reply used when the script is exhausted
    pub fn with_fallback(mut self, reply: impl Into<String>) -> Self {
        self.fallback = Some(reply.into());
        self
    }

    /// Queue a reply
    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.push(ScriptedReply::Text(reply.into()));
        self
    }

    /// Queue a transport failure
    pub fn then_fail(self, reason: impl Into<String>) -> Self {
        self.push(ScriptedReply::Fail(reason.into()));
        self
    }

    fn push(&self, reply: ScriptedReply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn invoke(&self, messages: &[ChatMessage]) -> Result<ChatResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }

        let next = self
            .replies
            .lock()
            .map_err(|_| LlmError::Response("scripted model lock poisoned".to_string()))?
            .pop_front();

        match next {
            Some(ScriptedReply::Text(text)) => Ok(ChatResponse::new(text)),
            Some(ScriptedReply::Fail(reason)) => Err(LlmError::Http(reason)),
            None => self
                .fallback
                .clone()
                .map(ChatResponse::new)
                .ok_or_else(|| LlmError::Response("scripted model has no reply left".to_string())),
        }
    }
}
