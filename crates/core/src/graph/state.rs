//! # Pipeline State
//!
//! The single value threaded through the graph. Each run owns its own
//! state; nothing here is shared between runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::llm::{ChatMessage, ChatRole};
use crate::skills::{SkillContext, SkillSummary};

/// What the node that just ran wants to happen next
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    SelectSkills,
    LoadSkillContext,
    ExecuteSkills,
    Respond,
}

/// State of one run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PipelineState {
    /// Conversation so far; append-only during a run
    pub messages: Vec<ChatMessage>,
    /// Trigger matches for the latest query
    #[serde(default)]
    pub available_skills: Vec<SkillSummary>,
    /// Skills chosen by the model, in the model's order
    #[serde(default)]
    pub selected_skills: Vec<String>,
    #[serde(default)]
    pub skill_contexts: BTreeMap<String, SkillContext>,
    /// Raw skill output (or `{"error": ...}`) keyed by skill name
    #[serde(default)]
    pub execution_results: BTreeMap<String, Value>,
    /// `None` is the terminal signal
    #[serde(default)]
    pub next_action: Option<NextAction>,
}

impl PipelineState {
    /// Fresh state for a conversation
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Fresh state holding a single user message
    pub fn from_user_message(content: impl Into<String>) -> Self {
        Self::new(vec![ChatMessage::user(content)])
    }

    /// Prior turns followed by a new user message
    pub fn with_history(history: Vec<ChatMessage>, content: impl Into<String>) -> Self {
        let mut messages = history;
        messages.push(ChatMessage::user(content));
        Self::new(messages)
    }

    /// Checked once at pipeline entry: at least one user message, and every
    /// field a run computes still at its empty default.
    pub fn validate(&self) -> Result<(), String> {
        if !self.messages.iter().any(|m| m.role == ChatRole::User) {
            return Err("state must contain at least one user message".to_string());
        }
        let stale = [
            ("available_skills", !self.available_skills.is_empty()),
            ("selected_skills", !self.selected_skills.is_empty()),
            ("skill_contexts", !self.skill_contexts.is_empty()),
            ("execution_results", !self.execution_results.is_empty()),
            ("next_action", self.next_action.is_some()),
        ];
        if let Some((field, _)) = stale.iter().find(|(_, set)| *set) {
            return Err(format!("{} must be empty when a run starts", field));
        }
        Ok(())
    }

    /// Text of the most recent user message, or "" if there is none
    pub fn last_user_query(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    /// The final reply, once `respond` has run
    pub fn reply(&self) -> Option<&str> {
        self.messages
            .last()
            .filter(|m| m.role == ChatRole::Assistant)
            .map(|m| m.content.as_str())
    }

    pub fn is_terminal(&self) -> bool {
        self.next_action.is_none()
    }
}
