//! # Graph Nodes
//!
//! The five steps of a run. Each node reads the state, writes its own fields
//! and sets `next_action`. Only a model fault is returned as an error; any
//! other problem degrades toward `respond`.

use serde_json::{Map, Value};
use std::collections::HashSet;

use super::prompts;
use super::state::{NextAction, PipelineState};
use crate::llm::{ChatMessage, ChatModel, LlmError};
use crate::skills::{is_error, SkillExecutor, SkillRegistry, SkillSummary};

/// Trigger search over the latest user message. Never calls the model.
pub fn analyze(state: &mut PipelineState, registry: &SkillRegistry) {
    let available = registry.search_skills(state.last_user_query(), "");
    tracing::info!(matched = available.len(), "Analyzed query");

    state.next_action = Some(if available.is_empty() {
        NextAction::Respond
    } else {
        NextAction::SelectSkills
    });
    state.available_skills = available;
}

/// One model call choosing among `available_skills`.
pub async fn select_skills(state: &mut PipelineState, model: &dyn ChatModel) -> Result<(), LlmError> {
    let request = prompts::selection_request(state.last_user_query(), &state.available_skills);
    let response = model
        .invoke(&[ChatMessage::system(prompts::SELECT), ChatMessage::user(request)])
        .await?;

    let selected = parse_selection(&response.content, &state.available_skills);
    tracing::info!(selected = ?selected, "Skills selected");

    state.next_action = Some(if selected.is_empty() {
        NextAction::Respond
    } else {
        NextAction::LoadSkillContext
    });
    state.selected_skills = selected;
    Ok(())
}

/// Documentation and schema for every selected skill. A skill whose context
/// failed to load is still executed.
pub async fn load_context(state: &mut PipelineState, executor: &SkillExecutor) {
    for name in &state.selected_skills {
        let context = executor.load_context(name).await;
        if let Some(error) = context.error() {
            tracing::warn!(skill = %name, error = %error, "Skill context unavailable");
        }
        state.skill_contexts.insert(name.clone(), context);
    }
    state.next_action = Some(NextAction::ExecuteSkills);
}

/// Per selected skill: one model call for parameters, then one invocation.
pub async fn execute_skills(
    state: &mut PipelineState,
    executor: &SkillExecutor,
    model: &dyn ChatModel,
) -> Result<(), LlmError> {
    let query = state.last_user_query().to_string();

    for name in state.selected_skills.clone() {
        let request = prompts::parameter_request(&query, state.skill_contexts.get(&name));
        let response = model
            .invoke(&[ChatMessage::system(prompts::PARAMETERS), ChatMessage::user(request)])
            .await?;

        let params = parse_params(&name, &response.content);
        let result = executor.execute_skill(&name, params).await;
        if is_error(&result) {
            tracing::warn!(skill = %name, "Skill reported an error, continuing to respond");
        }
        state.execution_results.insert(name, result);
    }

    state.next_action = Some(NextAction::Respond);
    Ok(())
}

/// Final reply. Appends one assistant message and clears `next_action`.
pub async fn respond(state: &mut PipelineState, model: &dyn ChatModel) -> Result<(), LlmError> {
    let request = prompts::respond_request(
        state.last_user_query(),
        &state.selected_skills,
        &state.execution_results,
    );
    let response = model
        .invoke(&[ChatMessage::system(prompts::RESPOND), ChatMessage::user(request)])
        .await?;

    state.messages.push(ChatMessage::assistant(response.content));
    state.next_action = None;
    Ok(())
}

/// Names from a JSON array, kept only if offered, first occurrence wins.
/// Anything else is an empty selection.
pub fn parse_selection(content: &str, available: &[SkillSummary]) -> Vec<String> {
    let items = match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => items,
        Ok(other) => {
            tracing::warn!(response = %other, "Skill selection is not a JSON array");
            return Vec::new();
        }
        Err(_) => {
            tracing::warn!(response = %content, "Model returned non-JSON for skill selection");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut selected = Vec::new();
    for item in items {
        let Some(name) = item.as_str() else {
            tracing::warn!(item = %item, "Ignoring non-string skill selection");
            continue;
        };
        if !available.iter().any(|s| s.name == name) {
            tracing::warn!(skill = %name, "Model selected a skill that was not offered");
            continue;
        }
        if seen.insert(name.to_string()) {
            selected.push(name.to_string());
        }
    }
    selected
}

/// A JSON object, or `{}` for anything else.
pub fn parse_params(skill_name: &str, content: &str) -> Value {
    match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(params)) => Value::Object(params),
        Ok(_) | Err(_) => {
            tracing::warn!(skill = %skill_name, response = %content, "Could not parse skill parameters");
            Value::Object(Map::new())
        }
    }
}
