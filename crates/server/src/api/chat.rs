//! # Chat API
//!
//! One pipeline run per request. The client sends the whole conversation;
//! the latest user message is the query.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use skillflow_core::graph::{GraphNode, PipelineState};
use skillflow_core::llm::ChatMessage;

use super::{ApiError, SharedState};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub selected_skills: Vec<String>,
    pub execution_results: BTreeMap<String, Value>,
    pub path: Vec<GraphNode>,
}

pub fn chat_routes() -> Router<SharedState> {
    Router::new().route("/", post(chat))
}

async fn chat(
    State(state): State<SharedState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatReply>, ApiError> {
    if req.messages.is_empty() {
        return Err(ApiError::bad_request("messages must not be empty"));
    }

    let run = state
        .graph
        .run_with_trace(PipelineState::new(req.messages))
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                selected = ?e.partial_state().map(|s| &s.selected_skills),
                "Chat run failed"
            );
            ApiError::from(e)
        })?;

    Ok(Json(ChatReply {
        reply: run.state.reply().unwrap_or_default().to_string(),
        selected_skills: run.state.selected_skills,
        execution_results: run.state.execution_results,
        path: run.path,
    }))
}
