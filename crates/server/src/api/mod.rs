//! # HTTP API
//!
//! Skill listing, trigger search and pipeline invocation under `/api/v1`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use skillflow_core::graph::{GraphNode, PipelineError, SkillGraph};

pub mod chat;
pub mod skills;

/// Shared by every request; runs never share mutable state.
pub struct AppState {
    pub graph: SkillGraph,
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .nest("/api/v1/skills", skills::skill_routes())
        .nest("/api/v1/chat", chat::chat_routes())
        .route("/api/v1/health", get(health))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    skills: usize,
}

async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        skills: state.graph.registry().len(),
    })
}

/// Error body: `{"error": ..., "node": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    node: Option<GraphNode>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            node: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        let status = match err {
            PipelineError::InvalidState(_) => StatusCode::BAD_REQUEST,
            PipelineError::Model { .. } => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            node: err.node(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message, "node": self.node }));
        (self.status, body).into_response()
    }
}
