//! # Skills API
//!
//! Listing and trigger search. Neither endpoint calls the model.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use skillflow_core::skills::SkillSummary;

use super::SharedState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub context: Option<String>,
}

pub fn skill_routes() -> axum::Router<SharedState> {
    Router::new()
        .route("/", get(list_skills))
        .route("/search", post(search_skills))
}

async fn list_skills(State(state): State<SharedState>) -> Json<Vec<SkillSummary>> {
    Json(state.graph.registry().summaries())
}

async fn search_skills(
    State(state): State<SharedState>,
    Json(req): Json<SearchRequest>,
) -> Json<Vec<SkillSummary>> {
    let context = req.context.as_deref().unwrap_or_default();
    Json(state.graph.registry().search_skills(&req.query, context))
}
