//! # Graph Runner
//!
//! Drives one [`PipelineState`] from `analyze` to `respond`, consulting
//! [`route`] after every non-terminal node.
//!
//! The runner owns no per-run data, so a single `SkillGraph` can serve many
//! concurrent runs.

use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use super::events::{run_id, GraphEvent, GraphEventKind};
use super::nodes;
use super::router::{route, GraphNode};
use super::state::PipelineState;
use crate::llm::{ChatModel, LlmError};
use crate::skills::{skill_status, SkillExecutor, SkillRegistry};

/// Why a run stopped before `respond` finished
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Rejected at entry, before any node ran
    #[error("invalid pipeline state: {0}")]
    InvalidState(String),
    /// Model call failed inside `node`; `state` is everything computed so far
    #[error("model call failed in '{node}' node: {source}")]
    Model {
        node: GraphNode,
        #[source]
        source: LlmError,
        state: Box<PipelineState>,
    },
}

impl PipelineError {
    /// Node that failed, if the run got that far
    pub fn node(&self) -> Option<GraphNode> {
        match self {
            PipelineError::InvalidState(_) => None,
            PipelineError::Model { node, .. } => Some(*node),
        }
    }

    pub fn partial_state(&self) -> Option<&PipelineState> {
        match self {
            PipelineError::InvalidState(_) => None,
            PipelineError::Model { state, .. } => Some(state),
        }
    }
}

/// Completed run with the nodes it visited, in order
#[derive(Debug, Clone)]
pub struct GraphRun {
    pub state: PipelineState,
    pub path: Vec<GraphNode>,
}

/// The compiled five-node graph
pub struct SkillGraph {
    registry: Arc<SkillRegistry>,
    executor: Arc<SkillExecutor>,
    model: Arc<dyn ChatModel>,
    event_tx: Option<mpsc::Sender<GraphEvent>>,
}

impl SkillGraph {
    /// The registry searched by `analyze` is the executor's registry.
    pub fn new(executor: Arc<SkillExecutor>, model: Arc<dyn ChatModel>) -> Self {
        Self {
            registry: Arc::clone(executor.registry()),
            executor,
            model,
            event_tx: None,
        }
    }

    /// Events are sent with backpressure; keep the receiver drained.
    pub fn with_event_channel(mut self, tx: mpsc::Sender<GraphEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    /// Runs the graph to completion and returns the final state.
    pub async fn run(&self, state: PipelineState) -> Result<PipelineState, PipelineError> {
        self.run_with_trace(state).await.map(|run| run.state)
    }

    /// Like [`SkillGraph::run`], also reporting the visited node path.
    #[tracing::instrument(
        skip(self, state),
        fields(query = %state.last_user_query().chars().take(50).collect::<String>())
    )]
    pub async fn run_with_trace(&self, mut state: PipelineState) -> Result<GraphRun, PipelineError> {
        state.validate().map_err(PipelineError::InvalidState)?;

        let run = run_id();
        self.emit(GraphEvent::new(&run, GraphEventKind::RunStarted)).await;
        tracing::info!(run_id = %run, "Pipeline run started");

        let mut node = GraphNode::ENTRY;
        let mut path = Vec::new();

        loop {
            path.push(node);
            self.emit(GraphEvent::new(&run, GraphEventKind::NodeStarted).at(node))
                .await;
            tracing::debug!(node = %node, "Entering node");

            if let Err(source) = self.step(node, &mut state).await {
                tracing::error!(node = %node, error = %source, "Model call failed, aborting run");
                self.emit(
                    GraphEvent::new(&run, GraphEventKind::RunFailed)
                        .at(node)
                        .with_data(json!({ "error": source.to_string() })),
                )
                .await;
                return Err(PipelineError::Model {
                    node,
                    source,
                    state: Box::new(state),
                });
            }

            self.emit(GraphEvent::new(&run, GraphEventKind::NodeCompleted).at(node))
                .await;
            self.emit_node_details(&run, node, &state).await;

            if node.is_terminal() {
                break;
            }

            let next = route(&state);
            node = if node.can_reach(next) {
                next
            } else {
                tracing::warn!(from = %node, to = %next, "Route outside the graph, responding instead");
                GraphNode::Respond
            };
        }

        tracing::info!(
            run_id = %run,
            path = ?path.iter().map(GraphNode::name).collect::<Vec<_>>(),
            executed = state.execution_results.len(),
            "Pipeline run completed"
        );
        self.emit(
            GraphEvent::new(&run, GraphEventKind::RunCompleted)
                .with_data(json!({ "path": &path })),
        )
        .await;

        Ok(GraphRun { state, path })
    }

    async fn step(&self, node: GraphNode, state: &mut PipelineState) -> Result<(), LlmError> {
        match node {
            GraphNode::Analyze => {
                nodes::analyze(state, &self.registry);
                Ok(())
            }
            GraphNode::Select => nodes::select_skills(state, self.model.as_ref()).await,
            GraphNode::LoadContext => {
                nodes::load_context(state, &self.executor).await;
                Ok(())
            }
            GraphNode::Execute => {
                nodes::execute_skills(state, &self.executor, self.model.as_ref()).await
            }
            GraphNode::Respond => nodes::respond(state, self.model.as_ref()).await,
        }
    }

    async fn emit_node_details(&self, run: &str, node: GraphNode, state: &PipelineState) {
        match node {
            GraphNode::Analyze => {
                let matched: Vec<&str> = state.available_skills.iter().map(|s| s.name.as_str()).collect();
                self.emit(
                    GraphEvent::new(run, GraphEventKind::SkillsMatched)
                        .at(node)
                        .with_data(json!(matched)),
                )
                .await;
            }
            GraphNode::Select => {
                self.emit(
                    GraphEvent::new(run, GraphEventKind::SkillsSelected)
                        .at(node)
                        .with_data(json!(state.selected_skills)),
                )
                .await;
            }
            GraphNode::Execute => {
                for name in &state.selected_skills {
                    let Some(result) = state.execution_results.get(name) else {
                        continue;
                    };
                    self.emit(
                        GraphEvent::new(run, GraphEventKind::SkillExecuted)
                            .at(node)
                            .with_data(json!({ "skill": name, "status": skill_status(result) })),
                    )
                    .await;
                }
            }
            GraphNode::LoadContext | GraphNode::Respond => {}
        }
    }

    async fn emit(&self, event: GraphEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }
}
