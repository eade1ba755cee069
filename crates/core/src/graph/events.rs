//! # Graph Events
//!
//! Progress notifications emitted while a run moves through the graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::router::GraphNode;

/// Kind of graph event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GraphEventKind {
    RunStarted,
    NodeStarted,
    NodeCompleted,
    /// Trigger search finished (data: matched names)
    SkillsMatched,
    /// Model selection parsed (data: selected names)
    SkillsSelected,
    /// One skill invocation returned (data: skill, status)
    SkillExecuted,
    RunCompleted,
    RunFailed,
}

/// An event in a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphEvent {
    /// Identifier of the run the event belongs to
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub kind: GraphEventKind,
    /// Node that produced this event, if any
    #[serde(default)]
    pub node: Option<GraphNode>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl GraphEvent {
    pub fn new(run_id: &str, kind: GraphEventKind) -> Self {
        Self {
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            kind,
            node: None,
            data: None,
        }
    }

    pub fn at(mut self, node: GraphNode) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Run identifiers only need to be unique within a process
pub(crate) fn run_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(1);
    format!(
        "run-{:x}-{}",
        Utc::now().timestamp_millis(),
        NEXT.fetch_add(1, Ordering::Relaxed)
    )
}
