//! # Graph Router
//!
//! Node names, the edge table, and the routing function consulted between
//! every pair of nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::state::{NextAction, PipelineState};

/// Node of the orchestration graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphNode {
    /// Trigger search over the latest user message (entry)
    Analyze,
    /// Model picks among matched skills
    Select,
    /// Docs and schemas for selected skills
    LoadContext,
    /// Parameter extraction and invocation per skill
    Execute,
    /// Final reply (terminal)
    Respond,
}

impl GraphNode {
    pub const ENTRY: GraphNode = GraphNode::Analyze;

    pub fn name(&self) -> &'static str {
        match self {
            GraphNode::Analyze => "analyze",
            GraphNode::Select => "select",
            GraphNode::LoadContext => "load_context",
            GraphNode::Execute => "execute",
            GraphNode::Respond => "respond",
        }
    }

    /// Legal next nodes
    pub fn successors(&self) -> &'static [GraphNode] {
        match self {
            GraphNode::Analyze => &[GraphNode::Select, GraphNode::Respond],
            GraphNode::Select => &[GraphNode::LoadContext, GraphNode::Respond],
            GraphNode::LoadContext => &[GraphNode::Execute],
            GraphNode::Execute => &[GraphNode::Respond],
            GraphNode::Respond => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty()
    }

    pub fn can_reach(&self, next: GraphNode) -> bool {
        self.successors().contains(&next)
    }
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<NextAction> for GraphNode {
    fn from(action: NextAction) -> Self {
        match action {
            NextAction::SelectSkills => GraphNode::Select,
            NextAction::LoadSkillContext => GraphNode::LoadContext,
            NextAction::ExecuteSkills => GraphNode::Execute,
            NextAction::Respond => GraphNode::Respond,
        }
    }
}

/// `next_action` if set, otherwise `respond`.
pub fn route(state: &PipelineState) -> GraphNode {
    state
        .next_action
        .map(GraphNode::from)
        .unwrap_or(GraphNode::Respond)
}
