//! # Orchestration Graph
//!
//! A fixed five-node state machine:
//!
//! ```text
//! analyze ──┬─> select ──┬─> load_context ──> execute ──> respond
//!           │            │                                  ^
//!           └────────────┴──────────────────────────────────┘
//! ```
//!
//! `analyze` and `select` short-circuit to `respond` when nothing matched or
//! nothing was chosen. Only a failing model call aborts a run.

pub mod events;
pub mod nodes;
pub mod prompts;
pub mod router;
pub mod runner;
pub mod state;

pub use events::{GraphEvent, GraphEventKind};
pub use router::{route, GraphNode};
pub use runner::{GraphRun, PipelineError, SkillGraph};
pub use state::{NextAction, PipelineState};
