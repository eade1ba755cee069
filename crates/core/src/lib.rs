//! # Skillflow Core
//!
//! Routes a free-text request to zero or more pluggable skills, lets a
//! language model fill in each skill's parameters, runs the skills, and asks
//! the model for a final reply.
//!
//! ## Architecture
//!
//! - `skills/` - Skill registry (trigger matching), plugin loading, isolated execution
//! - `graph/` - The five-node orchestration state machine
//! - `llm/` - Chat model capability (HTTP client + scripted model)
//! - `models/` - LLM provider configuration
//! - `config` - Environment-driven runtime configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use skillflow_core::config::SkillflowConfig;
//! use skillflow_core::graph::{PipelineState, SkillGraph};
//!
//! let config = SkillflowConfig::from_env()?;
//! let registry = config.load_registry();
//! let executor = config.build_executor(registry, config.plugin_loader());
//! let graph = SkillGraph::new(executor, Arc::new(config.chat_model()?));
//! let state = graph.run(PipelineState::from_user_message("Create a Q4 sales report")).await?;
//! println!("{}", state.reply().unwrap_or_default());
//! ```

pub mod config;
pub mod graph;
pub mod llm;
pub mod models;
pub mod skills;
