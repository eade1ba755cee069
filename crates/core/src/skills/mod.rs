//! # Skillflow Skills
//!
//! Discovery, loading and invocation of pluggable task handlers.
//!
//! ## Architecture
//!
//! ```text
//! SkillRegistry (skill.yaml manifests, trigger search)
//!   └── SkillExecutor (SKILL.md + schema.json context, isolated invocation)
//!         └── SkillLoader (compiled-in handlers | executable entry points)
//!               └── SkillHandler (execute(params) -> result)
//! ```
//!
//! ## Skill directory layout
//!
//! ```text
//! skills/report_generator/
//!   skill.yaml     name, description, triggers, entry_point, version
//!   SKILL.md       optional documentation for the model
//!   schema.json    optional parameter schema ({"properties": {...}})
//!   main           entry point (unless a compiled-in handler is registered)
//! ```

pub mod executor;
pub mod handler;
pub mod loader;
pub mod manifest;
pub mod process;
pub mod registry;

pub use executor::{SkillContext, SkillExecutor, DOC_FILE, SCHEMA_FILE};
pub use handler::{error_result, handler_fn, is_error, skill_status, SkillHandler, SkillStatus};
pub use loader::{LoadError, PluginLoader, SkillLoader};
pub use manifest::{ManifestError, SkillManifest, SkillSummary, MANIFEST_FILE};
pub use process::ProcessSkill;
pub use registry::SkillRegistry;
