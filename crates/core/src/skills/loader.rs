//! # Skill Loader
//!
//! Turns a manifest into an invocable [`SkillHandler`]. The executor only
//! knows the [`SkillLoader`] trait; [`PluginLoader`] is the default
//! mechanism:
//!
//! 1. compiled-in handlers, registered under the skill's name
//! 2. otherwise the manifest's entry point file, run as a subprocess

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::handler::SkillHandler;
use super::manifest::SkillManifest;
use super::process::ProcessSkill;

/// Why a skill could not be turned into a handler
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("Entry point not found: {}", .0.display())]
    EntryPointNotFound(PathBuf),
    #[error("Skill '{0}' has no execute() function")]
    MissingExecute(String),
}

/// Resolves manifests to handlers
pub trait SkillLoader: Send + Sync {
    fn load(&self, manifest: &SkillManifest) -> Result<Arc<dyn SkillHandler>, LoadError>;
}

/// Compiled-in handlers first, executable entry points second
#[derive(Clone)]
pub struct PluginLoader {
    builtins: HashMap<String, Arc<dyn SkillHandler>>,
    allow_processes: bool,
    process_timeout: Option<Duration>,
}

impl Default for PluginLoader {
    fn default() -> Self {
        Self {
            builtins: HashMap::new(),
            allow_processes: true,
            process_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a compiled-in handler for the skill called `skill_name`.
    pub fn with_builtin(mut self, skill_name: impl Into<String>, handler: Arc<dyn SkillHandler>) -> Self {
        self.register(skill_name, handler);
        self
    }

    pub fn register(&mut self, skill_name: impl Into<String>, handler: Arc<dyn SkillHandler>) {
        let skill_name = skill_name.into();
        if self.builtins.insert(skill_name.clone(), handler).is_some() {
            tracing::warn!(skill = %skill_name, "Replaced compiled-in skill handler");
        }
    }

    /// Whether executable entry points may be spawned at all
    pub fn with_process_skills(mut self, allow: bool) -> Self {
        self.allow_processes = allow;
        self
    }

    pub fn with_process_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.process_timeout = timeout;
        self
    }
}

impl SkillLoader for PluginLoader {
    fn load(&self, manifest: &SkillManifest) -> Result<Arc<dyn SkillHandler>, LoadError> {
        if let Some(handler) = self.builtins.get(&manifest.name) {
            return Ok(Arc::clone(handler));
        }

        let entry = manifest.entry_path();
        if !entry.is_file() {
            return Err(LoadError::EntryPointNotFound(entry));
        }
        if !self.allow_processes || !is_executable(&entry) {
            return Err(LoadError::MissingExecute(manifest.name.clone()));
        }

        let skill = ProcessSkill::new(&manifest.name, entry, manifest.directory.clone())
            .with_timeout(self.process_timeout);
        Ok(Arc::new(skill))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
