//! Skill execution engine.
//!
//! Bridges skill names to loaded handlers. Reads each skill's optional
//! documentation and parameter schema, and invokes handlers so that no
//! skill failure (error, bad entry point, panic) ever escapes as anything
//! but an `{"error": ...}` object.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use super::handler::{error_result, skill_status};
use super::loader::{PluginLoader, SkillLoader};
use super::registry::SkillRegistry;

/// Documentation file fed verbatim to the model
pub const DOC_FILE: &str = "SKILL.md";
/// Parameter schema file
pub const SCHEMA_FILE: &str = "schema.json";

/// Documentation and schema for one skill, or why they could not be loaded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SkillContext {
    Failed { error: String },
    Loaded {
        doc: Option<String>,
        schema: Option<Value>,
    },
}

impl SkillContext {
    pub fn doc(&self) -> Option<&str> {
        match self {
            SkillContext::Loaded { doc, .. } => doc.as_deref(),
            SkillContext::Failed { .. } => None,
        }
    }

    pub fn schema(&self) -> Option<&Value> {
        match self {
            SkillContext::Loaded { schema, .. } => schema.as_ref(),
            SkillContext::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            SkillContext::Failed { error } => Some(error),
            SkillContext::Loaded { .. } => None,
        }
    }
}

/// Loads skill context and runs skills. Holds no per-run state.
pub struct SkillExecutor {
    registry: Arc<SkillRegistry>,
    loader: Arc<dyn SkillLoader>,
}

impl SkillExecutor {
    /// Executor using the default [`PluginLoader`] (no compiled-in skills).
    pub fn new(registry: Arc<SkillRegistry>) -> Self {
        Self::with_loader(registry, Arc::new(PluginLoader::default()))
    }

    pub fn with_loader(registry: Arc<SkillRegistry>, loader: Arc<dyn SkillLoader>) -> Self {
        Self { registry, loader }
    }

    pub fn registry(&self) -> &Arc<SkillRegistry> {
        &self.registry
    }

    /// Reads `SKILL.md` and `schema.json` for the given skill.
    ///
    /// Missing files are `None`. A schema that is not JSON, or lacks a
    /// `properties` mapping, is also `None` (with a warning).
    pub async fn load_context(&self, skill_name: &str) -> SkillContext {
        let Some(manifest) = self.registry.get_by_name(skill_name) else {
            return SkillContext::Failed {
                error: format!("Skill '{}' not found", skill_name),
            };
        };

        let doc = read_optional(&manifest.directory.join(DOC_FILE)).await;
        let schema_path = manifest.directory.join(SCHEMA_FILE);
        let schema = read_optional(&schema_path)
            .await
            .and_then(|text| parse_schema(&text, &schema_path));

        SkillContext::Loaded { doc, schema }
    }

    /// Runs a skill's `execute` capability with `params`.
    ///
    /// Returns whatever the skill produced, or `{"error": ...}` when the skill
    /// is unknown, cannot be loaded, fails, or panics.
    pub async fn execute_skill(&self, skill_name: &str, params: Value) -> Value {
        let Some(manifest) = self.registry.get_by_name(skill_name) else {
            return error_result(format!("Skill '{}' not found", skill_name));
        };

        let handler = match self.loader.load(manifest) {
            Ok(handler) => handler,
            Err(e) => {
                tracing::warn!(skill = %skill_name, error = %e, "Skill could not be loaded");
                return error_result(e.to_string());
            }
        };

        tracing::info!(skill = %skill_name, params = %params, "Executing skill");

        // Own task per invocation: a panic stays inside the JoinHandle
        let task = tokio::spawn(async move { handler.execute(params).await });

        match task.await {
            Ok(Ok(result)) => {
                if skill_status(&result).is_none() {
                    tracing::warn!(skill = %skill_name, "Skill result has no status field");
                }
                result
            }
            Ok(Err(e)) => {
                let message = format!("{:#}", e);
                tracing::error!(skill = %skill_name, error = %message, "Skill execution failed");
                error_result(message)
            }
            Err(e) if e.is_panic() => {
                let payload = e.into_panic();
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic payload".to_string());
                tracing::error!(skill = %skill_name, panic = %detail, "Skill panicked");
                error_result(format!("Skill '{}' panicked: {}", skill_name, detail))
            }
            Err(e) => {
                tracing::error!(skill = %skill_name, error = %e, "Skill task did not complete");
                error_result(format!("Skill '{}' execution error: {}", skill_name, e))
            }
        }
    }
}

async fn read_optional(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read skill file");
            None
        }
    }
}

fn parse_schema(text: &str, path: &Path) -> Option<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(schema) if schema.get("properties").is_some_and(Value::is_object) => Some(schema),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Schema has no 'properties' mapping, ignoring");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Invalid JSON in schema, ignoring");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::handler::handler_fn;
    use crate::skills::manifest::MANIFEST_FILE;
    use anyhow::anyhow;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn skill_dir(root: &Path, name: &str) -> std::path::PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join(MANIFEST_FILE),
            format!("name: {}\ndescription: test skill\ntriggers: [{}]\n", name, name),
        )
        .unwrap();
        dir
    }

    fn executor(root: &Path, loader: PluginLoader) -> SkillExecutor {
        let registry = Arc::new(SkillRegistry::load(root));
        SkillExecutor::with_loader(registry, Arc::new(loader))
    }

    #[tokio::test]
    async fn test_load_context_reads_doc_and_schema() {
        let temp = TempDir::new().unwrap();
        let dir = skill_dir(temp.path(), "report_generator");
        fs::write(dir.join(DOC_FILE), "# Report Generator\nBuilds reports.").unwrap();
        fs::write(
            dir.join(SCHEMA_FILE),
            r#"{"type": "object", "properties": {"report_type": {"type": "string"}}}"#,
        )
        .unwrap();

        let ctx = executor(temp.path(), PluginLoader::new())
            .load_context("report_generator")
            .await;

        assert!(ctx.error().is_none());
        assert!(ctx.doc().unwrap().contains("Report Generator"));
        assert!(ctx.schema().unwrap()["properties"].get("report_type").is_some());
    }

    #[tokio::test]
    async fn test_load_context_missing_files_are_absent() {
        let temp = TempDir::new().unwrap();
        skill_dir(temp.path(), "bare");

        let ctx = executor(temp.path(), PluginLoader::new()).load_context("bare").await;
        assert_eq!(ctx, SkillContext::Loaded { doc: None, schema: None });
    }

    #[tokio::test]
    async fn test_malformed_schema_is_absent() {
        let temp = TempDir::new().unwrap();
        let dir = skill_dir(temp.path(), "sloppy");
        fs::write(dir.join(SCHEMA_FILE), "{ not json").unwrap();

        let exec = executor(temp.path(), PluginLoader::new());
        assert!(exec.load_context("sloppy").await.schema().is_none());

        fs::write(dir.join(SCHEMA_FILE), r#"{"type": "object"}"#).unwrap();
        assert!(exec.load_context("sloppy").await.schema().is_none());
    }

    #[tokio::test]
    async fn test_load_context_unknown_skill() {
        let temp = TempDir::new().unwrap();
        let ctx = executor(temp.path(), PluginLoader::new())
            .load_context("does_not_exist")
            .await;
        assert_eq!(ctx.error(), Some("Skill 'does_not_exist' not found"));
        assert_eq!(
            serde_json::to_value(&ctx).unwrap(),
            json!({"error": "Skill 'does_not_exist' not found"})
        );
    }

    #[tokio::test]
    async fn test_execute_unknown_skill_is_error_object() {
        let temp = TempDir::new().unwrap();
        let result = executor(temp.path(), PluginLoader::new())
            .execute_skill("nope", json!({}))
            .await;
        assert_eq!(result, json!({"error": "Skill 'nope' not found"}));
    }

    #[tokio::test]
    async fn test_execute_builtin_passes_result_through() {
        let temp = TempDir::new().unwrap();
        skill_dir(temp.path(), "report_generator");
        let loader = PluginLoader::new().with_builtin(
            "report_generator",
            handler_fn(|params| {
                Ok(json!({
                    "status": "success",
                    "report_path": format!("/reports/{}.pdf", params["period"].as_str().unwrap_or("Q4")),
                }))
            }),
        );

        let result = executor(temp.path(), loader)
            .execute_skill("report_generator", json!({"period": "Q3"}))
            .await;
        assert_eq!(result["status"], "success");
        assert_eq!(result["report_path"], "/reports/Q3.pdf");
    }

    #[tokio::test]
    async fn test_execute_error_and_panic_are_contained() {
        let temp = TempDir::new().unwrap();
        skill_dir(temp.path(), "failing");
        skill_dir(temp.path(), "panicking");
        let loader = PluginLoader::new()
            .with_builtin("failing", handler_fn(|_| Err(anyhow!("dataset unavailable"))))
            .with_builtin("panicking", handler_fn(|_| panic!("index out of range")));
        let exec = executor(temp.path(), loader);

        let result = exec.execute_skill("failing", json!({})).await;
        assert_eq!(result, json!({"error": "dataset unavailable"}));

        let result = exec.execute_skill("panicking", json!({})).await;
        let message = result["error"].as_str().unwrap();
        assert!(message.starts_with("Skill 'panicking' panicked"));
        assert!(message.contains("index out of range"));
    }

    #[tokio::test]
    async fn test_execute_missing_entry_point() {
        let temp = TempDir::new().unwrap();
        skill_dir(temp.path(), "no_code");

        let result = executor(temp.path(), PluginLoader::new())
            .execute_skill("no_code", json!({}))
            .await;
        let message = result["error"].as_str().unwrap();
        assert!(message.starts_with("Entry point not found: "));
        assert!(message.ends_with("main"));
    }
}
