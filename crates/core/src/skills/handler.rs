//! # Skill Handler
//!
//! The contract every skill implements, whatever mechanism produced it:
//! a parameter object goes in, a result object with a `status`
//! discriminator comes out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// A loaded, invocable skill
#[async_trait]
pub trait SkillHandler: Send + Sync {
    async fn execute(&self, params: Value) -> anyhow::Result<Value>;
}

#[async_trait]
impl SkillHandler for Arc<dyn SkillHandler> {
    async fn execute(&self, params: Value) -> anyhow::Result<Value> {
        (**self).execute(params).await
    }
}

/// Handler built from a synchronous closure
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F> SkillHandler for FnHandler<F>
where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync,
{
    async fn execute(&self, params: Value) -> anyhow::Result<Value> {
        (self.f)(params)
    }
}

/// Wraps a closure as an `Arc<dyn SkillHandler>`.
///
/// ```rust,ignore
/// let echo = handler_fn(|params| Ok(json!({"status": "success", "echo": params})));
/// ```
pub fn handler_fn<F>(f: F) -> Arc<dyn SkillHandler>
where
    F: Fn(Value) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(FnHandler { f })
}

/// Value of a result's `status` key
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SkillStatus {
    Success,
    Error,
}

/// Reads the status discriminator. Executor failures carry an `error` key
/// and no status; those count as [`SkillStatus::Error`].
pub fn skill_status(result: &Value) -> Option<SkillStatus> {
    match result.get("status").and_then(Value::as_str) {
        Some("success") => Some(SkillStatus::Success),
        Some("error") => Some(SkillStatus::Error),
        _ if result.get("error").is_some() => Some(SkillStatus::Error),
        _ => None,
    }
}

/// `{"error": message}`
pub fn error_result(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

pub fn is_error(result: &Value) -> bool {
    skill_status(result) == Some(SkillStatus::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_status() {
        assert_eq!(
            skill_status(&json!({"status": "success", "report_path": "/tmp/r.pdf"})),
            Some(SkillStatus::Success)
        );
        assert_eq!(skill_status(&json!({"status": "error"})), Some(SkillStatus::Error));
        assert_eq!(skill_status(&error_result("boom")), Some(SkillStatus::Error));
        assert_eq!(skill_status(&json!({"rows": 3})), None);
        assert!(is_error(&error_result("boom")));
    }

    #[test]
    fn test_handler_fn_executes_closure() {
        let handler = handler_fn(|params| {
            Ok(json!({"status": "success", "period": params["period"].clone()}))
        });
        let result = tokio_test::block_on(handler.execute(json!({"period": "Q4"}))).unwrap();
        assert_eq!(result["period"], "Q4");
    }
}
