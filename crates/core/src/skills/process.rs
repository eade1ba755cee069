//! Out-of-process skills.
//!
//! The entry point is spawned as a child process in the skill directory.
//! The request is one JSON object on stdin; the child must print one JSON
//! object on stdout and exit zero.

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use super::handler::SkillHandler;

pub const PROTOCOL: &str = "skillflow.skill.v1";

const STDOUT_PREVIEW_CHARS: usize = 4_000;
const STDERR_PREVIEW_CHARS: usize = 2_000;

#[derive(Debug, Serialize)]
struct InvokeRequest<'a> {
    protocol: &'static str,
    skill: &'a str,
    params: &'a Value,
}

/// A skill whose entry point is an executable file
#[derive(Debug, Clone)]
pub struct ProcessSkill {
    name: String,
    program: PathBuf,
    working_dir: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessSkill {
    pub fn new(name: impl Into<String>, program: PathBuf, working_dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            program,
            working_dir,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl SkillHandler for ProcessSkill {
    async fn execute(&self, params: Value) -> anyhow::Result<Value> {
        let request = serde_json::to_string(&InvokeRequest {
            protocol: PROTOCOL,
            skill: &self.name,
            params: &params,
        })
        .context("serialize skill request")?;

        let mut child = Command::new(&self.program)
            .current_dir(&self.working_dir)
            .env("SKILLFLOW_SKILL", &self.name)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.program.display()))?;

        let stdin = child.stdin.take();
        let name = self.name.as_str();
        // Feeding stdin and waiting share one deadline; dropping the child on
        // expiry kills it.
        let exchange = async move {
            if let Some(mut stdin) = stdin {
                let written = async {
                    stdin.write_all(request.as_bytes()).await?;
                    stdin.write_all(b"\n").await?;
                    stdin.shutdown().await
                }
                .await;
                match written {
                    Ok(()) => {}
                    // The child may exit without reading its input
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                        tracing::debug!(skill = %name, "Skill process closed stdin early");
                    }
                    Err(e) => return Err(anyhow::Error::new(e).context("write skill request")),
                }
            }
            child.wait_with_output().await.context("wait for skill process")
        };

        let output = match self.timeout {
            Some(limit) => timeout(limit, exchange)
                .await
                .map_err(|_| anyhow!("skill process timed out after {}s", limit.as_secs()))??,
            None => exchange.await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            bail!(
                "skill process exited with {}: {}",
                output.status,
                preview_text(stderr.trim(), STDERR_PREVIEW_CHARS)
            );
        }

        parse_response(&stdout).with_context(|| {
            format!(
                "invalid skill response: {}",
                preview_text(stdout.trim(), STDOUT_PREVIEW_CHARS)
            )
        })
    }
}

/// Takes the last non-empty stdout line that parses as a JSON object, so a
/// chatty skill can log before printing its result.
fn parse_response(stdout: &str) -> anyhow::Result<Value> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(stdout.trim()) {
        return Ok(value);
    }
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(value @ Value::Object(_)) => Some(value),
            _ => None,
        })
        .ok_or_else(|| anyhow!("expected a JSON object on stdout"))
}

fn preview_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
