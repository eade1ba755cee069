//! # Skill Manifest
//!
//! Parses `skill.yaml` descriptors. `name` and `description` are required;
//! everything else has a default.

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File that marks a directory as a skill
pub const MANIFEST_FILE: &str = "skill.yaml";

pub const DEFAULT_ENTRY_POINT: &str = "main";
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Per-skill load failure. The registry logs it and moves on.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("manifest is missing required field '{0}'")]
    MissingField(&'static str),
}

/// On-disk shape; required fields are optional here so a missing one is
/// reported by name instead of as a generic YAML error.
#[derive(Debug, Deserialize)]
struct RawManifest {
    name: Option<String>,
    description: Option<String>,
    #[serde(default)]
    triggers: Vec<String>,
    entry_point: Option<String>,
    version: Option<YamlValue>,
}

/// Static descriptor of one discovered skill. Immutable after load.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SkillManifest {
    pub name: String,
    pub description: String,
    /// Lowercased trigger phrases, in manifest order
    pub triggers: Vec<String>,
    /// Entry point relative to `directory`
    pub entry_point: String,
    pub version: String,
    /// Owning skill directory
    pub directory: PathBuf,
}

impl SkillManifest {
    /// Read and parse `<directory>/skill.yaml`
    pub fn load(directory: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(directory.join(MANIFEST_FILE))?;
        Self::parse(&content, directory)
    }

    /// Parse manifest text belonging to `directory`
    pub fn parse(content: &str, directory: &Path) -> Result<Self, ManifestError> {
        let raw: RawManifest = serde_yaml::from_str(content)?;

        let name = raw
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or(ManifestError::MissingField("name"))?;
        let description = raw
            .description
            .ok_or(ManifestError::MissingField("description"))?;

        let mut triggers = Vec::with_capacity(raw.triggers.len());
        for trigger in raw.triggers {
            if trigger.trim().is_empty() {
                tracing::warn!(skill = %name, "Ignoring empty trigger phrase");
                continue;
            }
            triggers.push(trigger.to_lowercase());
        }

        Ok(Self {
            name,
            description,
            triggers,
            entry_point: raw
                .entry_point
                .unwrap_or_else(|| DEFAULT_ENTRY_POINT.to_string()),
            version: raw
                .version
                .as_ref()
                .and_then(version_string)
                .unwrap_or_else(|| DEFAULT_VERSION.to_string()),
            directory: directory.to_path_buf(),
        })
    }

    /// Absolute-or-relative path of the entry point file
    pub fn entry_path(&self) -> PathBuf {
        self.directory.join(&self.entry_point)
    }

    /// First trigger phrase contained in already-lowercased `text`
    pub fn matching_trigger(&self, text: &str) -> Option<&str> {
        self.triggers
            .iter()
            .find(|t| text.contains(t.as_str()))
            .map(String::as_str)
    }

    pub fn summary(&self) -> SkillSummary {
        SkillSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            triggers: self.triggers.clone(),
            version: self.version.clone(),
        }
    }
}

/// YAML authors write `version: 2` or `version: 1.5` as often as strings.
fn version_string(value: &YamlValue) -> Option<String> {
    match value {
        YamlValue::String(s) => Some(s.clone()),
        YamlValue::Number(n) => Some(n.to_string()),
        YamlValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Public view of a skill, as returned by search and listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkillSummary {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub version: String,
}
