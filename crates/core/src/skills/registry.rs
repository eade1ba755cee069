//! Skill registry for discovering and matching skills.
//!
//! The registry scans the immediate subdirectories of a root directory,
//! parses every `skill.yaml` it finds, and answers trigger searches. It is
//! read-only after [`SkillRegistry::load`] returns, so one instance can be
//! shared behind an `Arc` by any number of concurrent runs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::manifest::{SkillManifest, SkillSummary, MANIFEST_FILE};

/// Discovered skills in load order
#[derive(Debug, Clone, Default)]
pub struct SkillRegistry {
    base_path: PathBuf,
    skills: Vec<SkillManifest>,
    index: HashMap<String, usize>,
}

impl SkillRegistry {
    /// Creates a registry with no skills.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads every skill under `base_path`.
    ///
    /// A missing root is not fatal: the registry is simply empty. A
    /// subdirectory whose manifest fails to parse is logged and skipped.
    /// Subdirectories are visited in file-name order so load order (and
    /// therefore search order) is stable across platforms.
    pub fn load(base_path: impl AsRef<Path>) -> Self {
        let base_path = base_path.as_ref().to_path_buf();
        let mut registry = Self {
            base_path: base_path.clone(),
            ..Self::default()
        };

        if !base_path.is_dir() {
            tracing::warn!(path = %base_path.display(), "Skills base path does not exist");
            return registry;
        }

        tracing::info!(path = %base_path.display(), "Loading skills");

        let entries = WalkDir::new(&base_path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable skills directory entry");
                    None
                }
            });

        for entry in entries {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            if !dir.join(MANIFEST_FILE).is_file() {
                tracing::debug!(path = %dir.display(), "No {} found, skipping", MANIFEST_FILE);
                continue;
            }
            match SkillManifest::load(dir) {
                Ok(manifest) => {
                    tracing::info!(skill = %manifest.name, version = %manifest.version, "Loaded skill");
                    registry.insert(manifest);
                }
                Err(e) => {
                    tracing::error!(path = %dir.display(), error = %e, "Failed to load skill");
                }
            }
        }

        tracing::info!(count = registry.len(), "Skill registry ready");
        registry
    }

    /// Builds a registry from already-parsed manifests, keeping their order.
    pub fn from_manifests(manifests: impl IntoIterator<Item = SkillManifest>) -> Self {
        let mut registry = Self::default();
        for manifest in manifests {
            registry.insert(manifest);
        }
        registry
    }

    /// A later manifest with an existing name replaces the earlier one but
    /// keeps its position.
    fn insert(&mut self, manifest: SkillManifest) {
        match self.index.get(&manifest.name) {
            Some(&position) => {
                tracing::warn!(
                    skill = %manifest.name,
                    replaced = %self.skills[position].directory.display(),
                    "Duplicate skill name, later manifest wins"
                );
                self.skills[position] = manifest;
            }
            None => {
                self.index.insert(manifest.name.clone(), self.skills.len());
                self.skills.push(manifest);
            }
        }
    }

    /// Returns skills whose triggers occur in `query` or `context`.
    ///
    /// Matching is case-insensitive substring containment against
    /// `"{query} {context}"`. No ranking: results keep load order and each
    /// skill appears at most once.
    pub fn search_skills(&self, query: &str, context: &str) -> Vec<SkillSummary> {
        let combined = format!("{} {}", query, context).to_lowercase();
        self.skills
            .iter()
            .filter(|skill| skill.matching_trigger(&combined).is_some())
            .map(SkillManifest::summary)
            .collect()
    }

    /// Gets a skill by name.
    pub fn get_by_name(&self, name: &str) -> Option<&SkillManifest> {
        self.index.get(name).map(|&i| &self.skills[i])
    }

    /// All skills in load order.
    pub fn list_all(&self) -> &[SkillManifest] {
        &self.skills
    }

    /// Summaries of all skills, suitable for display.
    pub fn summaries(&self) -> Vec<SkillSummary> {
        self.skills.iter().map(SkillManifest::summary).collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.skills.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_skill(root: &Path, dir: &str, yaml: &str) {
        let path = root.join(dir);
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join(MANIFEST_FILE), yaml).unwrap();
    }

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        write_skill(
            temp.path(),
            "report_generator",
            "name: report_generator\ndescription: Generates reports\ntriggers: [report, quarterly]\nentry_point: main\n",
        );
        write_skill(
            temp.path(),
            "email_composer",
            "name: email_composer\ndescription: Drafts emails\ntriggers: [email, compose]\n",
        );
        write_skill(
            temp.path(),
            "broken",
            "description: manifest without a name\n",
        );
        fs::create_dir_all(temp.path().join("not_a_skill")).unwrap();
        fs::write(temp.path().join("README.md"), "loose file").unwrap();
        temp
    }

    #[test]
    fn test_load_skips_invalid_and_plain_dirs() {
        let temp = fixture();
        let registry = SkillRegistry::load(temp.path());

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["email_composer", "report_generator"]);
    }

    #[test]
    fn test_missing_base_path_is_empty() {
        let registry = SkillRegistry::load("/tmp/no_such_skills_dir_for_skillflow");
        assert!(registry.is_empty());
        assert!(registry.search_skills("report", "").is_empty());
        assert!(registry.get_by_name("report_generator").is_none());
    }

    #[test]
    fn test_search_matches_once_per_skill() {
        let temp = fixture();
        let registry = SkillRegistry::load(temp.path());

        let results = registry.search_skills("Quarterly REPORT please", "");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "report_generator");
    }

    #[test]
    fn test_search_uses_context_and_keeps_load_order() {
        let temp = fixture();
        let registry = SkillRegistry::load(temp.path());

        let results = registry.search_skills("make a report", "then email it");
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["email_composer", "report_generator"]);
    }

    #[test]
    fn test_search_no_match() {
        let temp = fixture();
        let registry = SkillRegistry::load(temp.path());
        assert!(registry.search_skills("tell me a joke", "").is_empty());
    }

    #[test]
    fn test_get_by_name_is_total_over_list_all() {
        let temp = fixture();
        let registry = SkillRegistry::load(temp.path());

        for manifest in registry.list_all() {
            assert_eq!(registry.get_by_name(&manifest.name), Some(manifest));
        }
        assert!(registry.get_by_name("nonexistent").is_none());
    }

    #[test]
    fn test_duplicate_name_replaces_in_place() {
        let first = SkillManifest::parse("name: a\ndescription: first\n", Path::new("one")).unwrap();
        let other = SkillManifest::parse("name: b\ndescription: other\n", Path::new("two")).unwrap();
        let second = SkillManifest::parse("name: a\ndescription: second\n", Path::new("three")).unwrap();

        let registry = SkillRegistry::from_manifests([first, other, second]);
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(registry.get_by_name("a").unwrap().description, "second");
    }
}
