//! Prompt templates bundled at compile time, plus the builders that turn
//! pipeline data into the user-side message for each model call.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::skills::{SkillContext, SkillSummary};

/// Skill router: answer is a JSON array of names
pub const SELECT: &str = include_str!("defaults/select.md");

/// Parameter extractor: answer is a JSON object
pub const PARAMETERS: &str = include_str!("defaults/parameters.md");

/// Final reply over execution results
pub const RESPOND: &str = include_str!("defaults/respond.md");

pub const NO_DOCUMENTATION: &str = "(no documentation)";
pub const NO_SCHEMA: &str = "(no schema)";
pub const NO_SKILL_RESULTS: &str = "(no skill results)";

pub fn selection_request(query: &str, available: &[SkillSummary]) -> String {
    let skills = serde_json::to_string_pretty(available).unwrap_or_else(|_| "[]".to_string());
    format!("User query: {}\n\nAvailable skills:\n{}", query, skills)
}

pub fn parameter_request(query: &str, context: Option<&SkillContext>) -> String {
    let doc = context
        .and_then(SkillContext::doc)
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(NO_DOCUMENTATION);
    let schema = context
        .and_then(SkillContext::schema)
        .and_then(|s| serde_json::to_string(s).ok())
        .unwrap_or_else(|| NO_SCHEMA.to_string());

    format!(
        "User request: {}\n\nSkill documentation:\n{}\n\nParameter schema:\n{}",
        query, doc, schema
    )
}

/// Results are listed in `order` first, then any remaining keys.
pub fn respond_request(query: &str, order: &[String], results: &BTreeMap<String, Value>) -> String {
    let mut names: Vec<&str> = order
        .iter()
        .map(String::as_str)
        .filter(|name| results.contains_key(*name))
        .collect();
    for name in results.keys() {
        if !names.contains(&name.as_str()) {
            names.push(name);
        }
    }

    let block = if names.is_empty() {
        NO_SKILL_RESULTS.to_string()
    } else {
        names
            .iter()
            .filter_map(|name| {
                let result = results.get(*name)?;
                let pretty = serde_json::to_string_pretty(result).ok()?;
                Some(format!("--- {} result ---\n{}", name, pretty))
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!("User request: {}\n\nSkill execution results:\n{}", query, block)
}
