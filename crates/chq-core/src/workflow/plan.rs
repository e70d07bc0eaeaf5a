//! Plan extraction
//!
//! Turns the planner's raw reply into a list of tasks. A reply that is not
//! valid JSON yields `ParsedPlan::Unparsable` and no tasks are registered.

use serde_json::Value;
use std::sync::LazyLock;

use regex::Regex;

use crate::agents::{TeamMember, UNASSIGNED};

/// Optional list marker in front of a heuristic `label: description` line
static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d#*+-]+[\s.)]*").expect("valid regex"));

/// A task extracted from a plan, before registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTask {
    pub name: String,
    /// Team member name or "unassigned"
    pub agent: String,
}

impl PlannedTask {
    pub fn new(name: impl Into<String>, agent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            agent: agent.into(),
        }
    }
}

/// Result of reading a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedPlan {
    /// Tasks read from a `tasks` or `steps` array
    Structured(Vec<PlannedTask>),
    /// Tasks read from `label: description` lines
    Heuristic(Vec<PlannedTask>),
    /// The reply is not valid JSON
    Unparsable,
}

impl ParsedPlan {
    pub fn tasks(&self) -> &[PlannedTask] {
        match self {
            Self::Structured(tasks) | Self::Heuristic(tasks) => tasks,
            Self::Unparsable => &[],
        }
    }

    pub fn is_valid(&self) -> bool {
        !matches!(self, Self::Unparsable)
    }
}

/// Strip one wrapping code fence (```` ```json ```` or ```` ``` ````)
pub fn strip_fence(text: &str) -> &str {
    let mut trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```json") {
        trimmed = rest;
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        trimmed = rest;
    }
    if let Some(rest) = trimmed.strip_suffix("```") {
        trimmed = rest;
    }
    trimmed.trim()
}

/// Read a plan from the planner's raw reply
pub fn parse_plan(raw: &str) -> ParsedPlan {
    let cleaned = strip_fence(raw);
    let Ok(value) = serde_json::from_str::<Value>(cleaned) else {
        return ParsedPlan::Unparsable;
    };

    match structured_tasks(&value) {
        Some(tasks) => ParsedPlan::Structured(tasks),
        None => ParsedPlan::Heuristic(heuristic_tasks(cleaned)),
    }
}

/// Resolve a plan's agent label to a member name
///
/// Exact member names win, then keyword matching, then "unassigned".
pub fn resolve_agent(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .parse::<TeamMember>()
        .ok()
        .or_else(|| TeamMember::for_label(label))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNASSIGNED.to_string())
}

fn structured_tasks(value: &Value) -> Option<Vec<PlannedTask>> {
    let obj = value.as_object()?;

    if let Some(Value::Array(items)) = obj.get("tasks") {
        return Some(
            items
                .iter()
                .filter_map(|item| task_from_item(item, &["name", "task", "description"]))
                .collect(),
        );
    }
    if let Some(Value::Array(items)) = obj.get("steps") {
        return Some(
            items
                .iter()
                .filter_map(|item| task_from_item(item, &["action", "description", "name", "title"]))
                .collect(),
        );
    }
    None
}

fn task_from_item(item: &Value, name_keys: &[&str]) -> Option<PlannedTask> {
    if let Value::String(name) = item {
        let name = name.trim();
        return (!name.is_empty()).then(|| PlannedTask::new(name, resolve_agent(name)));
    }

    let obj = item.as_object()?;
    let name = name_keys
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())?;
    let agent = ["agent", "agent_name", "assigned_to"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str))
        .map(resolve_agent)
        .unwrap_or_else(|| UNASSIGNED.to_string());

    Some(PlannedTask::new(name, agent))
}

fn heuristic_tasks(text: &str) -> Vec<PlannedTask> {
    text.lines()
        .filter_map(|line| {
            let line = LIST_MARKER.replace(line.trim(), "");
            let (label, description) = line.split_once(':')?;
            let description = description.trim();
            if description.is_empty() {
                return None;
            }
            let agent = TeamMember::for_label(label)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| UNASSIGNED.to_string());
            Some(PlannedTask::new(description, agent))
        })
        .collect()
}
