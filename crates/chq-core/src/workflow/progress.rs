//! Progress aggregation
//!
//! Derives per-agent and overall completion from free-text agent replies.

use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::repair::parse_structured;
use super::state::{AgentProgress, WorkflowState};

const DEFAULT_COMPLETION: u8 = 50;
const DEFAULT_CONTRIBUTION: &str = "Task contribution";

static JSON_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid regex"));
static COMPLETION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)completion:?\s*(\d+)%").expect("valid regex"));
static CONTRIBUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)contribution:?\s*([^\n]+)").expect("valid regex"));

/// Completion signals read from one reply
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionInfo {
    pub completion_percentage: u8,
    pub contribution: String,
    pub remaining_work: Vec<String>,
}

impl Default for CompletionInfo {
    fn default() -> Self {
        Self {
            completion_percentage: DEFAULT_COMPLETION,
            contribution: DEFAULT_CONTRIBUTION.to_string(),
            remaining_work: Vec::new(),
        }
    }
}

/// Extract completion info from a reply
///
/// Each field takes the first signal found: a structured JSON object, then
/// the `completion: NN%` / `contribution: ...` patterns. A completion phrase
/// anywhere in the text forces 100%.
pub fn extract_completion_info(text: &str) -> CompletionInfo {
    let mut info = CompletionInfo::default();
    let structured = structured_fields(text);

    let percentage = structured
        .as_ref()
        .and_then(|obj| obj.get("completion_percentage"))
        .and_then(percentage_from_value)
        .or_else(|| {
            COMPLETION
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| clamp_percentage(m.as_str().parse::<u64>().unwrap_or(u64::MAX) as f64))
        });
    if let Some(p) = percentage {
        info.completion_percentage = p;
    }

    let contribution = structured
        .as_ref()
        .and_then(|obj| obj.get("contribution"))
        .and_then(text_from_value)
        .or_else(|| {
            CONTRIBUTION
                .captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
        });
    if let Some(c) = contribution {
        info.contribution = c;
    }

    if let Some(Value::Array(items)) = structured.as_ref().and_then(|obj| obj.get("remaining_work")) {
        info.remaining_work = items.iter().filter_map(text_from_value).collect();
    }

    let lower = text.to_lowercase();
    if lower.contains("task complete") || lower.contains("completed") {
        info.completion_percentage = 100;
    }

    info
}

/// Record an agent reply in `agent_progress`, `task_notes` and `overall_completion`
pub fn update_agent_progress(state: &mut WorkflowState, agent: &str, text: &str) {
    let info = extract_completion_info(text);
    let now = Utc::now();

    let entry = state
        .agent_progress
        .entry(agent.to_string())
        .or_insert_with(|| AgentProgress {
            completion_status: 0,
            contributions: Vec::new(),
            last_updated: now,
        });
    entry.completion_status = info.completion_percentage;
    entry.contributions.push(info.contribution.clone());
    entry.last_updated = now;

    state.append_note(format!("[{}] {}", agent, info.contribution));
    state.overall_completion = overall_completion(state);
}

/// Floor mean of every reporting agent's completion, 0 when none reported
pub fn overall_completion(state: &WorkflowState) -> u8 {
    let count = state.agent_progress.len();
    if count == 0 {
        return 0;
    }
    let sum: usize = state
        .agent_progress
        .values()
        .map(|p| p.completion_status as usize)
        .sum();
    (sum / count) as u8
}

/// Structured fields from a fenced json block, or from the text itself when
/// it is a bare JSON object
fn structured_fields(text: &str) -> Option<serde_json::Map<String, Value>> {
    let from_block = JSON_BLOCK
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok());
    let value = match from_block {
        Some(value) => Some(value),
        None if text.trim_start().starts_with('{') => parse_structured(text),
        None => None,
    };
    match value {
        Some(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn percentage_from_value(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => n.as_f64().map(clamp_percentage),
        Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .trim()
            .parse::<f64>()
            .ok()
            .map(clamp_percentage),
        _ => None,
    }
}

fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::String(_) | Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn clamp_percentage(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_for_plain_text() {
        let info = extract_completion_info("Here are three job listings.");
        assert_eq!(info, CompletionInfo::default());
    }

    #[test]
    fn test_regex_fallback() {
        let info = extract_completion_info("Completion: 40%\nContribution: drafted summary\nmore text");
        assert_eq!(info.completion_percentage, 40);
        assert_eq!(info.contribution, "drafted summary");
    }

    #[test]
    fn test_structured_block_wins_over_regex() {
        let text = "completion: 10%\n```json\n{\"completion_percentage\": 70, \"contribution\": \"ranked jobs\", \"remaining_work\": [\"apply\"]}\n```";
        let info = extract_completion_info(text);
        assert_eq!(info.completion_percentage, 70);
        assert_eq!(info.contribution, "ranked jobs");
        assert_eq!(info.remaining_work, vec!["apply".to_string()]);
    }

    #[test]
    fn test_bare_json_object_is_structured() {
        let info = extract_completion_info(r#"{"completion_percentage":30,"contribution":"reviewed resume"}"#);
        assert_eq!(info.completion_percentage, 30);
        assert_eq!(info.contribution, "reviewed resume");
    }

    #[test]
    fn test_completion_phrase_forces_full() {
        let info = extract_completion_info("Completion: 20%. Analysis completed.");
        assert_eq!(info.completion_percentage, 100);
        let info = extract_completion_info("TASK COMPLETE");
        assert_eq!(info.completion_percentage, 100);
    }

    #[test]
    fn test_percentages_are_clamped() {
        assert_eq!(extract_completion_info("completion: 250%").completion_percentage, 100);
        let info = extract_completion_info(r#"{"completion_percentage": -5}"#);
        assert_eq!(info.completion_percentage, 0);
    }

    #[test]
    fn test_update_appends_history_and_notes() {
        let mut state = WorkflowState::default();
        update_agent_progress(&mut state, "resume_agent", "completion: 40%\ncontribution: first pass");
        update_agent_progress(&mut state, "resume_agent", "completion: 60%\ncontribution: second pass");

        let progress = &state.agent_progress["resume_agent"];
        assert_eq!(progress.completion_status, 60);
        assert_eq!(progress.contributions, vec!["first pass", "second pass"]);
        assert_eq!(
            state.task_notes,
            "[resume_agent] first pass\n[resume_agent] second pass"
        );
        assert_eq!(state.overall_completion, 60);
    }

    #[test]
    fn test_overall_is_floor_mean_of_reporters() {
        let mut state = WorkflowState::default();
        assert_eq!(overall_completion(&state), 0);

        update_agent_progress(&mut state, "resume_agent", "completion: 33%");
        update_agent_progress(&mut state, "job_search_agent", "completion: 50%");
        update_agent_progress(&mut state, "salary_agent", "completion: 0%");
        // (33 + 50 + 0) / 3 = 27.67
        assert_eq!(state.overall_completion, 27);
    }

    #[test]
    fn test_overall_is_order_independent() {
        let replies = [
            ("resume_agent", "completion: 10%"),
            ("job_search_agent", "completion: 95%"),
            ("interview_agent", "done, task complete"),
        ];
        let mut forward = WorkflowState::default();
        for (agent, text) in replies {
            update_agent_progress(&mut forward, agent, text);
        }
        let mut backward = WorkflowState::default();
        for (agent, text) in replies.iter().rev() {
            update_agent_progress(&mut backward, agent, text);
        }
        assert_eq!(forward.overall_completion, backward.overall_completion);
        assert_eq!(forward.overall_completion, 68);
    }
}
