//! Workflow state model
//!
//! One `WorkflowState` exists per run. Nodes receive it by value and hand
//! back the next value; the graph executor keeps the authoritative copy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::agents::TeamMember;
use crate::{Error, Result};

/// Speaker recorded for the incoming user turn
pub const USER_SPEAKER: &str = "user";

/// Sentinel routing target that ends the run
pub const FINISH: &str = "FINISH";

/// One entry of the run transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub speaker: String,
    pub content: String,
}

impl TranscriptMessage {
    pub fn new(speaker: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            content: content.into(),
        }
    }

    /// Create the user's request message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(USER_SPEAKER, content)
    }

    /// Team member this message is attributed to, if any
    pub fn member(&self) -> Option<TeamMember> {
        self.speaker.parse().ok()
    }
}

/// Routing target chosen by the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Route {
    Member(TeamMember),
    Finish,
}

impl Route {
    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Member(member) => f.write_str(member.as_str()),
            Self::Finish => f.write_str(FINISH),
        }
    }
}

impl FromStr for Route {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case(FINISH) {
            Ok(Self::Finish)
        } else {
            s.parse().map(Self::Member)
        }
    }
}

impl TryFrom<String> for Route {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Route> for String {
    fn from(route: Route) -> Self {
        route.to_string()
    }
}

/// Status of a planned task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
}

/// Unique identifier for a registered task
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unit of planned work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Display name; not unique
    pub name: String,
    pub status: TaskStatus,
    /// Team member name or "unassigned"
    pub assigned_to: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Running progress estimate for one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentProgress {
    /// 0-100 percentage
    pub completion_status: u8,
    pub contributions: Vec<String>,
    pub last_updated: DateTime<Utc>,
}

/// Options fixed at request start
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    #[serde(default)]
    pub deep_thinking_mode: bool,
    #[serde(default = "default_search_before_planning")]
    pub search_before_planning: bool,
    #[serde(default)]
    pub user_profile: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub document_context: serde_json::Map<String, serde_json::Value>,
}

fn default_search_before_planning() -> bool {
    true
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            deep_thinking_mode: false,
            search_before_planning: default_search_before_planning(),
            user_profile: serde_json::Map::new(),
            document_context: serde_json::Map::new(),
        }
    }
}

/// State threaded through every node of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct WorkflowState {
    /// Append-only transcript, oldest first
    pub messages: Vec<TranscriptMessage>,
    pub next: Option<Route>,
    pub full_plan: String,
    #[serde(flatten)]
    pub options: RunOptions,
    pub recursion_count: u32,
    pub agent_progress: BTreeMap<String, AgentProgress>,
    pub overall_completion: u8,
    pub task_registry: Vec<Task>,
    pub completed_tasks: Vec<String>,
    pub task_notes: String,
}

impl WorkflowState {
    /// Create the initial state for a user request
    pub fn new(request: impl Into<String>, options: RunOptions) -> Self {
        Self {
            messages: vec![TranscriptMessage::user(request)],
            options,
            ..Default::default()
        }
    }

    /// Append a transcript message
    pub fn push_message(&mut self, speaker: impl Into<String>, content: impl Into<String>) {
        self.messages.push(TranscriptMessage::new(speaker, content));
    }

    /// Most recent transcript message
    pub fn last_message(&self) -> Option<&TranscriptMessage> {
        self.messages.last()
    }

    /// Append a line to the progress notes
    pub fn append_note(&mut self, note: impl AsRef<str>) {
        if !self.task_notes.is_empty() {
            self.task_notes.push('\n');
        }
        self.task_notes.push_str(note.as_ref());
    }

    /// Speakers of transcript messages attributed to team members, oldest first
    pub fn member_history(&self) -> Vec<TeamMember> {
        self.messages.iter().filter_map(|m| m.member()).collect()
    }
}
