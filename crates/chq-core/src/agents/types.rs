//! Team member types and the specialized agent trait
//!
//! Defines the core types for the agent team:
//! - TeamMember: every routing target the supervisor can delegate to
//! - SpecializedAgent trait: interface for the worker agents
//! - AgentOutput: the last message a worker produced

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::workflow::WorkflowState;
use crate::{Error, Result};

/// Assignee recorded for tasks no team member claims
pub const UNASSIGNED: &str = "unassigned";

/// A member of the agent team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamMember {
    ResumeAgent,
    JobSearchAgent,
    ApplicationAgent,
    InterviewAgent,
    SalaryAgent,
    Reporter,
}

impl TeamMember {
    /// All members, in routing-table order
    pub const ALL: [TeamMember; 6] = [
        Self::ResumeAgent,
        Self::JobSearchAgent,
        Self::ApplicationAgent,
        Self::InterviewAgent,
        Self::SalaryAgent,
        Self::Reporter,
    ];

    /// Worker agents (everyone except the reporter), in keyword-match order
    pub const WORKERS: [TeamMember; 5] = [
        Self::ResumeAgent,
        Self::JobSearchAgent,
        Self::ApplicationAgent,
        Self::InterviewAgent,
        Self::SalaryAgent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResumeAgent => "resume_agent",
            Self::JobSearchAgent => "job_search_agent",
            Self::ApplicationAgent => "application_agent",
            Self::InterviewAgent => "interview_agent",
            Self::SalaryAgent => "salary_agent",
            Self::Reporter => "reporter",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ResumeAgent => "Analyzes and optimizes resumes to match job requirements",
            Self::JobSearchAgent => "Searches for job listings based on user criteria",
            Self::ApplicationAgent => "Manages job applications and generates cover letters",
            Self::InterviewAgent => "Prepares interview questions and provides feedback",
            Self::SalaryAgent => "Analyzes compensation and provides negotiation strategies",
            Self::Reporter => "Summarizes findings and creates final reports",
        }
    }

    /// Whether the planner may leave this member out of a plan
    pub fn is_optional(&self) -> bool {
        matches!(
            self,
            Self::ApplicationAgent | Self::InterviewAgent | Self::SalaryAgent
        )
    }

    pub fn is_worker(&self) -> bool {
        !matches!(self, Self::Reporter)
    }

    /// Keywords that tie a free-text plan label to this member
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Self::ResumeAgent => &["resume"],
            Self::JobSearchAgent => &["job", "search"],
            Self::ApplicationAgent => &["application", "apply"],
            Self::InterviewAgent => &["interview"],
            Self::SalaryAgent => &["salary", "compensation"],
            Self::Reporter => &[],
        }
    }

    /// Check if a label mentions one of this member's keywords
    pub fn matches(&self, label: &str) -> bool {
        let lower = label.to_lowercase();
        self.keywords().iter().any(|k| lower.contains(k))
    }

    /// Map a plan label to the first worker whose keywords it mentions
    pub fn for_label(label: &str) -> Option<Self> {
        Self::WORKERS.into_iter().find(|m| m.matches(label))
    }
}

impl fmt::Display for TeamMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TeamMember {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| Error::Other(format!("Unknown team member: {}", s)))
    }
}

/// Output of a specialized agent run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentOutput {
    /// The last message the agent produced
    pub last_message: String,
}

impl AgentOutput {
    pub fn new(last_message: impl Into<String>) -> Self {
        Self {
            last_message: last_message.into(),
        }
    }
}

/// Specialized agent that performs one member's domain work
///
/// Implementations see the whole workflow state and return only their
/// final message; the worker node takes care of bookkeeping.
#[async_trait]
pub trait SpecializedAgent: Send + Sync + 'static {
    /// The team member this agent acts as
    fn member(&self) -> TeamMember;

    /// Run the agent against the current state
    async fn run(&self, state: &WorkflowState) -> Result<AgentOutput>;
}
