//! Supervisor routing state machine
//!
//! One invocation makes one routing decision:
//! 1. ask the model for a `RouterDecision` (retried once, then FINISH)
//! 2. completion overrides, first match wins
//! 3. circular-delegation guard
//! 4. accept the delegation

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Command, Node, NodeId};
use crate::agents::TeamMember;
use crate::llm::{LanguageModel, ModelProfile};
use crate::prompt::{NodeKind, PromptBuilder};
use crate::workflow::{
    task_ids_for, update_task_status, Route, TaskStatus, TranscriptMessage, WorkflowState, FINISH,
};
use crate::{Error, Result};

/// Model calls per decision before failing closed
pub const MAX_ROUTING_ATTEMPTS: usize = 2;

const COMPLETION_THRESHOLD: u8 = 95;
const LOW_CONFIDENCE: f64 = 0.7;
const LOW_CONFIDENCE_MIN_DELEGATIONS: u32 = 5;
const CIRCULAR_MIN_DELEGATIONS: u32 = 3;

/// Structured routing decision
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouterDecision {
    pub next: Route,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub estimated_steps_remaining: i64,
}

fn default_confidence() -> f64 {
    1.0
}

impl RouterDecision {
    /// Decision used when the model never produced a valid one
    pub fn fail_closed() -> Self {
        Self {
            next: Route::Finish,
            confidence: 0.0,
            reasoning: "No valid routing decision".to_string(),
            estimated_steps_remaining: 0,
        }
    }
}

/// JSON schema of `RouterDecision`
pub fn router_schema() -> Value {
    let mut options: Vec<&str> = TeamMember::ALL.iter().map(|m| m.as_str()).collect();
    options.push(FINISH);
    json!({
        "type": "object",
        "properties": {
            "next": {"type": "string", "enum": options},
            "confidence": {"type": "number", "minimum": 0, "maximum": 1},
            "reasoning": {"type": "string"},
            "estimated_steps_remaining": {"type": "integer", "minimum": 0}
        },
        "required": ["next", "confidence", "reasoning", "estimated_steps_remaining"]
    })
}

/// Why the supervisor ended the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinishReason {
    ModelChoseFinish,
    NotesSayComplete,
    OverallComplete,
    LowConfidence,
    NoStepsRemaining,
    CircularDelegation,
}

impl FinishReason {
    fn describe(&self) -> &'static str {
        match self {
            Self::ModelChoseFinish => "model chose FINISH",
            Self::NotesSayComplete => "task notes report completion",
            Self::OverallComplete => "overall completion reached threshold",
            Self::LowConfidence => "low confidence after repeated delegation",
            Self::NoStepsRemaining => "no steps remaining",
            Self::CircularDelegation => "circular delegation detected",
        }
    }
}

/// Routes work between team members and decides when the run is done
pub struct SupervisorNode {
    model: Arc<dyn LanguageModel>,
    prompts: Arc<dyn PromptBuilder>,
    schema: Value,
}

impl SupervisorNode {
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Arc<dyn PromptBuilder>) -> Self {
        Self {
            model,
            prompts,
            schema: router_schema(),
        }
    }

    /// Ask the model for a decision, retrying malformed replies once
    async fn decide(&self, state: &WorkflowState) -> Result<RouterDecision> {
        let view = transcript_view(state);
        let messages = self.prompts.build(NodeKind::Supervisor, &view);

        for attempt in 1..=MAX_ROUTING_ATTEMPTS {
            let result = self
                .model
                .invoke_structured(ModelProfile::Basic, &messages, &self.schema)
                .await
                .and_then(|value| {
                    debug!("Supervisor raw decision: {}", value);
                    serde_json::from_value::<RouterDecision>(value)
                        .map_err(|e| Error::MalformedOutput(e.to_string()))
                });

            match result {
                Ok(decision) => return Ok(decision),
                Err(Error::MalformedOutput(reason)) => {
                    warn!(
                        "Supervisor got malformed decision (attempt {}/{}): {}",
                        attempt, MAX_ROUTING_ATTEMPTS, reason
                    );
                }
                Err(e) => return Err(e),
            }
        }

        warn!("Supervisor failing closed to FINISH");
        Ok(RouterDecision::fail_closed())
    }
}

#[async_trait]
impl Node for SupervisorNode {
    async fn run(&self, mut state: WorkflowState) -> Result<Command> {
        let decision = self.decide(&state).await?;

        let finish = completion_override(&state, &decision).or_else(|| {
            is_circular(&state.member_history(), state.recursion_count)
                .then_some(FinishReason::CircularDelegation)
        });

        if let Some(reason) = finish {
            info!("Workflow completed: {}", reason.describe());
            state.next = Some(Route::Finish);
            return Ok(Command::new(state, NodeId::End));
        }

        let Route::Member(member) = decision.next else {
            // FINISH is always caught by the first override
            state.next = Some(Route::Finish);
            return Ok(Command::new(state, NodeId::End));
        };

        state.recursion_count += 1;
        for id in task_ids_for(&state, member.as_str(), TaskStatus::Pending) {
            update_task_status(&mut state, &id, TaskStatus::InProgress);
        }
        state.next = Some(decision.next);

        info!(
            "Supervisor delegating to: {} (recursion {}, confidence: {:.2}, steps remaining: {})",
            member, state.recursion_count, decision.confidence, decision.estimated_steps_remaining
        );
        if !decision.reasoning.is_empty() {
            debug!("Supervisor reasoning: {}", decision.reasoning);
        }

        Ok(Command::new(state, NodeId::Member(member)))
    }
}

/// State copy whose team-member messages use the response template
fn transcript_view(state: &WorkflowState) -> WorkflowState {
    let mut view = state.clone();
    view.messages = state
        .messages
        .iter()
        .map(|m| match m.member() {
            Some(member) => TranscriptMessage::new(m.speaker.clone(), format_response(member, &m.content)),
            None => m.clone(),
        })
        .collect();
    view
}

/// Wrap a team member's reply in the response template
pub fn format_response(member: TeamMember, content: &str) -> String {
    format!(
        "Response from {}:\n\n<response>\n{}\n</response>\n\n*Please execute the next step.*",
        member, content
    )
}

fn completion_override(state: &WorkflowState, decision: &RouterDecision) -> Option<FinishReason> {
    if decision.next.is_finish() {
        Some(FinishReason::ModelChoseFinish)
    } else if state.task_notes.to_lowercase().contains("task complete") {
        Some(FinishReason::NotesSayComplete)
    } else if state.overall_completion >= COMPLETION_THRESHOLD {
        Some(FinishReason::OverallComplete)
    } else if state.recursion_count >= LOW_CONFIDENCE_MIN_DELEGATIONS
        && decision.confidence < LOW_CONFIDENCE
    {
        Some(FinishReason::LowConfidence)
    } else if decision.estimated_steps_remaining <= 0 {
        Some(FinishReason::NoStepsRemaining)
    } else {
        None
    }
}

/// Last four member speakers alternate A,B,A,B with A != B
fn is_circular(history: &[TeamMember], recursion_count: u32) -> bool {
    if recursion_count < CIRCULAR_MIN_DELEGATIONS || history.len() < 4 {
        return false;
    }
    let last = &history[history.len() - 4..];
    last[0] == last[2] && last[1] == last[3] && last[0] != last[1]
}
