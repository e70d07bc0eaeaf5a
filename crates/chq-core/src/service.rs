//! Workflow service
//!
//! Entry point for callers: turns a request into a stream of client-facing
//! events.

use chrono::{DateTime, Utc};
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::agents::AgentRoster;
use crate::config::Config;
use crate::graph::{build_career_graph, CompiledGraph, RunEvent};
use crate::llm::{LanguageModel, LlmClient, RateLimiter, ThrottledModel};
use crate::prompt::{PromptBuilder, TemplatePromptBuilder};
use crate::workflow::{RunOptions, TranscriptMessage, WorkflowState};
use crate::Result;

/// Kind of client event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientEventKind {
    /// A message produced on the way to the answer
    Intermediate,
    /// The answer; last event of a successful run
    Final,
    /// The run failed; last event
    Error,
}

/// Event delivered to the caller of `process_request`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEvent {
    #[serde(rename = "type")]
    pub kind: ClientEventKind,
    /// Absent on error events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    pub content: String,
    pub step: usize,
    pub timestamp: DateTime<Utc>,
}

impl ClientEvent {
    fn message(kind: ClientEventKind, message: &TranscriptMessage, step: usize) -> Self {
        Self {
            kind,
            speaker: Some(message.speaker.clone()),
            content: message.content.clone(),
            step,
            timestamp: Utc::now(),
        }
    }

    fn error(message: String, step: usize) -> Self {
        Self {
            kind: ClientEventKind::Error,
            speaker: None,
            content: message,
            step,
            timestamp: Utc::now(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == ClientEventKind::Error
    }
}

/// Runs career assistant requests
#[derive(Clone)]
pub struct WorkflowService {
    graph: CompiledGraph,
    defaults: RunOptions,
}

impl WorkflowService {
    pub fn new(graph: CompiledGraph, defaults: RunOptions) -> Self {
        Self { graph, defaults }
    }

    /// Wire the LLM client, rate limiter, prompts and agents from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = LlmClient::new(&config.llm)?;
        let model: Arc<dyn LanguageModel> = Arc::new(ThrottledModel::new(
            client,
            RateLimiter::from_config(&config.rate_limit),
        ));
        let prompts: Arc<dyn PromptBuilder> = Arc::new(TemplatePromptBuilder::new());
        let roster = AgentRoster::prompted(model.clone(), prompts.clone());
        let graph = build_career_graph(model, prompts, &roster, config.workflow.recursion_limit)?;

        info!(
            "Workflow service ready (provider: {:?}, recursion limit: {})",
            config.llm.provider, config.workflow.recursion_limit
        );
        Ok(Self::new(graph, config.workflow.run_options()))
    }

    /// Run options used when the caller has no preference
    pub fn default_options(&self) -> RunOptions {
        self.defaults.clone()
    }

    /// Stream the events of one request
    ///
    /// The newest message is held back until the next snapshot so the run's
    /// last message arrives once, as the final event.
    pub fn process_request(
        &self,
        request: impl Into<String>,
        options: RunOptions,
    ) -> BoxStream<'static, ClientEvent> {
        let request = request.into();
        info!("Processing request ({} chars)", request.chars().count());
        let initial = WorkflowState::new(request, options);

        // The user's own message is never echoed back
        let mut seen = initial.messages.len();
        let mut events = self.graph.stream(initial);

        Box::pin(async_stream::stream! {
            let mut held: Option<ClientEvent> = None;
            let mut step = 0;

            while let Some(event) = events.next().await {
                match event {
                    RunEvent::Snapshot(snapshot) => {
                        step = snapshot.step;
                        let messages = &snapshot.state.messages;
                        for message in messages.iter().skip(seen) {
                            let event = ClientEvent::message(ClientEventKind::Intermediate, message, step);
                            if let Some(previous) = held.replace(event) {
                                yield previous;
                            }
                        }
                        seen = seen.max(messages.len());

                        if snapshot.goto.is_end() {
                            if let Some(mut last) = held.take() {
                                last.kind = ClientEventKind::Final;
                                last.step = step;
                                yield last;
                            }
                        }
                    }
                    RunEvent::Error { message } => {
                        if let Some(previous) = held.take() {
                            yield previous;
                        }
                        yield ClientEvent::error(message, step);
                    }
                }
            }

            if let Some(previous) = held.take() {
                yield previous;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::TeamMember;
    use crate::test_support::{ScriptedModel, StubAgent};
    use serde_json::json;

    fn service(model: Arc<ScriptedModel>) -> WorkflowService {
        let mut roster = AgentRoster::new();
        for member in TeamMember::WORKERS {
            roster.register(Arc::new(StubAgent::new(member, "Done.\nCompletion: 50%")));
        }
        let graph = build_career_graph(model, Arc::new(TemplatePromptBuilder::new()), &roster, 30)
            .unwrap();
        WorkflowService::new(graph, RunOptions::default())
    }

    fn decision(next: &str, steps: i64) -> String {
        json!({
            "next": next,
            "confidence": 1.0,
            "reasoning": "",
            "estimated_steps_remaining": steps
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_direct_answer_is_single_final_event() {
        let model = Arc::new(ScriptedModel::new(["Hello! How can I help?"]));
        let service = service(model);
        let events: Vec<ClientEvent> = service
            .process_request("hi", service.default_options())
            .collect()
            .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ClientEventKind::Final);
        assert_eq!(events[0].speaker.as_deref(), Some("coordinator"));
        assert_eq!(events[0].content, "Hello! How can I help?");
        assert_eq!(events[0].step, 1);
    }

    #[tokio::test]
    async fn test_delegated_run_ends_with_final_event() {
        let model = Arc::new(ScriptedModel::new([
            "handoff_to_planner".to_string(),
            r#"{"tasks":[{"name":"Find roles","agent":"job_search_agent"}]}"#.to_string(),
            decision("job_search_agent", 1),
            decision("FINISH", 0),
        ]));
        let events: Vec<ClientEvent> = service(model)
            .process_request("Find me a job", RunOptions::default())
            .collect()
            .await;

        let speakers: Vec<Option<&str>> = events.iter().map(|e| e.speaker.as_deref()).collect();
        assert_eq!(
            speakers,
            vec![Some("coordinator"), Some("planner"), Some("job_search_agent")]
        );
        assert!(events[..2].iter().all(|e| e.kind == ClientEventKind::Intermediate));
        let last = events.last().unwrap();
        assert_eq!(last.kind, ClientEventKind::Final);
        assert_eq!(last.content, "Done.\nCompletion: 50%");
        assert_eq!(last.step, 5);
        assert_eq!(events.iter().filter(|e| e.kind == ClientEventKind::Final).count(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_terminal_error_event() {
        let model = Arc::new(ScriptedModel::new(["handoff_to_planner"]).then_fail("upstream 500"));
        let events: Vec<ClientEvent> = service(model)
            .process_request("Find me a job", RunOptions::default())
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, ClientEventKind::Intermediate);
        assert!(events[1].is_error());
        assert!(events[1].content.contains("upstream 500"));
        assert_eq!(events[1].speaker, None);

        let json = serde_json::to_value(&events[1]).unwrap();
        assert_eq!(json["type"], "error");
        assert!(json.get("speaker").is_none());
    }
}
