use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Command, Node, NodeId};
use crate::agents::TeamMember;
use crate::llm::{LanguageModel, ModelProfile};
use crate::prompt::{NodeKind, PromptBuilder};
use crate::workflow::{
    complete_task, repair_json_output, task_ids_for, Route, TaskStatus, WorkflowState,
};
use crate::Result;

/// Note the reporter leaves once the final report exists
pub const REPORTER_NOTE: &str = "[reporter] Task complete. Final report generated.";

/// Writes the final report and marks the run complete
pub struct ReporterNode {
    model: Arc<dyn LanguageModel>,
    prompts: Arc<dyn PromptBuilder>,
}

impl ReporterNode {
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Arc<dyn PromptBuilder>) -> Self {
        Self { model, prompts }
    }
}

#[async_trait]
impl Node for ReporterNode {
    async fn run(&self, mut state: WorkflowState) -> Result<Command> {
        info!("Reporter writing final report");
        let member = TeamMember::Reporter;
        let messages = self.prompts.build(NodeKind::Member(member), &state);
        let reply = self.model.invoke(ModelProfile::Basic, &messages).await?;
        let report = repair_json_output(&reply);
        debug!("Reporter response: {}", report);

        state.append_note(REPORTER_NOTE);
        state.overall_completion = 100;
        state.next = Some(Route::Finish);
        state.push_message(member.as_str(), report);

        for id in task_ids_for(&state, member.as_str(), TaskStatus::InProgress) {
            complete_task(&mut state, &id);
        }

        Ok(Command::new(state, NodeId::Supervisor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::TemplatePromptBuilder;
    use crate::test_support::ScriptedModel;
    use crate::workflow::{find_task, register_task, update_agent_progress, update_task_status, RunOptions};

    fn reporter(model: Arc<ScriptedModel>) -> ReporterNode {
        ReporterNode::new(model, Arc::new(TemplatePromptBuilder::new()))
    }

    #[tokio::test]
    async fn test_reporter_marks_run_complete() {
        let mut state = WorkflowState::new("Review my resume", RunOptions::default());
        update_agent_progress(&mut state, "resume_agent", "Completion: 40%");
        assert_eq!(state.overall_completion, 40);
        let id = register_task(&mut state, "Final report", "reporter");
        update_task_status(&mut state, &id, TaskStatus::InProgress);

        let model = Arc::new(ScriptedModel::new(["# Summary\nYour resume is in good shape."]));
        let command = reporter(model).run(state).await.unwrap();

        assert_eq!(command.goto, NodeId::Supervisor);
        let state = command.state;
        assert_eq!(state.overall_completion, 100);
        assert_eq!(state.next, Some(Route::Finish));
        assert!(state.task_notes.ends_with(REPORTER_NOTE));
        assert_eq!(state.last_message().unwrap().speaker, "reporter");
        assert_eq!(find_task(&state, &id).unwrap().status, TaskStatus::Completed);
        assert_eq!(state.recursion_count, 0);
    }

    #[tokio::test]
    async fn test_reporter_sees_transcript() {
        let mut state = WorkflowState::new("Find me a job", RunOptions::default());
        state.push_message("job_search_agent", "Found 3 roles");
        let model = Arc::new(ScriptedModel::new(["Report"]));
        reporter(model.clone()).run(state).await.unwrap();

        let calls = model.calls();
        assert_eq!(calls[0].0, ModelProfile::Basic);
        assert!(calls[0].1.iter().any(|m| m.content.contains("Found 3 roles")));
    }
}
