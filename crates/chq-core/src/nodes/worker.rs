use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Command, Node, NodeId};
use crate::agents::SpecializedAgent;
use crate::workflow::{
    complete_task, repair_json_output, task_ids_for, update_agent_progress, TaskStatus,
    WorkflowState,
};
use crate::Result;

/// Runs one specialized agent and records its contribution
pub struct WorkerNode {
    agent: Arc<dyn SpecializedAgent>,
}

impl WorkerNode {
    pub fn new(agent: Arc<dyn SpecializedAgent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Node for WorkerNode {
    async fn run(&self, mut state: WorkflowState) -> Result<Command> {
        let member = self.agent.member();
        info!("{} starting task", member);

        let output = self.agent.run(&state).await?;
        let content = repair_json_output(&output.last_message);
        debug!("{} response: {}", member, content);

        state.push_message(member.as_str(), content.clone());
        update_agent_progress(&mut state, member.as_str(), &content);

        let finished = task_ids_for(&state, member.as_str(), TaskStatus::InProgress);
        for id in &finished {
            complete_task(&mut state, id);
        }

        info!(
            "{} completed task ({} tasks closed, overall {}%)",
            member,
            finished.len(),
            state.overall_completion
        );
        Ok(Command::new(state, NodeId::Supervisor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::TeamMember;
    use crate::test_support::StubAgent;
    use crate::workflow::{register_task, update_task_status, RunOptions};
    use crate::Error;

    #[tokio::test]
    async fn test_worker_completes_in_progress_tasks() {
        let agent = Arc::new(StubAgent::new(
            TeamMember::ResumeAgent,
            "Rewrote the summary.\nCompletion: 80%\nContribution: summary rewrite",
        ));
        let mut state = WorkflowState::new("Review my resume", RunOptions::default());
        let started = register_task(&mut state, "Analyze resume", "resume_agent");
        let waiting = register_task(&mut state, "Polish resume", "resume_agent");
        let other = register_task(&mut state, "Find jobs", "job_search_agent");
        update_task_status(&mut state, &started, TaskStatus::InProgress);
        update_task_status(&mut state, &other, TaskStatus::InProgress);

        let command = WorkerNode::new(agent.clone()).run(state).await.unwrap();
        assert_eq!(command.goto, NodeId::Supervisor);
        assert_eq!(agent.runs(), 1);

        let state = command.state;
        let status = |id| crate::workflow::find_task(&state, id).unwrap().status;
        assert_eq!(status(&started), TaskStatus::Completed);
        assert_eq!(status(&waiting), TaskStatus::Pending);
        assert_eq!(status(&other), TaskStatus::InProgress);
        assert_eq!(state.completed_tasks, vec!["Analyze resume".to_string()]);

        let progress = &state.agent_progress["resume_agent"];
        assert_eq!(progress.completion_status, 80);
        assert_eq!(progress.contributions, vec!["summary rewrite".to_string()]);
        assert_eq!(state.overall_completion, 80);
        assert_eq!(state.last_message().unwrap().speaker, "resume_agent");
    }

    #[tokio::test]
    async fn test_worker_repairs_reply() {
        let agent = Arc::new(StubAgent::new(
            TeamMember::SalaryAgent,
            "```json\n{\"range\": \"100k-120k\",}\n```",
        ));
        let state = WorkflowState::new("What should I ask for?", RunOptions::default());
        let command = WorkerNode::new(agent).run(state).await.unwrap();
        assert_eq!(
            command.state.last_message().unwrap().content,
            r#"{"range":"100k-120k"}"#
        );
    }

    #[test]
    fn test_worker_does_not_touch_recursion_count() {
        let agent = Arc::new(StubAgent::new(TeamMember::InterviewAgent, "Practice STAR answers."));
        let mut state = WorkflowState::new("Prep me", RunOptions::default());
        state.recursion_count = 2;
        let command = tokio_test::block_on(WorkerNode::new(agent).run(state)).unwrap();
        assert_eq!(command.state.recursion_count, 2);
        assert_eq!(command.goto, NodeId::Supervisor);
    }

    #[tokio::test]
    async fn test_agent_failure_propagates() {
        let agent = Arc::new(StubAgent::failing(TeamMember::ApplicationAgent, "timeout"));
        let state = WorkflowState::new("Plan my career", RunOptions::default());
        let result = WorkerNode::new(agent).run(state).await;
        assert!(matches!(result, Err(Error::AgentExecution(_))));
    }
}
