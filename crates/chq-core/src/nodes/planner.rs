use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Command, Node, NodeId};
use crate::llm::{LanguageModel, ModelProfile};
use crate::prompt::{NodeKind, PromptBuilder};
use crate::workflow::{parse_plan, register_task, ParsedPlan, WorkflowState};
use crate::Result;

/// Decomposes the request into tasks and registers them
pub struct PlannerNode {
    model: Arc<dyn LanguageModel>,
    prompts: Arc<dyn PromptBuilder>,
}

impl PlannerNode {
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Arc<dyn PromptBuilder>) -> Self {
        Self { model, prompts }
    }
}

#[async_trait]
impl Node for PlannerNode {
    async fn run(&self, mut state: WorkflowState) -> Result<Command> {
        let profile = ModelProfile::for_deep_thinking(state.options.deep_thinking_mode);
        info!("Planner generating full plan with {} profile", profile);

        let messages = self.prompts.build(NodeKind::Planner, &state);
        let raw = self.model.invoke(profile, &messages).await?;
        debug!("Planner response: {}", raw);

        let plan = parse_plan(&raw);
        state.push_message(NodeId::Planner.name(), raw.clone());
        state.full_plan = raw;

        let (tasks, source) = match &plan {
            ParsedPlan::Unparsable => {
                warn!("Planner response is not valid JSON, ending run without delegation");
                state.append_note("Plan rejected: planner output is not valid JSON.");
                return Ok(Command::new(state, NodeId::End));
            }
            ParsedPlan::Structured(tasks) => (tasks, "structured"),
            ParsedPlan::Heuristic(tasks) => (tasks, "heuristic"),
        };

        for task in tasks {
            register_task(&mut state, task.name.clone(), task.agent.clone());
        }
        state.overall_completion = 0;

        // Task names stay out of the notes; the supervisor scans them for completion
        state.append_note(format!("[planner] Generated plan with {} tasks", tasks.len()));
        info!("Planner registered {} tasks from {} plan", tasks.len(), source);

        Ok(Command::new(state, NodeId::Supervisor))
    }
}
