use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::{Command, Node, NodeId};
use crate::llm::{LanguageModel, ModelProfile};
use crate::prompt::{NodeKind, PromptBuilder, HANDOFF_TO_PLANNER};
use crate::workflow::{repair_json_output, WorkflowState};
use crate::Result;

/// Entry gate: answers simple requests, hands the rest to the planner
pub struct CoordinatorNode {
    model: Arc<dyn LanguageModel>,
    prompts: Arc<dyn PromptBuilder>,
}

impl CoordinatorNode {
    pub fn new(model: Arc<dyn LanguageModel>, prompts: Arc<dyn PromptBuilder>) -> Self {
        Self { model, prompts }
    }
}

#[async_trait]
impl Node for CoordinatorNode {
    async fn run(&self, mut state: WorkflowState) -> Result<Command> {
        info!("Coordinator talking");
        let messages = self.prompts.build(NodeKind::Coordinator, &state);
        let reply = self.model.invoke(ModelProfile::Basic, &messages).await?;
        debug!("Coordinator reply: {}", reply);

        let goto = if reply.contains(HANDOFF_TO_PLANNER) {
            info!("Coordinator handing off to planner");
            NodeId::Planner
        } else {
            info!("Coordinator answered directly");
            NodeId::End
        };

        state.push_message(NodeId::Coordinator.name(), repair_json_output(&reply));
        Ok(Command::new(state, goto))
    }
}
