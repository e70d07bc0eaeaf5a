//! Default Specialized Agent Implementation
//!
//! Provides a specialized agent that answers with a single prompted model
//! call.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::types::{AgentOutput, SpecializedAgent, TeamMember};
use crate::llm::{LanguageModel, ModelProfile};
use crate::prompt::{NodeKind, PromptBuilder};
use crate::workflow::WorkflowState;
use crate::{Error, Result};

/// Specialized agent backed by a language model and a prompt template
pub struct PromptedAgent {
    member: TeamMember,
    model: Arc<dyn LanguageModel>,
    prompts: Arc<dyn PromptBuilder>,
    profile: Option<ModelProfile>,
}

impl PromptedAgent {
    /// Create a new prompted agent
    pub fn new(
        member: TeamMember,
        model: Arc<dyn LanguageModel>,
        prompts: Arc<dyn PromptBuilder>,
    ) -> Self {
        Self {
            member,
            model,
            prompts,
            profile: None,
        }
    }

    /// Pin the model profile instead of following the run's deep-thinking option
    pub fn with_profile(mut self, profile: ModelProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    fn profile_for(&self, state: &WorkflowState) -> ModelProfile {
        self.profile
            .unwrap_or_else(|| ModelProfile::for_deep_thinking(state.options.deep_thinking_mode))
    }
}

#[async_trait]
impl SpecializedAgent for PromptedAgent {
    fn member(&self) -> TeamMember {
        self.member
    }

    async fn run(&self, state: &WorkflowState) -> Result<AgentOutput> {
        let start_time = Instant::now();
        let profile = self.profile_for(state);
        let messages = self.prompts.build(NodeKind::Member(self.member), state);

        info!("Agent '{}' running with {} profile", self.member, profile);

        let reply = self
            .model
            .invoke(profile, &messages)
            .await
            .map_err(|e| Error::AgentExecution(format!("{}: {}", self.member, e)))?;

        debug!("Agent '{}' raw reply: {}", self.member, reply);
        info!(
            "Agent '{}' completed in {}ms",
            self.member,
            start_time.elapsed().as_millis()
        );

        Ok(AgentOutput::new(reply))
    }
}
