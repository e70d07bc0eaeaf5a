//! Agent Roster
//!
//! Holds one specialized agent per worker member.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::default::PromptedAgent;
use super::types::{SpecializedAgent, TeamMember};
use crate::llm::LanguageModel;
use crate::prompt::PromptBuilder;
use crate::{Error, Result};

/// Registered specialized agents, keyed by member
#[derive(Clone, Default)]
pub struct AgentRoster {
    agents: HashMap<TeamMember, Arc<dyn SpecializedAgent>>,
}

impl AgentRoster {
    /// Create a new empty roster
    pub fn new() -> Self {
        Self::default()
    }

    /// Roster with a `PromptedAgent` for every worker
    pub fn prompted(model: Arc<dyn LanguageModel>, prompts: Arc<dyn PromptBuilder>) -> Self {
        let mut roster = Self::new();
        for member in TeamMember::WORKERS {
            roster.register(Arc::new(PromptedAgent::new(
                member,
                model.clone(),
                prompts.clone(),
            )));
        }
        roster
    }

    /// Register an agent, replacing any agent for the same member
    pub fn register(&mut self, agent: Arc<dyn SpecializedAgent>) {
        let member = agent.member();
        if !member.is_worker() {
            warn!("Registering {} as a specialized agent; it will not be routed to", member);
        }
        info!("Registering specialized agent: {}", member);
        self.agents.insert(member, agent);
    }

    /// Get the agent for a member
    pub fn get(&self, member: TeamMember) -> Option<Arc<dyn SpecializedAgent>> {
        self.agents.get(&member).cloned()
    }

    /// Get the agent for a member or fail
    pub fn require(&self, member: TeamMember) -> Result<Arc<dyn SpecializedAgent>> {
        self.get(member)
            .ok_or_else(|| Error::Graph(format!("No agent registered for {}", member)))
    }

    /// Registered members in routing-table order
    pub fn members(&self) -> Vec<TeamMember> {
        TeamMember::ALL
            .into_iter()
            .filter(|m| self.agents.contains_key(m))
            .collect()
    }

    /// Workers without a registered agent
    pub fn missing_workers(&self) -> Vec<TeamMember> {
        TeamMember::WORKERS
            .into_iter()
            .filter(|m| !self.agents.contains_key(m))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
