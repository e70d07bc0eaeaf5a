use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::info;

use super::executor::CompiledGraph;
use crate::agents::{AgentRoster, TeamMember};
use crate::llm::LanguageModel;
use crate::nodes::{CoordinatorNode, Node, NodeId, PlannerNode, ReporterNode, SupervisorNode, WorkerNode};
use crate::prompt::PromptBuilder;
use crate::{Error, Result};

/// Declares nodes, edges and the entry point of a graph
#[derive(Default)]
pub struct GraphBuilder {
    nodes: HashMap<NodeId, Arc<dyn Node>>,
    edges: HashMap<NodeId, HashSet<NodeId>>,
    entry: Option<NodeId>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(mut self, id: NodeId, node: Arc<dyn Node>) -> Self {
        self.nodes.insert(id, node);
        self
    }

    pub fn add_edge(mut self, from: NodeId, to: NodeId) -> Self {
        self.edges.entry(from).or_default().insert(to);
        self
    }

    pub fn add_edges(self, from: NodeId, targets: impl IntoIterator<Item = NodeId>) -> Self {
        targets
            .into_iter()
            .fold(self, |builder, to| builder.add_edge(from, to))
    }

    pub fn set_entry_point(mut self, id: NodeId) -> Self {
        self.entry = Some(id);
        self
    }

    /// Validate the graph
    ///
    /// Every edge must start at a registered node and end at a registered
    /// node or `END`; `END` itself cannot be registered.
    pub fn compile(self, recursion_limit: usize) -> Result<CompiledGraph> {
        if recursion_limit == 0 {
            return Err(Error::Graph("Recursion limit must be at least 1".to_string()));
        }
        if self.nodes.contains_key(&NodeId::End) {
            return Err(Error::Graph(format!("{} cannot be registered as a node", NodeId::End)));
        }

        let entry = self
            .entry
            .ok_or_else(|| Error::Graph("Entry point not set".to_string()))?;
        if !self.nodes.contains_key(&entry) {
            return Err(Error::Graph(format!("Entry point {} is not a registered node", entry)));
        }

        for (from, targets) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(Error::Graph(format!("Edge starts at unknown node {}", from)));
            }
            if let Some(to) = targets.iter().find(|t| !t.is_end() && !self.nodes.contains_key(t)) {
                return Err(Error::Graph(format!("Edge {} -> {} ends at unknown node", from, to)));
            }
        }

        info!(
            "Compiled graph with {} nodes, entry {}, recursion limit {}",
            self.nodes.len(),
            entry,
            recursion_limit
        );

        Ok(CompiledGraph {
            nodes: Arc::new(self.nodes),
            edges: Arc::new(self.edges),
            entry,
            recursion_limit,
        })
    }
}

/// The career assistant graph
///
/// coordinator -> planner -> supervisor <-> team members, ending at the
/// coordinator, the planner or the supervisor. Every worker needs an agent
/// in `roster`.
pub fn build_career_graph(
    model: Arc<dyn LanguageModel>,
    prompts: Arc<dyn PromptBuilder>,
    roster: &AgentRoster,
    recursion_limit: usize,
) -> Result<CompiledGraph> {
    let missing = roster.missing_workers();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|m| m.as_str()).collect();
        return Err(Error::Graph(format!("No agent registered for {}", names.join(", "))));
    }

    let members = TeamMember::ALL.map(NodeId::Member);

    let mut builder = GraphBuilder::new()
        .add_node(
            NodeId::Coordinator,
            Arc::new(CoordinatorNode::new(model.clone(), prompts.clone())),
        )
        .add_node(
            NodeId::Planner,
            Arc::new(PlannerNode::new(model.clone(), prompts.clone())),
        )
        .add_node(
            NodeId::Supervisor,
            Arc::new(SupervisorNode::new(model.clone(), prompts.clone())),
        )
        .add_node(
            NodeId::Member(TeamMember::Reporter),
            Arc::new(ReporterNode::new(model, prompts)),
        )
        .add_edges(NodeId::Coordinator, [NodeId::Planner, NodeId::End])
        .add_edges(NodeId::Planner, [NodeId::Supervisor, NodeId::End])
        .add_edges(NodeId::Supervisor, members.into_iter().chain([NodeId::End]))
        .set_entry_point(NodeId::Coordinator);

    for member in TeamMember::WORKERS {
        builder = builder.add_node(
            NodeId::Member(member),
            Arc::new(WorkerNode::new(roster.require(member)?)),
        );
    }
    for member in members {
        builder = builder.add_edge(member, NodeId::Supervisor);
    }

    builder.compile(recursion_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::Command;
    use crate::prompt::TemplatePromptBuilder;
    use crate::test_support::{ScriptedModel, StubAgent};
    use crate::workflow::WorkflowState;
    use async_trait::async_trait;

    struct Noop;

    #[async_trait]
    impl Node for Noop {
        async fn run(&self, state: WorkflowState) -> Result<Command> {
            Ok(Command::new(state, NodeId::End))
        }
    }

    #[test]
    fn test_compile_validation() {
        let missing_entry = GraphBuilder::new()
            .add_node(NodeId::Coordinator, Arc::new(Noop))
            .compile(5);
        assert!(matches!(missing_entry, Err(Error::Graph(_))));

        let dangling = GraphBuilder::new()
            .add_node(NodeId::Coordinator, Arc::new(Noop))
            .add_edge(NodeId::Coordinator, NodeId::Planner)
            .set_entry_point(NodeId::Coordinator)
            .compile(5);
        assert!(matches!(dangling, Err(Error::Graph(_))));

        let end_node = GraphBuilder::new()
            .add_node(NodeId::Coordinator, Arc::new(Noop))
            .add_node(NodeId::End, Arc::new(Noop))
            .set_entry_point(NodeId::Coordinator)
            .compile(5);
        assert!(matches!(end_node, Err(Error::Graph(_))));

        let zero_limit = GraphBuilder::new()
            .add_node(NodeId::Coordinator, Arc::new(Noop))
            .set_entry_point(NodeId::Coordinator)
            .compile(0);
        assert!(zero_limit.is_err());

        let ok = GraphBuilder::new()
            .add_node(NodeId::Coordinator, Arc::new(Noop))
            .add_edge(NodeId::Coordinator, NodeId::End)
            .set_entry_point(NodeId::Coordinator)
            .compile(5)
            .unwrap();
        assert_eq!(ok.entry(), NodeId::Coordinator);
        assert_eq!(ok.recursion_limit(), 5);
    }

    #[test]
    fn test_career_graph_requires_every_worker() {
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let prompts = Arc::new(TemplatePromptBuilder::new());

        let mut roster = AgentRoster::new();
        roster.register(Arc::new(StubAgent::new(TeamMember::ResumeAgent, "ok")));
        let result = build_career_graph(model.clone(), prompts.clone(), &roster, 30);
        match result {
            Err(Error::Graph(message)) => assert!(message.contains("salary_agent")),
            _ => panic!("expected graph error"),
        }

        let roster = AgentRoster::prompted(model.clone(), prompts.clone());
        let graph = build_career_graph(model, prompts, &roster, 30).unwrap();
        assert_eq!(graph.entry(), NodeId::Coordinator);
    }
}
