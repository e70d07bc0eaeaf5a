//! Graph nodes
//!
//! Every node takes the current state by value and returns the next state
//! together with the node to run next.

mod coordinator;
mod planner;
mod reporter;
mod supervisor;
mod worker;

pub use coordinator::CoordinatorNode;
pub use planner::PlannerNode;
pub use reporter::{ReporterNode, REPORTER_NOTE};
pub use supervisor::{router_schema, RouterDecision, SupervisorNode, MAX_ROUTING_ATTEMPTS};
pub use worker::WorkerNode;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::agents::TeamMember;
use crate::workflow::{Route, WorkflowState};
use crate::{Error, Result};

/// Identifier of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NodeId {
    Coordinator,
    Planner,
    Supervisor,
    Member(TeamMember),
    /// Terminal sentinel; never registered as a node
    End,
}

impl NodeId {
    pub const END_NAME: &'static str = "__end__";

    pub fn name(&self) -> &'static str {
        match self {
            Self::Coordinator => "coordinator",
            Self::Planner => "planner",
            Self::Supervisor => "supervisor",
            Self::Member(member) => member.as_str(),
            Self::End => Self::END_NAME,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

impl From<Route> for NodeId {
    fn from(route: Route) -> Self {
        match route {
            Route::Member(member) => Self::Member(member),
            Route::Finish => Self::End,
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NodeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "coordinator" => Ok(Self::Coordinator),
            "planner" => Ok(Self::Planner),
            "supervisor" => Ok(Self::Supervisor),
            Self::END_NAME => Ok(Self::End),
            other => other
                .parse::<TeamMember>()
                .map(Self::Member)
                .map_err(|_| Error::Graph(format!("Unknown node: {}", other))),
        }
    }
}

impl TryFrom<String> for NodeId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.name().to_string()
    }
}

/// Output of a node: the next state and where to go
#[derive(Debug, Clone)]
pub struct Command {
    pub state: WorkflowState,
    pub goto: NodeId,
}

impl Command {
    pub fn new(state: WorkflowState, goto: NodeId) -> Self {
        Self { state, goto }
    }
}

/// A unit of work in the graph
#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, state: WorkflowState) -> Result<Command>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_names_round_trip() {
        let ids = [
            NodeId::Coordinator,
            NodeId::Planner,
            NodeId::Supervisor,
            NodeId::Member(TeamMember::InterviewAgent),
            NodeId::Member(TeamMember::Reporter),
            NodeId::End,
        ];
        for id in ids {
            assert_eq!(id.name().parse::<NodeId>().unwrap(), id);
        }
        assert!("FINISH".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_route_maps_to_node() {
        assert_eq!(NodeId::from(Route::Finish), NodeId::End);
        assert_eq!(
            NodeId::from(Route::Member(TeamMember::SalaryAgent)),
            NodeId::Member(TeamMember::SalaryAgent)
        );
    }

    #[test]
    fn test_node_id_serializes_as_name() {
        let json = serde_json::to_string(&NodeId::End).unwrap();
        assert_eq!(json, r#""__end__""#);
    }
}
