use serde::Serialize;

use crate::nodes::NodeId;
use crate::workflow::WorkflowState;

/// State after one node invocation
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// 1-based node invocation count
    pub step: usize,
    /// Node that just ran
    pub node: NodeId,
    /// Node it routed to
    pub goto: NodeId,
    pub state: WorkflowState,
}

/// Event emitted while a run streams
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Snapshot(Snapshot),
    /// Terminal; no event follows
    Error { message: String },
}

impl RunEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
