//! Workflow graph
//!
//! A graph is a set of nodes, the edges each node may take and an entry
//! point. Executing it threads one `WorkflowState` through the nodes and
//! reports a snapshot after every step.

mod builder;
mod event;
mod executor;

pub use builder::{build_career_graph, GraphBuilder};
pub use event::{RunEvent, Snapshot};
pub use executor::CompiledGraph;
