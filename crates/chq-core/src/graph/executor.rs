use futures::stream::{BoxStream, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::event::{RunEvent, Snapshot};
use crate::nodes::{Command, Node, NodeId};
use crate::workflow::WorkflowState;
use crate::{Error, Result};

/// Validated graph ready to run
///
/// Cloning is cheap; runs share nothing mutable.
#[derive(Clone)]
pub struct CompiledGraph {
    pub(super) nodes: Arc<HashMap<NodeId, Arc<dyn Node>>>,
    pub(super) edges: Arc<HashMap<NodeId, HashSet<NodeId>>>,
    pub(super) entry: NodeId,
    pub(super) recursion_limit: usize,
}

impl CompiledGraph {
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Maximum node invocations per run
    pub fn recursion_limit(&self) -> usize {
        self.recursion_limit
    }

    fn allows(&self, from: NodeId, to: NodeId) -> bool {
        self.edges.get(&from).is_some_and(|targets| targets.contains(&to))
    }

    /// Run the graph, yielding one snapshot per node invocation
    ///
    /// The stream ends after the snapshot routed to `END`, or with a single
    /// error.
    fn steps(&self, initial: WorkflowState) -> BoxStream<'static, Result<Snapshot>> {
        let graph = self.clone();

        Box::pin(async_stream::stream! {
            let mut state = initial;
            let mut current = graph.entry;
            let mut step = 0usize;

            loop {
                if step >= graph.recursion_limit {
                    error!("Run aborted: recursion limit of {} reached at {}", graph.recursion_limit, current);
                    yield Err(Error::RecursionLimit(graph.recursion_limit));
                    break;
                }
                step += 1;

                let Some(node) = graph.nodes.get(&current).cloned() else {
                    yield Err(Error::Graph(format!("Node not found: {}", current)));
                    break;
                };

                debug!("Step {}: running {}", step, current);
                let options = state.options.clone();
                let Command { state: mut next, goto } = match node.run(state).await {
                    Ok(command) => command,
                    Err(e) => {
                        error!("Run aborted: {} failed: {}", current, e);
                        yield Err(e);
                        break;
                    }
                };

                if !graph.allows(current, goto) {
                    error!("Run aborted: {} routed to undeclared edge {}", current, goto);
                    yield Err(Error::Graph(format!("No edge from {} to {}", current, goto)));
                    break;
                }

                // Run options are fixed at request start
                next.options = options;
                state = next;
                info!("Step {}: {} -> {}", step, current, goto);

                yield Ok(Snapshot {
                    step,
                    node: current,
                    goto,
                    state: state.clone(),
                });

                if goto.is_end() {
                    break;
                }
                current = goto;
            }
        })
    }

    /// Stream run events
    pub fn stream(&self, initial: WorkflowState) -> BoxStream<'static, RunEvent> {
        self.steps(initial)
            .map(|step| match step {
                Ok(snapshot) => RunEvent::Snapshot(snapshot),
                Err(e) => RunEvent::Error {
                    message: e.to_string(),
                },
            })
            .boxed()
    }

    /// Run to completion and return the final state
    pub async fn invoke(&self, initial: WorkflowState) -> Result<WorkflowState> {
        let mut steps = self.steps(initial);
        let mut last = None;
        while let Some(step) = steps.next().await {
            last = Some(step?.state);
        }
        last.ok_or_else(|| Error::Graph("Run produced no steps".to_string()))
    }
}
