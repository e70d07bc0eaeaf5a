//! Workflow state and bookkeeping
//!
//! The state threaded through the graph plus the pure helpers nodes use to
//! update it: output repair, task registry, progress aggregation and plan
//! extraction.

pub mod plan;
pub mod progress;
pub mod registry;
pub mod repair;
pub mod state;

pub use plan::{parse_plan, strip_fence, ParsedPlan, PlannedTask};
pub use progress::{extract_completion_info, update_agent_progress, CompletionInfo};
pub use registry::{
    complete_task, find_task, register_task, task_ids_for, update_task_status,
    update_task_status_by_name,
};
pub use repair::repair_json_output;
pub use state::{
    AgentProgress, Route, RunOptions, Task, TaskId, TaskStatus, TranscriptMessage, WorkflowState,
    FINISH, USER_SPEAKER,
};
