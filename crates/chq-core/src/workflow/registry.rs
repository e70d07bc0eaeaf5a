//! Task registry
//!
//! Bookkeeping over `WorkflowState::task_registry`. Tasks are addressed by a
//! generated `TaskId`; names are for display and may repeat.

use chrono::Utc;
use tracing::debug;

use super::state::{Task, TaskId, TaskStatus, WorkflowState};

/// Register a new pending task and return its id
pub fn register_task(state: &mut WorkflowState, name: impl Into<String>, agent: impl Into<String>) -> TaskId {
    let task = Task {
        id: TaskId::default(),
        name: name.into(),
        status: TaskStatus::Pending,
        assigned_to: agent.into(),
        created_at: Utc::now(),
        completed_at: None,
    };
    debug!(
        "Registered task: {} ({}) assigned to {}",
        task.name,
        task.id.as_str(),
        task.assigned_to
    );
    let id = task.id.clone();
    state.task_registry.push(task);
    id
}

/// Update the status of a task
///
/// Returns false when no task has the given id.
pub fn update_task_status(state: &mut WorkflowState, id: &TaskId, status: TaskStatus) -> bool {
    let Some(task) = state.task_registry.iter_mut().find(|t| &t.id == id) else {
        return false;
    };
    apply_status(task, status);
    sync_completed_tasks(state);
    true
}

/// Update the status of the first task with the given name
pub fn update_task_status_by_name(state: &mut WorkflowState, name: &str, status: TaskStatus) -> bool {
    let Some(task) = state.task_registry.iter_mut().find(|t| t.name == name) else {
        return false;
    };
    apply_status(task, status);
    sync_completed_tasks(state);
    true
}

/// Mark a task as completed
pub fn complete_task(state: &mut WorkflowState, id: &TaskId) -> bool {
    update_task_status(state, id, TaskStatus::Completed)
}

/// Look up a task by id
pub fn find_task<'a>(state: &'a WorkflowState, id: &TaskId) -> Option<&'a Task> {
    state.task_registry.iter().find(|t| &t.id == id)
}

/// Ids of tasks assigned to an agent with the given status, in registration order
pub fn task_ids_for(state: &WorkflowState, agent: &str, status: TaskStatus) -> Vec<TaskId> {
    state
        .task_registry
        .iter()
        .filter(|t| t.assigned_to == agent && t.status == status)
        .map(|t| t.id.clone())
        .collect()
}

fn apply_status(task: &mut Task, status: TaskStatus) {
    let previous = task.status;
    task.status = status;
    if status == TaskStatus::Completed {
        task.completed_at = Some(Utc::now());
    } else if previous == TaskStatus::Completed {
        task.completed_at = None;
    }
}

/// Keep `completed_tasks` equal to the names of completed tasks
///
/// Existing entries keep their order; a name is appended the first time a
/// task carrying it completes and dropped once no completed task carries it.
fn sync_completed_tasks(state: &mut WorkflowState) {
    let registry = &state.task_registry;
    let is_completed =
        |name: &str| registry.iter().any(|t| t.name == name && t.status == TaskStatus::Completed);

    state.completed_tasks.retain(|name| is_completed(name));
    for task in registry {
        if task.status == TaskStatus::Completed && !state.completed_tasks.contains(&task.name) {
            state.completed_tasks.push(task.name.clone());
        }
    }
}
