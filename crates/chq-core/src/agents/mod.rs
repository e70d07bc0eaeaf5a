//! Specialized agents
//!
//! ```text
//! Supervisor ──route──▶ WorkerNode(member) ──run──▶ AgentRoster[member]
//!                                                     └─ PromptedAgent / custom SpecializedAgent
//! ```
//!
//! Worker nodes own the bookkeeping; agents only produce a reply.

pub mod default;
pub mod manager;
pub mod types;

// Re-exports
pub use default::PromptedAgent;
pub use manager::AgentRoster;
pub use types::{AgentOutput, SpecializedAgent, TeamMember, UNASSIGNED};
