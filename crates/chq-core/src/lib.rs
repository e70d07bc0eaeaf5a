//! chq-core: CareerHQ Workflow Core Library
//!
//! コーディネーター、プランナー、スーパーバイザー、専門エージェントを
//! グラフとして実行するワークフロー制御のコア機能を提供します。

pub mod agents;
pub mod config;
pub mod error;
pub mod graph;
pub mod llm;
pub mod nodes;
pub mod prompt;
pub mod service;
pub mod workflow;

#[cfg(test)]
mod test_support;

pub use agents::{AgentOutput, AgentRoster, PromptedAgent, SpecializedAgent, TeamMember};
pub use config::{Config, LlmConfig, LlmProvider, RateLimitConfig, WorkflowConfig};
pub use error::{Error, Result};
pub use graph::{build_career_graph, CompiledGraph, GraphBuilder, RunEvent, Snapshot};
pub use llm::{LanguageModel, LlmClient, Message, ModelProfile, RateLimiter, ThrottledModel};
pub use nodes::{Command, Node, NodeId};
pub use prompt::{NodeKind, PromptBuilder, TemplatePromptBuilder};
pub use service::{ClientEvent, ClientEventKind, WorkflowService};
pub use workflow::{Route, RunOptions, Task, TaskId, TaskStatus, WorkflowState};
