//! LLM API client and model interface
//!
//! Supports both Claude API and OpenAI-compatible APIs.

mod client;
mod model;
mod throttle;
mod types;

pub use client::LlmClient;
pub use model::{parse_structured_reply, schema_instruction, LanguageModel, ModelProfile};
pub use throttle::{RateLimiter, ThrottledModel};
pub use types::*;
