//! Error types for chq-core

use thiserror::Error;

/// Main error type for chq-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("LLM API error: {0}")]
    LlmApi(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The model replied, but not in the shape that was asked for
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    #[error("Agent execution error: {0}")]
    AgentExecution(String),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Recursion limit of {0} node invocations reached")]
    RecursionLimit(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for chq-core
pub type Result<T> = std::result::Result<T, Error>;
