use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by a tool backend while listing or executing tools
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum AgentError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

/// Errors surfaced to the caller of a tool-calling exchange
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Model API error: {status} {status_text}")]
    Gateway {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Tool(#[from] AgentError),

    #[error("Tool use {0} has no matching tool result")]
    UnresolvedToolUse(String),

    #[error("Tool result {0} does not answer a tool use of the preceding assistant turn")]
    OrphanToolResult(String),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
