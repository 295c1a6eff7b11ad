//! Execution errors
//!
//! Every variant is reported back to the bridge as the `error` string of a
//! `toolResult`, so the Display text is what the MCP client ends up seeing.

use thiserror::Error;

use crate::dom::EvalError;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("NW.js API not available")]
    HostUnavailable,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Timeout waiting for {0}")]
    WaitTimeout(String),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure reported by a host window implementation.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("{0} is not supported by this host")]
    Unsupported(&'static str),

    #[error("{0}")]
    Failed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ExecError>;
