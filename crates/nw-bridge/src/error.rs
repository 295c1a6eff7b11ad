//! Routing errors
//!
//! All of these surface to the RPC caller as tool-level errors (`isError`),
//! never as JSON-RPC protocol errors.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteError {
    #[error("No NW.js app connected. Start an NW.js app with the MCP client library.")]
    NoActiveApp,

    #[error("App connection not ready")]
    ConnectionNotReady,

    #[error("Tool call timed out")]
    Timeout { call_id: String, tool: String },

    /// Error reported by the app while executing the call.
    #[error("{0}")]
    Remote(String),

    #[error("Call abandoned: {0}")]
    Abandoned(String),
}

impl RouteError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RouteError::Timeout { .. })
    }
}
