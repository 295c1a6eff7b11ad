//! Error types for nwjs-mcp

use thiserror::Error;

/// Failure encoding or decoding a wire message
#[derive(Error, Debug)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;
