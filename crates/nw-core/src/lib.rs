//! Core types and utilities for nwjs-mcp
//!
//! # Modules
//!
//! - `config`: `.env` parsing and environment lookups
//! - `content`: MCP tool-result content blocks
//! - `error`: wire serialization error and Result alias
//! - `wire`: Messages exchanged between the bridge and connected apps

pub mod config;
pub mod content;
pub mod error;
pub mod wire;

// Re-exports
pub use content::{ContentBlock, ToolOutput};
pub use error::{Error, Result};
pub use wire::WireMessage;

/// Default WebSocket port apps connect to.
pub const DEFAULT_WS_PORT: u16 = 3940;

/// Environment variable naming the NW.js executable.
pub const NWJS_PATH_VAR: &str = "NWJS_PATH";
