//! nw-mcp: MCP protocol server for NW.js apps
//!
//! Speaks JSON-RPC to an MCP client on stdio (and optionally HTTP), and
//! forwards tool calls to whichever connected NW.js app is active.
//!
//! Architecture:
//! stdin → LineBuffer → McpServer → Registry::call_tool → app WebSocket
//!
//! Methods:
//! - initialize / initialized / ping
//! - tools/list → static catalog
//! - tools/call → local app-management tools, or forwarded to the active app

pub mod catalog;
pub mod config;
pub mod init;
pub mod launcher;
pub mod protocol;
pub mod server;
pub mod transport;

pub use catalog::ToolInfo;
pub use launcher::{AppLauncher, LaunchError, NwPathResolver, StartAppArgs};
pub use protocol::{JsonRpcError, McpRequest, McpResponse};
pub use server::McpServer;

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "nwjs-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
