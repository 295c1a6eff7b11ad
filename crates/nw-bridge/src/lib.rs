//! nw-bridge: connected-app registry and call router
//!
//! Owns every app WebSocket and the correlation table for in-flight tool
//! calls. It knows nothing about JSON-RPC; the protocol engine hands it a
//! tool name and arguments and awaits the app's reply.
//!
//! Architecture:
//! app socket → listener → Registry::handle_message → pending call resolved
//! protocol engine → Registry::call_tool → toolCall on the active app socket

pub mod connection;
pub mod error;
pub mod listener;
pub mod registry;

pub use connection::{AppConnection, ConnectionId};
pub use error::RouteError;
pub use listener::WsListener;
pub use registry::{AppInfo, Registry, RegistryConfig};
