//! nw-client: the app side of the NW.js MCP bridge
//!
//! Embedded in the controlled application. The embedding supplies a [`Dom`]
//! over its page and, optionally, a [`HostWindow`] over its NW.js window;
//! [`AppClient`] then connects to the bridge and executes tool calls.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nw_client::{AppClient, ClientConfig, MemoryDom, ToolExecutor};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let dom = Arc::new(MemoryDom::new("Demo"));
//! let executor = Arc::new(ToolExecutor::new(dom));
//! let client = Arc::new(AppClient::new(ClientConfig::new("Demo"), executor));
//! client.run().await
//! # }
//! ```

pub mod client;
pub mod console;
pub mod dom;
pub mod error;
pub mod events;
pub mod executor;
pub mod host;
pub mod keys;
pub mod session;
pub mod snapshot;

pub use client::{AppClient, ClientConfig};
pub use console::{ConsoleCapture, ConsoleEntry, ConsoleLevel};
pub use dom::{Dom, DomEvent, ElementId, EvalError, MemoryDom, Rect};
pub use error::{ExecError, HostError, Result};
pub use events::{EventSynthesizer, MouseButton};
pub use executor::{zoom_level_for_scale, ExecutorConfig, ToolExecutor};
pub use host::{ArgvInfo, Bounds, HostWindow, MemoryHost};
pub use session::Session;
pub use snapshot::{RefTable, Snapshot, SnapshotBuilder, PAGE_REF};
