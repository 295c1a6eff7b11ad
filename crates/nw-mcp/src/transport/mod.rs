//! Transport Layer
//!
//! - Stdio (newline-delimited JSON-RPC on stdin/stdout)
//! - HTTP (`POST /mcp`, one JSON body in, one out)

mod http;
mod stdio;

pub use http::HttpTransport;
pub use stdio::{LineBuffer, StdioTransport};

use anyhow::Result;
use std::sync::Arc;

/// Raw-message dispatch shared by every transport
#[async_trait::async_trait]
pub trait McpHandler: Send + Sync {
    async fn handle_message(&self, raw: &str) -> crate::McpResponse;
}

/// Transport trait - implement for new transport types
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Serve requests using this transport
    async fn serve<H: McpHandler + 'static>(self, handler: Arc<H>) -> Result<()>;
}

#[async_trait::async_trait]
impl McpHandler for crate::McpServer {
    async fn handle_message(&self, raw: &str) -> crate::McpResponse {
        crate::McpServer::handle_message(self, raw).await
    }
}
