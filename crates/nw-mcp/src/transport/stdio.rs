//! Stdio Transport
//!
//! Reads newline-delimited JSON-RPC from stdin and writes one response line
//! per request to stdout. Each request runs on its own task, so a tool call
//! waiting on an app never holds up the lines behind it; responses are
//! written in completion order through a single writer.

use super::{McpHandler, Transport};
use anyhow::Result;
use crate::{JsonRpcError, McpResponse};
use std::str::Utf8Error;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Rolling input buffer that yields complete lines and keeps a trailing
/// partial line until the rest arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete, non-blank line. A line that
    /// is not valid UTF-8 comes back as an error in its place.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, Utf8Error>> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            match std::str::from_utf8(&raw[..raw.len() - 1]) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        lines.push(Ok(line.to_string()));
                    }
                }
                Err(e) => lines.push(Err(e)),
            }
        }
        lines
    }

    /// Bytes held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Stdio transport - reads JSON-RPC from stdin, writes to stdout
pub struct StdioTransport;

impl StdioTransport {
    pub fn new() -> Self {
        Self
    }

    /// Serve over arbitrary streams. Returns once input hits EOF and every
    /// in-flight request has been answered.
    pub async fn serve_io<H, R, W>(handler: Arc<H>, mut reader: R, mut writer: W) -> Result<()>
    where
        H: McpHandler + 'static,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let write_task = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                debug!(response = %line, "Sending response");
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let mut buffer = LineBuffer::new();
        let mut chunk = vec![0u8; 8192];
        loop {
            let n = reader.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            for line in buffer.push(&chunk[..n]) {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!(error = %e, "Request line is not valid UTF-8");
                        let response = McpResponse::error(None, JsonRpcError::parse_error("Parse error"));
                        if tx.send(response.to_json()).is_err() {
                            error!("Response writer closed");
                        }
                        continue;
                    }
                };
                debug!(request = %line, "Received request");
                let handler = Arc::clone(&handler);
                let tx = tx.clone();
                tokio::spawn(async move {
                    let response = handler.handle_message(&line).await;
                    if tx.send(response.to_json()).is_err() {
                        error!("Response writer closed");
                    }
                });
            }
        }

        if buffer.pending_len() > 0 {
            debug!(bytes = buffer.pending_len(), "Discarding unterminated input");
        }
        drop(tx);
        write_task.await??;
        Ok(())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    async fn serve<H: McpHandler + 'static>(self, handler: Arc<H>) -> Result<()> {
        info!("Starting MCP stdio transport");
        Self::serve_io(handler, tokio::io::stdin(), tokio::io::stdout()).await?;
        info!("Stdin closed, stdio transport shutting down");
        Ok(())
    }
}
