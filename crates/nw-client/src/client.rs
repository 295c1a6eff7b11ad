//! Bridge client
//!
//! Runs inside the app: connects to the bridge WebSocket, registers, executes
//! incoming tool calls concurrently and sends each result back tagged with
//! its call id. On disconnect it waits and reconnects under the app id the
//! bridge assigned, so the bridge treats it as the same app.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use nw_core::{WireMessage, DEFAULT_WS_PORT};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::executor::ToolExecutor;

/// Command-line flag that turns the client off.
pub const NO_MCP_FLAG: &str = "--no-mcp";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Display name sent on registration
    pub name: String,
    /// Fixed app id; the bridge generates one when absent
    pub app_id: Option<String>,
    pub host: String,
    pub port: u16,
    pub auto_reconnect: bool,
    pub enabled: bool,
    pub reconnect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            app_id: None,
            host: "localhost".to_string(),
            port: DEFAULT_WS_PORT,
            auto_reconnect: true,
            enabled: true,
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

impl ClientConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Disable the client when the app was started with `--no-mcp`.
    pub fn with_argv<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if argv.into_iter().any(|arg| arg.as_ref() == NO_MCP_FLAG) {
            self.enabled = false;
        }
        self
    }

    pub fn url(&self) -> String {
        format!("ws://{}:{}", self.host, self.port)
    }
}

pub struct AppClient {
    config: ClientConfig,
    executor: Arc<ToolExecutor>,
    app_id: RwLock<Option<String>>,
    connected: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl AppClient {
    pub fn new(config: ClientConfig, executor: Arc<ToolExecutor>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            app_id: RwLock::new(config.app_id.clone()),
            config,
            executor,
            connected: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Id assigned by the bridge, or the configured one before registration.
    pub fn app_id(&self) -> Option<String> {
        self.app_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Close the connection and stop reconnecting.
    pub fn disconnect(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn spawn(self: Arc<Self>) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }

    /// Connect and serve until disconnected, reconnecting when enabled.
    pub async fn run(&self) -> Result<()> {
        if !self.config.enabled {
            info!("MCP client disabled via config or {}", NO_MCP_FLAG);
            return Ok(());
        }

        let mut shutdown = self.shutdown.subscribe();
        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            match self.run_session(&mut shutdown).await {
                Ok(()) => info!("Disconnected from MCP server"),
                Err(e) => warn!("MCP connection failed: {:#}", e),
            }
            self.connected.store(false, Ordering::SeqCst);

            if !self.config.auto_reconnect || *shutdown.borrow() {
                return Ok(());
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.reconnect_delay) => {
                    debug!("Attempting to reconnect to {}", self.config.url());
                }
                _ = shutdown.changed() => return Ok(()),
            }
        }
    }

    async fn run_session(&self, shutdown: &mut watch::Receiver<bool>) -> Result<()> {
        let url = self.config.url();
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;
        let (mut sink, mut stream) = socket.split();
        self.connected.store(true, Ordering::SeqCst);
        info!("Connected to MCP server at {}", url);

        let register = WireMessage::Register {
            app_id: self.app_id(),
            name: Some(self.config.name.clone()),
        };
        sink.send(Message::Text(register.to_json()?)).await?;

        let (replies_tx, mut replies_rx) = mpsc::unbounded_channel::<String>();
        loop {
            tokio::select! {
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(&text, &replies_tx),
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                },
                Some(reply) = replies_rx.recv() => {
                    sink.send(Message::Text(reply)).await?;
                }
                _ = shutdown.changed() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }

    fn handle_frame(&self, text: &str, replies: &mpsc::UnboundedSender<String>) {
        let message = match WireMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Invalid message from MCP server: {}", e);
                return;
            }
        };

        match message {
            WireMessage::Registered { app_id } => {
                info!("Registered as: {}", app_id);
                *self.app_id.write().unwrap_or_else(PoisonError::into_inner) = Some(app_id);
            }
            WireMessage::ToolCall { call_id, tool, args } => {
                let executor = Arc::clone(&self.executor);
                let replies = replies.clone();
                tokio::spawn(async move {
                    let reply = match executor.execute(&tool, args).await {
                        Ok(output) => WireMessage::tool_result(call_id, output.into_value()),
                        Err(e) => {
                            debug!("Tool {} failed: {}", tool, e);
                            WireMessage::tool_error(call_id, e.to_string())
                        }
                    };
                    match reply.to_json() {
                        Ok(json) => {
                            // The session may be gone already; the bridge times the call out.
                            let _ = replies.send(json);
                        }
                        Err(e) => warn!("Failed to encode tool result: {}", e),
                    }
                });
            }
            other => debug!("Ignoring {} message", other.kind()),
        }
    }
}
