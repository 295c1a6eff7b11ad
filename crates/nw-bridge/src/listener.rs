//! App WebSocket listener
//!
//! Accepts app connections on `ws://localhost:<port>/`, feeds every inbound
//! frame to the registry and drains the connection's outbound queue into the
//! socket.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::connection::AppConnection;
use crate::registry::Registry;

pub struct WsListener {
    bind_addr: String,
    registry: Arc<Registry>,
}

impl WsListener {
    pub fn new(bind_addr: impl Into<String>, registry: Arc<Registry>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            registry,
        }
    }

    pub fn router(registry: Arc<Registry>) -> Router {
        Router::new()
            .route("/", get(ws_handler))
            .with_state(registry)
    }

    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!(addr = %self.bind_addr, "App WebSocket listening");
        Self::serve_on(listener, self.registry).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(listener: TcpListener, registry: Arc<Registry>) -> Result<()> {
        axum::serve(listener, Self::router(registry)).await?;
        Ok(())
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(registry): State<Arc<Registry>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_app_socket(socket, registry))
}

async fn handle_app_socket(socket: WebSocket, registry: Arc<Registry>) {
    let (mut sender, mut receiver) = socket.split();
    let (conn, mut outbound) = AppConnection::channel();
    info!(connection = %conn.id(), "App socket connected");

    let conn_id = conn.id();
    let writer = tokio::spawn(async move {
        while let Some(text) = outbound.recv().await {
            if let Err(e) = sender.send(Message::Text(text)).await {
                error!(connection = %conn_id, error = %e, "Failed to write to app socket");
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                debug!(connection = %conn.id(), len = text.len(), "App frame");
                registry.handle_message(&conn, &text).await;
            }
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => registry.handle_message(&conn, &text).await,
                Err(_) => warn!(connection = %conn.id(), "Dropping non-UTF-8 frame"),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong handled by axum
            Err(e) => {
                warn!(connection = %conn.id(), error = %e, "App socket error");
                break;
            }
        }
    }

    registry.disconnect(conn.id()).await;
    writer.abort();
    info!(connection = %conn.id(), "App socket closed");
}
