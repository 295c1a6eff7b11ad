//! HTTP Transport
//!
//! `POST /mcp` takes one JSON-RPC body and answers with one JSON-RPC body,
//! through the same raw dispatch as stdio. Everything else is a plain 404.

use super::{McpHandler, Transport};
use anyhow::Result;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

pub struct HttpTransport {
    bind_addr: String,
}

impl HttpTransport {
    pub fn new(bind_addr: impl Into<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
        }
    }

    pub fn router<H: McpHandler + 'static>(handler: Arc<H>) -> Router {
        Router::new()
            .route("/mcp", post(mcp_handler::<H>).fallback(not_found))
            .fallback(not_found)
            .layer(TraceLayer::new_for_http())
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(handler)
    }

    pub async fn serve_on<H: McpHandler + 'static>(listener: TcpListener, handler: Arc<H>) -> Result<()> {
        axum::serve(listener, Self::router(handler)).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn serve<H: McpHandler + 'static>(self, handler: Arc<H>) -> Result<()> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        info!(addr = %self.bind_addr, "HTTP transport listening");
        Self::serve_on(listener, handler).await
    }
}

async fn mcp_handler<H: McpHandler>(State(handler): State<Arc<H>>, body: String) -> impl IntoResponse {
    debug!(len = body.len(), "HTTP MCP request");
    let response = handler.handle_message(&body).await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        response.to_json(),
    )
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
