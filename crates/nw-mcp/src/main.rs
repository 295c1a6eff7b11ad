//! nw-mcp-server: MCP bridge to running NW.js apps
//!
//! Usage:
//!   nw-mcp-server                     # stdio + HTTP on 3941, apps connect on 3940
//!   nw-mcp-server --port 4000         # apps on 4000, HTTP on 4001
//!   nw-mcp-server --no-http           # stdio only
//!   nw-mcp-server init                # register in ./.mcp.json

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nw_bridge::{Registry, RegistryConfig, WsListener};
use nw_mcp::{
    config::{Overrides, Settings},
    init,
    transport::{HttpTransport, StdioTransport, Transport},
    AppLauncher, McpServer, NwPathResolver,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "nw-mcp-server")]
#[command(about = "MCP server bridging AI clients to NW.js apps", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// WebSocket port NW.js apps connect to
    #[arg(long, short)]
    port: Option<u16>,

    /// HTTP port for the POST /mcp endpoint (default: port + 1)
    #[arg(long)]
    http_port: Option<u16>,

    /// Disable the HTTP endpoint
    #[arg(long)]
    no_http: bool,

    /// Default NW.js executable for nwjs_start_app
    #[arg(long, value_name = "PATH")]
    nw_path: Option<PathBuf>,

    /// Seconds to wait for an app to answer a tool call
    #[arg(long)]
    call_timeout_secs: Option<u64>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Write or update .mcp.json in the current directory
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Init) = cli.command {
        return run_init();
    }

    let settings = Settings::load()
        .context("Failed to load settings")?
        .with_overrides(Overrides {
            ws_port: cli.port,
            http_port: cli.http_port,
            no_http: cli.no_http,
            nw_path: cli.nw_path,
            call_timeout_secs: cli.call_timeout_secs,
            log_level: cli.log_level,
        });

    // stdout carries protocol frames only
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level)))
        .init();

    info!(
        ws_port = settings.ws_port,
        http_port = settings.http_port(),
        http = settings.http_enabled,
        "Starting nw-mcp-server"
    );

    let registry = Arc::new(Registry::new(RegistryConfig {
        call_timeout: settings.call_timeout(),
    }));
    let launcher = AppLauncher::new(NwPathResolver::new(settings.nw_path.clone()));
    let server = Arc::new(McpServer::new(Arc::clone(&registry), launcher));

    let ws_addr = format!("127.0.0.1:{}", settings.ws_port);
    tokio::spawn(async move {
        if let Err(e) = WsListener::new(ws_addr, registry).serve().await {
            error!(error = %e, "App WebSocket listener failed");
        }
    });

    if settings.http_enabled {
        let http_addr = format!("127.0.0.1:{}", settings.http_port());
        let server = Arc::clone(&server);
        tokio::spawn(async move {
            if let Err(e) = HttpTransport::new(http_addr).serve(server).await {
                error!(error = %e, "HTTP transport failed");
            }
        });
    }

    StdioTransport::new().serve(server).await
}

fn run_init() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let exe = std::env::current_exe()?;
    let path = init::write_mcp_json(&cwd, &exe.display().to_string(), &[])?;
    println!("[nwjs-mcp] Created .mcp.json at: {}", path.display());
    println!("[nwjs-mcp] Server path: {}", exe.display());
    Ok(())
}
