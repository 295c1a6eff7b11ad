//! Protocol engine to app executor, without sockets
//!
//! The app side is an in-process task that drains an `AppConnection`,
//! executes each `toolCall` with a real `ToolExecutor` and feeds the reply
//! back into the registry.

use std::sync::Arc;

use nw_bridge::{AppConnection, Registry};
use nw_client::{MemoryDom, MemoryHost, ToolExecutor};
use nw_core::WireMessage;
use nw_mcp::{AppLauncher, McpServer, NwPathResolver};
use serde_json::{json, Value};

struct Harness {
    server: McpServer,
    dom: Arc<MemoryDom>,
    host: Arc<MemoryHost>,
}

async fn harness() -> Harness {
    let registry = Arc::new(Registry::with_defaults());
    let resolver = NwPathResolver::new(None)
        .with_env_value(None)
        .with_well_known(Vec::new());
    let server = McpServer::new(Arc::clone(&registry), AppLauncher::new(resolver));

    let dom = Arc::new(MemoryDom::new("Notes"));
    let host = Arc::new(MemoryHost::new());
    let executor = Arc::new(ToolExecutor::new(dom.clone()).with_host(host.clone()));

    let (app, mut outbound) = AppConnection::channel();
    registry.register(&app, Some("notes".into()), Some("Notes".into())).await;

    tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let Ok(WireMessage::ToolCall { call_id, tool, args }) = WireMessage::parse(&frame) else {
                continue;
            };
            let reply = match executor.execute(&tool, args).await {
                Ok(output) => WireMessage::tool_result(call_id, output.into_value()),
                Err(e) => WireMessage::tool_error(call_id, e.to_string()),
            };
            registry.handle_message(&app, &reply.to_json().unwrap()).await;
        }
    });

    Harness { server, dom, host }
}

async fn call(server: &McpServer, name: &str, arguments: Value) -> Value {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    });
    let response = server.handle_message(&request.to_string()).await;
    assert!(response.is_success());
    serde_json::to_value(&response).unwrap()["result"].clone()
}

#[tokio::test]
async fn test_zoom_level_reaches_host() {
    let h = harness().await;
    let result = call(&h.server, "nwjs_zoom", json!({"level": 1.2})).await;
    assert_eq!(result["content"][0]["text"], "Zoom set to 120%");
    assert!((h.host.zoom_level() - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_snapshot_then_click_by_ref() {
    let h = harness().await;
    let button = h.dom.append_element(h.dom.body_id(), "button");
    h.dom.append_text(button, "New note");

    let result = call(&h.server, "browser_snapshot", json!({})).await;
    let tree = result["content"][0]["text"].as_str().unwrap();
    assert!(tree.contains("- button \"New note\" [ref=e2]"));

    let result = call(&h.server, "browser_click", json!({"ref": "e2", "element": "New note"})).await;
    assert_eq!(result["content"][0]["text"], "Clicked: New note");
    assert_eq!(h.dom.event_types(button), vec!["mousedown", "mouseup", "click"]);
}

#[tokio::test]
async fn test_remote_failure_is_tool_error() {
    let h = harness().await;
    let result = call(&h.server, "browser_click", json!({"ref": "e5", "element": "x"})).await;
    assert_eq!(result["isError"], json!(true));
    assert_eq!(result["content"][0]["text"], "Error: Element not found: e5");
}

#[tokio::test]
async fn test_local_tools_do_not_reach_app() {
    let h = harness().await;
    let result = call(&h.server, "nwjs_list_apps", json!({})).await;
    assert_eq!(result["content"][0]["text"], "Connected apps:\n- notes (Notes) [active]");
    assert!(h.host.calls().is_empty());
}
