//! AppClient against a real bridge listener

use std::sync::Arc;
use std::time::Duration;

use nw_bridge::{Registry, WsListener};
use nw_client::{AppClient, ClientConfig, MemoryDom, MemoryHost, ToolExecutor};
use serde_json::json;
use tokio::net::TcpListener;

async fn start_bridge() -> (Arc<Registry>, u16) {
    let registry = Arc::new(Registry::with_defaults());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(WsListener::serve_on(listener, Arc::clone(&registry)));
    (registry, port)
}

fn client(port: u16, name: &str) -> Arc<AppClient> {
    let dom = Arc::new(MemoryDom::new(name));
    let button = dom.append_element(dom.body_id(), "button");
    dom.append_text(button, "Start");
    let host = Arc::new(MemoryHost::new());
    let executor = Arc::new(ToolExecutor::new(dom).with_host(host));
    let config = ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        reconnect_delay: Duration::from_millis(50),
        ..ClientConfig::new(name)
    };
    Arc::new(AppClient::new(config, executor))
}

async fn wait_for_apps(registry: &Registry, count: usize) {
    for _ in 0..200 {
        if registry.list_apps().await.len() == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {} connected apps", count);
}

#[tokio::test]
async fn test_client_registers_and_answers_calls() {
    let (registry, port) = start_bridge().await;
    let app = client(port, "Editor");
    let handle = Arc::clone(&app).spawn();

    wait_for_apps(&registry, 1).await;
    let apps = registry.list_apps().await;
    assert_eq!(apps[0].name, "Editor");
    assert!(apps[0].active);
    assert!(app.is_connected());
    for _ in 0..100 {
        if app.app_id().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(app.app_id(), Some(apps[0].id.clone()));

    let result = registry.call_tool("browser_snapshot", json!({})).await.unwrap();
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("- page \"Editor\" [ref=page]"));
    assert!(text.contains("- button \"Start\" [ref=e2]"));

    let result = registry
        .call_tool("nwjs_zoom", json!({"level": 1.5}))
        .await
        .unwrap();
    assert_eq!(result["content"][0]["text"], "Zoom set to 150%");

    let err = registry
        .call_tool("browser_click", json!({"ref": "e77", "element": "ghost"}))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Element not found: e77");

    app.disconnect();
    handle.await.unwrap().unwrap();
    wait_for_apps(&registry, 0).await;
}

#[tokio::test]
async fn test_client_retries_until_bridge_is_up() {
    let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = reserved.local_addr().unwrap().port();
    drop(reserved);

    let app = Arc::new(AppClient::new(
        ClientConfig {
            host: "127.0.0.1".to_string(),
            port,
            app_id: Some("viewer-1".to_string()),
            reconnect_delay: Duration::from_millis(50),
            ..ClientConfig::new("Viewer")
        },
        Arc::new(ToolExecutor::new(Arc::new(MemoryDom::new("Viewer")))),
    ));
    let handle = Arc::clone(&app).spawn();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(!app.is_connected());

    let registry = Arc::new(Registry::with_defaults());
    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    tokio::spawn(WsListener::serve_on(listener, Arc::clone(&registry)));

    wait_for_apps(&registry, 1).await;
    assert_eq!(registry.active_app_id().await.as_deref(), Some("viewer-1"));
    assert_eq!(app.app_id().as_deref(), Some("viewer-1"));

    app.disconnect();
    handle.await.unwrap().unwrap();
    wait_for_apps(&registry, 0).await;
}

#[tokio::test]
async fn test_disabled_client_never_connects() {
    let (registry, port) = start_bridge().await;
    let config = ClientConfig {
        host: "127.0.0.1".to_string(),
        port,
        ..ClientConfig::new("Off")
    }
    .with_argv(["nw", "--no-mcp"]);
    let app = AppClient::new(config, Arc::new(ToolExecutor::new(Arc::new(MemoryDom::new("Off")))));

    app.run().await.unwrap();
    assert!(!app.is_connected());
    assert!(registry.list_apps().await.is_empty());
}
