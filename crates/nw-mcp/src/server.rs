//! MCP Server
//!
//! Transport-agnostic protocol engine: decodes JSON-RPC, dispatches by
//! method and turns every tool outcome into a `tools/call` result. Tools
//! other than the three handled locally are forwarded to the active app
//! through the registry.

use std::sync::Arc;

use nw_bridge::Registry;
use nw_core::ToolOutput;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::catalog::{self, LIST_APPS, SELECT_APP, START_APP};
use crate::launcher::{AppLauncher, StartAppArgs};
use crate::protocol::{JsonRpcError, McpRequest, McpResponse};
use crate::{PROTOCOL_VERSION, SERVER_NAME, SERVER_VERSION};

const NO_APPS_MESSAGE: &str =
    "No NW.js apps connected. Start an NW.js app with the MCP client library.";

pub struct McpServer {
    registry: Arc<Registry>,
    launcher: AppLauncher,
}

impl McpServer {
    pub fn new(registry: Arc<Registry>, launcher: AppLauncher) -> Self {
        Self { registry, launcher }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Handle one raw JSON-RPC message.
    ///
    /// Undecodable text is answered with a parse error addressed to a null
    /// id; valid JSON that is not a request object is an invalid request.
    pub async fn handle_message(&self, raw: &str) -> McpResponse {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Parse error");
                return McpResponse::error(None, JsonRpcError::parse_error("Parse error"));
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<McpRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => {
                warn!(error = %e, "Invalid request");
                McpResponse::error(id, JsonRpcError::invalid_request(format!("Invalid request: {}", e)))
            }
        }
    }

    /// Handle an MCP request
    pub async fn handle_request(&self, request: McpRequest) -> McpResponse {
        debug!(method = %request.method, id = ?request.id, "Handling MCP request");

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "initialized" | "ping" => McpResponse::success(request.id, json!({})),
            "tools/list" => McpResponse::success(request.id, json!({ "tools": catalog::tools() })),
            "tools/call" => self.handle_tools_call(request).await,
            _ => McpResponse::error(request.id, JsonRpcError::method_not_found(&request.method)),
        }
    }

    fn handle_initialize(&self, request: McpRequest) -> McpResponse {
        let client_name = request
            .params
            .as_ref()
            .and_then(|p| p.get("clientInfo"))
            .and_then(|ci| ci.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or("unknown");
        info!(client = %client_name, "Client initialized");

        McpResponse::success(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": SERVER_VERSION
                }
            }),
        )
    }

    async fn handle_tools_call(&self, request: McpRequest) -> McpResponse {
        let params = request.params.unwrap_or_else(|| json!({}));
        let tool_name = match params.get("name").and_then(|n| n.as_str()) {
            Some(n) => n.to_string(),
            None => {
                return McpResponse::error(request.id, JsonRpcError::invalid_params("Missing tool name"))
            }
        };
        let arguments = match params.get("arguments") {
            Some(Value::Null) | None => json!({}),
            Some(args) => args.clone(),
        };

        let result = self.call_tool(&tool_name, arguments).await;
        McpResponse::success(request.id, result)
    }

    /// Execute a tool and return its `tools/call` result payload.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Value {
        match name {
            LIST_APPS => self.list_apps().await.into_value(),
            SELECT_APP => self.select_app(&arguments).await.into_value(),
            START_APP => self.start_app(arguments).await.into_value(),
            _ => match self.registry.call_tool(name, arguments).await {
                Ok(result) => result,
                Err(e) => {
                    warn!(tool = %name, error = %e, "Tool call failed");
                    ToolOutput::error(format!("Error: {}", e)).into_value()
                }
            },
        }
    }

    async fn list_apps(&self) -> ToolOutput {
        let apps = self.registry.list_apps().await;
        if apps.is_empty() {
            return ToolOutput::text(NO_APPS_MESSAGE);
        }

        let lines: Vec<String> = apps
            .iter()
            .map(|app| {
                let mut line = format!("- {}", app.id);
                if !app.name.is_empty() {
                    line.push_str(&format!(" ({})", app.name));
                }
                if app.active {
                    line.push_str(" [active]");
                }
                line
            })
            .collect();
        ToolOutput::text(format!("Connected apps:\n{}", lines.join("\n")))
    }

    async fn select_app(&self, arguments: &Value) -> ToolOutput {
        let app_id = match arguments.get("appId").and_then(|v| v.as_str()) {
            Some(id) => id,
            None => return ToolOutput::error("Missing required argument: appId"),
        };

        if self.registry.select_app(app_id).await {
            ToolOutput::text(format!("Selected app: {}", app_id))
        } else {
            ToolOutput::error(format!("App not found: {}", app_id))
        }
    }

    async fn start_app(&self, arguments: Value) -> ToolOutput {
        let args: StartAppArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => return ToolOutput::error(format!("Invalid arguments: {}", e)),
        };

        match self.launcher.start(args).await {
            Ok(started) => ToolOutput::text(started.summary()),
            Err(e) => {
                warn!(error = %e, "Failed to start app");
                ToolOutput::error(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::NwPathResolver;
    use nw_bridge::AppConnection;

    fn server() -> McpServer {
        let resolver = NwPathResolver::new(None)
            .with_env_value(None)
            .with_well_known(Vec::new());
        McpServer::new(Arc::new(Registry::with_defaults()), AppLauncher::new(resolver))
    }

    fn text_of(result: &Value) -> &str {
        result["content"][0]["text"].as_str().unwrap()
    }

    #[tokio::test]
    async fn test_initialize() {
        let request = McpRequest::new("initialize")
            .with_id(json!(1))
            .with_params(json!({"clientInfo": {"name": "test-client", "version": "1.0.0"}}));
        let response = server().handle_request(request).await;

        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["capabilities"], json!({"tools": {}}));
        assert_eq!(result["serverInfo"]["name"], "nwjs-mcp");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = server()
            .handle_request(McpRequest::new("resources/list").with_id(json!(2)))
            .await;
        let error = response.error.unwrap();
        assert_eq!(error.code, -32601);
        assert_eq!(response.id, json!(2));
    }

    #[tokio::test]
    async fn test_parse_and_invalid_request() {
        let server = server();
        let response = server.handle_message("{not json").await;
        assert_eq!(response.error.unwrap().code, -32700);
        assert_eq!(response.id, Value::Null);

        let response = server.handle_message(r#"{"id": 7, "params": {}}"#).await;
        assert_eq!(response.error.unwrap().code, -32600);
        assert_eq!(response.id, json!(7));

        let response = server.handle_message("[1, 2]").await;
        assert_eq!(response.error.unwrap().code, -32600);
    }

    #[tokio::test]
    async fn test_tools_call_without_name() {
        let response = server()
            .handle_request(McpRequest::new("tools/call").with_id(json!(3)).with_params(json!({})))
            .await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_list_and_select_apps() {
        let server = server();
        let empty = server.call_tool(LIST_APPS, json!({})).await;
        assert_eq!(text_of(&empty), NO_APPS_MESSAGE);

        let (a, _ra) = AppConnection::channel();
        let (b, _rb) = AppConnection::channel();
        server.registry().register(&a, Some("A".into()), Some("Alpha".into())).await;
        server.registry().register(&b, Some("B".into()), None).await;

        let listed = server.call_tool(LIST_APPS, json!({})).await;
        assert_eq!(text_of(&listed), "Connected apps:\n- A (Alpha) [active]\n- B");

        let selected = server.call_tool(SELECT_APP, json!({"appId": "B"})).await;
        assert_eq!(text_of(&selected), "Selected app: B");
        assert!(selected.get("isError").is_none());

        let missing = server.call_tool(SELECT_APP, json!({"appId": "Z"})).await;
        assert_eq!(text_of(&missing), "App not found: Z");
        assert_eq!(missing["isError"], json!(true));
    }

    #[tokio::test]
    async fn test_forwarded_call_without_app_is_tool_error() {
        let response = server()
            .handle_request(
                McpRequest::new("tools/call")
                    .with_id(json!(4))
                    .with_params(json!({"name": "browser_snapshot", "arguments": {}})),
            )
            .await;
        assert!(response.is_success());
        let result = response.result.unwrap();
        assert_eq!(result["isError"], json!(true));
        assert_eq!(
            text_of(&result),
            "Error: No NW.js app connected. Start an NW.js app with the MCP client library."
        );
    }

    #[tokio::test]
    async fn test_start_app_errors_are_tool_errors() {
        let result = server()
            .call_tool(START_APP, json!({"appPath": "/no/such/app"}))
            .await;
        assert_eq!(result["isError"], json!(true));
        assert_eq!(text_of(&result), "App path does not exist: /no/such/app");

        let result = server().call_tool(START_APP, json!({})).await;
        assert_eq!(result["isError"], json!(true));
        assert!(text_of(&result).starts_with("Invalid arguments"));
    }
}
