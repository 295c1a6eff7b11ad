//! Tool Catalog
//!
//! The fixed set of tools advertised by `tools/list`. Built once and never
//! changed for the lifetime of the process.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tools answered by the server itself rather than forwarded to an app.
pub const LIST_APPS: &str = "nwjs_list_apps";
pub const SELECT_APP: &str = "nwjs_select_app";
pub const START_APP: &str = "nwjs_start_app";

/// Tool information for MCP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolInfo {
    fn new(name: &str, description: &str, input_schema: Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            input_schema,
        }
    }

    fn no_args(name: &str, description: &str) -> Self {
        Self::new(name, description, json!({"type": "object", "properties": {}}))
    }
}

pub fn tools() -> &'static [ToolInfo] {
    static CATALOG: OnceLock<Vec<ToolInfo>> = OnceLock::new();
    CATALOG.get_or_init(build_catalog)
}

pub fn find(name: &str) -> Option<&'static ToolInfo> {
    tools().iter().find(|tool| tool.name == name)
}

fn build_catalog() -> Vec<ToolInfo> {
    vec![
        ToolInfo::no_args(
            "browser_snapshot",
            "Capture accessibility snapshot of the current page. Returns a tree structure with element refs for targeting interactions.",
        ),
        ToolInfo::new(
            "browser_take_screenshot",
            "Take a screenshot of the current page or a specific element.",
            json!({
                "type": "object",
                "properties": {
                    "ref": {"type": "string", "description": "Element ref to screenshot (optional)"},
                    "fullPage": {"type": "boolean", "description": "Capture full scrollable page"}
                }
            }),
        ),
        ToolInfo::new(
            "browser_click",
            "Click on an element specified by ref.",
            json!({
                "type": "object",
                "properties": {
                    "ref": {"type": "string", "description": "Element ref from snapshot"},
                    "element": {"type": "string", "description": "Human-readable element description"},
                    "button": {"type": "string", "enum": ["left", "right", "middle"], "description": "Mouse button"},
                    "doubleClick": {"type": "boolean", "description": "Perform double click"}
                },
                "required": ["ref", "element"]
            }),
        ),
        ToolInfo::new(
            "browser_type",
            "Type text into an editable element.",
            json!({
                "type": "object",
                "properties": {
                    "ref": {"type": "string", "description": "Element ref from snapshot"},
                    "element": {"type": "string", "description": "Human-readable element description"},
                    "text": {"type": "string", "description": "Text to type"},
                    "slowly": {"type": "boolean", "description": "Type character by character"},
                    "submit": {"type": "boolean", "description": "Press Enter after typing"}
                },
                "required": ["ref", "element", "text"]
            }),
        ),
        ToolInfo::new(
            "browser_evaluate",
            "Evaluate JavaScript expression on the page.",
            json!({
                "type": "object",
                "properties": {
                    "function": {"type": "string", "description": "JavaScript function to evaluate"},
                    "ref": {"type": "string", "description": "Element ref to pass to function (optional)"},
                    "element": {"type": "string", "description": "Human-readable element description"}
                },
                "required": ["function"]
            }),
        ),
        ToolInfo::new(
            "browser_navigate",
            "Navigate to a URL.",
            json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string", "description": "URL to navigate to"}
                },
                "required": ["url"]
            }),
        ),
        ToolInfo::new(
            "browser_console_messages",
            "Get console messages from the page.",
            json!({
                "type": "object",
                "properties": {
                    "level": {"type": "string", "enum": ["error", "warning", "info", "debug"], "description": "Minimum log level"}
                }
            }),
        ),
        ToolInfo::new(
            "browser_resize",
            "Resize the browser window.",
            json!({
                "type": "object",
                "properties": {
                    "width": {"type": "number", "description": "Window width in pixels"},
                    "height": {"type": "number", "description": "Window height in pixels"}
                },
                "required": ["width", "height"]
            }),
        ),
        ToolInfo::new(
            "browser_wait_for",
            "Wait for text to appear or disappear, or wait for a specified time.",
            json!({
                "type": "object",
                "properties": {
                    "text": {"type": "string", "description": "Text to wait for"},
                    "textGone": {"type": "string", "description": "Text to wait for to disappear"},
                    "time": {"type": "number", "description": "Time to wait in seconds"}
                }
            }),
        ),
        ToolInfo::new(
            "browser_fill_form",
            "Fill multiple form fields at once.",
            json!({
                "type": "object",
                "properties": {
                    "fields": {
                        "type": "array",
                        "description": "Array of fields to fill",
                        "items": {
                            "type": "object",
                            "properties": {
                                "ref": {"type": "string"},
                                "name": {"type": "string"},
                                "type": {"type": "string", "enum": ["textbox", "checkbox", "radio", "combobox", "slider"]},
                                "value": {"type": "string"}
                            },
                            "required": ["ref", "name", "type", "value"]
                        }
                    }
                },
                "required": ["fields"]
            }),
        ),
        ToolInfo::new(
            "browser_press_key",
            "Press a keyboard key.",
            json!({
                "type": "object",
                "properties": {
                    "key": {"type": "string", "description": "Key to press (e.g., \"Enter\", \"Tab\", \"a\")"}
                },
                "required": ["key"]
            }),
        ),
        ToolInfo::no_args(LIST_APPS, "List all connected NW.js applications."),
        ToolInfo::new(
            SELECT_APP,
            "Select which NW.js app to target for browser commands.",
            json!({
                "type": "object",
                "properties": {
                    "appId": {"type": "string", "description": "App ID to select"}
                },
                "required": ["appId"]
            }),
        ),
        ToolInfo::new(
            "nwjs_reload",
            "Reload the NW.js app window.",
            json!({
                "type": "object",
                "properties": {
                    "ignoreCache": {"type": "boolean", "description": "Ignore cache when reloading (like Ctrl+Shift+R)"},
                    "relaunch": {"type": "boolean", "description": "Fully relaunch the app (restart the process) instead of just reloading the window"}
                }
            }),
        ),
        ToolInfo::no_args("nwjs_show_devtools", "Show the developer tools for the NW.js app."),
        ToolInfo::no_args("nwjs_close", "Close the NW.js app window."),
        ToolInfo::new(
            START_APP,
            "Start an NW.js application. The app must include the MCP client library to connect.",
            json!({
                "type": "object",
                "properties": {
                    "appPath": {"type": "string", "description": "Path to the NW.js app directory (containing package.json)"},
                    "nwPath": {"type": "string", "description": "Path to the NW.js executable (optional, uses configured default if not specified)"},
                    "args": {"type": "array", "items": {"type": "string"}, "description": "Additional command line arguments"}
                },
                "required": ["appPath"]
            }),
        ),
        ToolInfo::no_args("nwjs_get_manifest", "Get the app manifest (package.json) information."),
        ToolInfo::no_args("nwjs_get_argv", "Get command line arguments the app was started with."),
        ToolInfo::no_args("nwjs_minimize", "Minimize the NW.js app window."),
        ToolInfo::no_args("nwjs_maximize", "Maximize the NW.js app window."),
        ToolInfo::no_args("nwjs_restore", "Restore the NW.js app window from minimized/maximized state."),
        ToolInfo::no_args("nwjs_focus", "Bring the NW.js app window to the front."),
        ToolInfo::no_args("nwjs_get_bounds", "Get the window position and size."),
        ToolInfo::new(
            "nwjs_set_bounds",
            "Set the window position and size.",
            json!({
                "type": "object",
                "properties": {
                    "x": {"type": "number", "description": "Window X position"},
                    "y": {"type": "number", "description": "Window Y position"},
                    "width": {"type": "number", "description": "Window width"},
                    "height": {"type": "number", "description": "Window height"}
                }
            }),
        ),
        ToolInfo::new(
            "nwjs_zoom",
            "Set the zoom level of the page.",
            json!({
                "type": "object",
                "properties": {
                    "level": {"type": "number", "description": "Zoom level (1.0 = 100%, 1.5 = 150%, etc.)"}
                },
                "required": ["level"]
            }),
        ),
    ]
}
