//! Bridge Wire Protocol
//!
//! JSON messages exchanged over the WebSocket between the bridge and each
//! connected app. Every message carries a `type` discriminator:
//!
//! | direction    | type         | fields                         |
//! |--------------|--------------|--------------------------------|
//! | app → bridge | `register`   | `appId?`, `name?`              |
//! | bridge → app | `registered` | `appId`                        |
//! | bridge → app | `toolCall`   | `callId`, `tool`, `args`       |
//! | app → bridge | `toolResult` | `callId`, `result?` / `error`  |

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireMessage {
    Register {
        #[serde(rename = "appId", default, skip_serializing_if = "Option::is_none")]
        app_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Registered {
        #[serde(rename = "appId")]
        app_id: String,
    },
    ToolCall {
        #[serde(rename = "callId")]
        call_id: String,
        tool: String,
        #[serde(default)]
        args: Value,
    },
    ToolResult {
        #[serde(rename = "callId")]
        call_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

impl WireMessage {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn tool_result(call_id: impl Into<String>, result: Value) -> Self {
        WireMessage::ToolResult {
            call_id: call_id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn tool_error(call_id: impl Into<String>, error: impl Into<String>) -> Self {
        WireMessage::ToolResult {
            call_id: call_id.into(),
            result: None,
            error: Some(error.into()),
        }
    }

    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Register { .. } => "register",
            WireMessage::Registered { .. } => "registered",
            WireMessage::ToolCall { .. } => "toolCall",
            WireMessage::ToolResult { .. } => "toolResult",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_register_without_id() {
        let msg = WireMessage::parse(r#"{"type":"register","name":"Demo"}"#).unwrap();
        assert_eq!(
            msg,
            WireMessage::Register { app_id: None, name: Some("Demo".into()) }
        );
    }

    #[test]
    fn test_tool_call_encoding() {
        let msg = WireMessage::ToolCall {
            call_id: "call-7".into(),
            tool: "browser_snapshot".into(),
            args: json!({}),
        };
        let value: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"type": "toolCall", "callId": "call-7", "tool": "browser_snapshot", "args": {}})
        );
    }

    #[test]
    fn test_tool_result_error_omits_result() {
        let value: Value =
            serde_json::from_str(&WireMessage::tool_error("call-1", "Element not found: e9").to_json().unwrap())
                .unwrap();
        assert_eq!(
            value,
            json!({"type": "toolResult", "callId": "call-1", "error": "Element not found: e9"})
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(WireMessage::parse(r#"{"type":"hello"}"#).is_err());
        assert!(WireMessage::parse("{not json").is_err());
    }
}
