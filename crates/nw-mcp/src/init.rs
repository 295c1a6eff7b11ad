//! `init` subcommand
//!
//! Registers this server in a project's `.mcp.json` under
//! `mcpServers.nwjs`. Other entries are preserved; a file that is not valid
//! JSON is replaced.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use tracing::warn;

pub const MCP_JSON: &str = ".mcp.json";
pub const SERVER_KEY: &str = "nwjs";

pub fn write_mcp_json(dir: &Path, command: &str, args: &[String]) -> Result<PathBuf> {
    let path = dir.join(MCP_JSON);

    let mut root = match fs::read_to_string(&path) {
        Ok(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                warn!(path = %path.display(), "Existing .mcp.json is not a JSON object, replacing it");
                Map::new()
            }
        },
        Err(_) => Map::new(),
    };

    let servers = root
        .entry("mcpServers")
        .or_insert_with(|| Value::Object(Map::new()));
    if !servers.is_object() {
        *servers = Value::Object(Map::new());
    }
    if let Value::Object(servers) = servers {
        servers.insert(
            SERVER_KEY.to_string(),
            json!({ "command": command, "args": args }),
        );
    }

    let text = serde_json::to_string_pretty(&Value::Object(root))?;
    fs::write(&path, format!("{}\n", text))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_mcp_json(dir.path(), "/usr/bin/nw-mcp-server", &[]).unwrap();
        assert_eq!(
            read(&path),
            json!({"mcpServers": {"nwjs": {"command": "/usr/bin/nw-mcp-server", "args": []}}})
        );
    }

    #[test]
    fn test_preserves_other_servers() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(MCP_JSON),
            r#"{"mcpServers": {"other": {"command": "x"}, "nwjs": {"command": "old"}}, "extra": 1}"#,
        )
        .unwrap();

        let path = write_mcp_json(dir.path(), "nw-mcp-server", &["--port".into(), "4000".into()]).unwrap();
        let value = read(&path);
        assert_eq!(value["extra"], json!(1));
        assert_eq!(value["mcpServers"]["other"], json!({"command": "x"}));
        assert_eq!(value["mcpServers"]["nwjs"]["command"], json!("nw-mcp-server"));
        assert_eq!(value["mcpServers"]["nwjs"]["args"], json!(["--port", "4000"]));
    }

    #[test]
    fn test_replaces_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MCP_JSON), "{ broken").unwrap();
        let path = write_mcp_json(dir.path(), "nw-mcp-server", &[]).unwrap();
        assert!(read(&path)["mcpServers"]["nwjs"].is_object());
    }
}
