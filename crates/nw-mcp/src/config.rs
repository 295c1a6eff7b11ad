//! Server settings
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `nw-mcp.toml` in the working directory, then `NW_MCP_*` environment
//! variables. Command-line flags are applied last by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use nw_core::DEFAULT_WS_PORT;
use serde::Deserialize;

pub const CONFIG_FILE: &str = "nw-mcp.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Port apps connect to over WebSocket.
    pub ws_port: u16,
    /// Defaults to `ws_port + 1` when unset.
    #[serde(default)]
    pub http_port: Option<u16>,
    pub http_enabled: bool,
    /// Default NW.js executable for `nwjs_start_app`.
    #[serde(default)]
    pub nw_path: Option<PathBuf>,
    pub call_timeout_secs: u64,
    pub log_level: String,
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub ws_port: Option<u16>,
    pub http_port: Option<u16>,
    pub no_http: bool,
    pub nw_path: Option<PathBuf>,
    pub call_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("ws_port", i64::from(DEFAULT_WS_PORT))?
            .set_default("http_enabled", true)?
            .set_default("call_timeout_secs", 30)?
            .set_default("log_level", "info")?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("NW_MCP").try_parsing(true))
            .build()?;
        s.try_deserialize()
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(port) = overrides.ws_port {
            self.ws_port = port;
        }
        if overrides.http_port.is_some() {
            self.http_port = overrides.http_port;
        }
        if overrides.no_http {
            self.http_enabled = false;
        }
        if overrides.nw_path.is_some() {
            self.nw_path = overrides.nw_path;
        }
        if let Some(secs) = overrides.call_timeout_secs {
            self.call_timeout_secs = secs;
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        self
    }

    pub fn http_port(&self) -> u16 {
        self.http_port.unwrap_or_else(|| self.ws_port.saturating_add(1))
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(settings.ws_port, 3940);
        assert_eq!(settings.http_port(), 3941);
        assert!(settings.http_enabled);
        assert_eq!(settings.call_timeout(), Duration::from_secs(30));
        assert!(settings.nw_path.is_none());
    }

    #[test]
    fn test_file_layer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "ws_port = 4000\nnw_path = \"/opt/nwjs/nw\"\nlog_level = \"debug\"\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.ws_port, 4000);
        assert_eq!(settings.http_port(), 4001);
        assert_eq!(settings.nw_path, Some(PathBuf::from("/opt/nwjs/nw")));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_cli_overrides_win() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "ws_port = 4000\nhttp_port = 5000\n").unwrap();

        let settings = Settings::load_from(&path).unwrap().with_overrides(Overrides {
            ws_port: Some(4100),
            no_http: true,
            call_timeout_secs: Some(5),
            ..Default::default()
        });
        assert_eq!(settings.ws_port, 4100);
        assert_eq!(settings.http_port(), 5000);
        assert!(!settings.http_enabled);
        assert_eq!(settings.call_timeout(), Duration::from_secs(5));
    }
}
