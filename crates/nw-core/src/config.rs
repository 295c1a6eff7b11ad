//! Environment File Parsing
//!
//! Reads `KEY=VALUE` files (the `.env` convention used by NW.js projects)
//! without touching the process environment. The launcher consults an app's
//! `.env` as one step of its executable lookup, so values stay scoped to the
//! file they came from.
//!
//! ```rust
//! use nw_core::config::parse_env_str;
//!
//! let vars = parse_env_str("# comment\nNWJS_PATH=\"/opt/nw/nw\"\n");
//! assert_eq!(vars.get("NWJS_PATH").map(String::as_str), Some("/opt/nw/nw"));
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Name of the per-app environment file.
pub const ENV_FILE_NAME: &str = ".env";

/// Read an environment file into a map.
///
/// A missing file yields an empty map; an unreadable one is logged and also
/// yields an empty map, since every caller treats the file as optional.
pub fn read_env_file(path: &Path) -> HashMap<String, String> {
    if !path.exists() {
        return HashMap::new();
    }

    match fs::read_to_string(path) {
        Ok(content) => {
            let vars = parse_env_str(&content);
            debug!(path = %path.display(), count = vars.len(), "Parsed environment file");
            vars
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path.display(), e);
            HashMap::new()
        }
    }
}

/// Parse the contents of an environment file.
pub fn parse_env_str(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_env_line)
        .collect()
}

/// Parse a single environment line into key-value pair.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    // Handle: KEY=VALUE, KEY="VALUE", KEY='VALUE'
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"').and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Get an optional configuration value, treating empty strings as unset.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_line_simple() {
        let (k, v) = parse_env_line("FOO=bar").unwrap();
        assert_eq!(k, "FOO");
        assert_eq!(v, "bar");
    }

    #[test]
    fn test_parse_env_line_quoted() {
        let (k, v) = parse_env_line("NWJS_PATH=\"C:\\nw\\nw.exe\"").unwrap();
        assert_eq!(k, "NWJS_PATH");
        assert_eq!(v, "C:\\nw\\nw.exe");
    }

    #[test]
    fn test_parse_env_line_single_quoted() {
        let (k, v) = parse_env_line("FOO='bar baz'").unwrap();
        assert_eq!(k, "FOO");
        assert_eq!(v, "bar baz");
    }

    #[test]
    fn test_parse_env_line_rejects_missing_key() {
        assert!(parse_env_line("").is_none());
        assert!(parse_env_line("=value").is_none());
        assert!(parse_env_line("no_equals_sign").is_none());
    }

    #[test]
    fn test_value_may_contain_equals() {
        let (_, v) = parse_env_line("ARGS=--a=1").unwrap();
        assert_eq!(v, "--a=1");
    }

    #[test]
    fn test_parse_env_str_skips_comments_and_blanks() {
        let vars = parse_env_str("\n# NWJS_PATH=/ignored\n  \nNWJS_PATH = /opt/nw/nw \nOTHER=1\n");
        assert_eq!(vars.len(), 2);
        assert_eq!(vars["NWJS_PATH"], "/opt/nw/nw");
        assert_eq!(vars["OTHER"], "1");
    }

    #[test]
    fn test_read_env_file_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_env_file(&dir.path().join(ENV_FILE_NAME)).is_empty());
    }

    #[test]
    fn test_read_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ENV_FILE_NAME);
        fs::write(&path, "NWJS_PATH='/usr/local/bin/nw'\n").unwrap();
        let vars = read_env_file(&path);
        assert_eq!(vars["NWJS_PATH"], "/usr/local/bin/nw");
    }
}
