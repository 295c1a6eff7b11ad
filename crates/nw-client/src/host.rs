//! Host window capability
//!
//! Everything the executor needs from the NW.js shell (window management,
//! page capture, app metadata) goes through [`HostWindow`]. Embeddings
//! implement it once; [`MemoryHost`] records calls for headless runs.

use std::process::{Command, Stdio};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::HostError;

/// Outer window geometry in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgvInfo {
    pub argv: Vec<String>,
    pub full_argv: Vec<String>,
    pub data_path: String,
}

#[async_trait]
pub trait HostWindow: Send + Sync {
    /// PNG bytes of the visible page.
    async fn capture_page(&self) -> Result<Vec<u8>, HostError>;

    /// Reload the page; `ignore_cache` requests a dev reload.
    fn reload(&self, ignore_cache: bool) -> Result<(), HostError>;

    fn show_devtools(&self) -> Result<(), HostError>;

    fn close(&self) -> Result<(), HostError>;

    fn minimize(&self) -> Result<(), HostError>;

    fn maximize(&self) -> Result<(), HostError>;

    fn restore(&self) -> Result<(), HostError>;

    fn focus(&self) -> Result<(), HostError>;

    fn bounds(&self) -> Result<Bounds, HostError>;

    fn move_to(&self, x: i32, y: i32) -> Result<(), HostError>;

    fn resize_to(&self, width: u32, height: u32) -> Result<(), HostError>;

    /// Set the logarithmic zoom level (0 = 100%, 1 = 120%).
    fn set_zoom_level(&self, level: f64) -> Result<(), HostError>;

    fn manifest(&self) -> Result<Value, HostError>;

    fn argv(&self) -> Result<ArgvInfo, HostError>;

    /// Start a fresh instance of the running executable on the current app
    /// directory. The caller closes this window afterwards.
    fn relaunch(&self) -> Result<(), HostError> {
        let exe = std::env::current_exe()?;
        let mut command = Command::new(&exe);
        command
            .arg(".")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            const DETACHED_PROCESS: u32 = 0x0000_0008;
            command.creation_flags(DETACHED_PROCESS);
        }
        let child = command.spawn()?;
        info!("Relaunched {} (pid {})", exe.display(), child.id());
        Ok(())
    }
}

#[derive(Debug)]
struct HostState {
    bounds: Bounds,
    zoom_level: f64,
    manifest: Value,
    argv: ArgvInfo,
    screenshot: Vec<u8>,
    calls: Vec<String>,
}

/// Host that keeps window state in memory and logs every call by name.
#[derive(Debug)]
pub struct MemoryHost {
    state: Mutex<HostState>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState {
                bounds: Bounds {
                    x: 0,
                    y: 0,
                    width: 800,
                    height: 600,
                },
                zoom_level: 0.0,
                manifest: json!({}),
                argv: ArgvInfo::default(),
                screenshot: Vec::new(),
                calls: Vec::new(),
            }),
        }
    }

    pub fn with_manifest(self, manifest: Value) -> Self {
        self.lock().manifest = manifest;
        self
    }

    pub fn with_argv(self, argv: ArgvInfo) -> Self {
        self.lock().argv = argv;
        self
    }

    pub fn with_screenshot(self, png: Vec<u8>) -> Self {
        self.lock().screenshot = png;
        self
    }

    pub fn with_bounds(self, bounds: Bounds) -> Self {
        self.lock().bounds = bounds;
        self
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: impl Into<String>) {
        self.lock().calls.push(call.into());
    }

    /// Names of the window operations invoked so far.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn zoom_level(&self) -> f64 {
        self.lock().zoom_level
    }
}

#[async_trait]
impl HostWindow for MemoryHost {
    async fn capture_page(&self) -> Result<Vec<u8>, HostError> {
        self.record("capture_page");
        Ok(self.lock().screenshot.clone())
    }

    fn reload(&self, ignore_cache: bool) -> Result<(), HostError> {
        self.record(if ignore_cache { "reload_dev" } else { "reload" });
        Ok(())
    }

    fn show_devtools(&self) -> Result<(), HostError> {
        self.record("show_devtools");
        Ok(())
    }

    fn close(&self) -> Result<(), HostError> {
        self.record("close");
        Ok(())
    }

    fn minimize(&self) -> Result<(), HostError> {
        self.record("minimize");
        Ok(())
    }

    fn maximize(&self) -> Result<(), HostError> {
        self.record("maximize");
        Ok(())
    }

    fn restore(&self) -> Result<(), HostError> {
        self.record("restore");
        Ok(())
    }

    fn focus(&self) -> Result<(), HostError> {
        self.record("focus");
        Ok(())
    }

    fn bounds(&self) -> Result<Bounds, HostError> {
        Ok(self.lock().bounds)
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), HostError> {
        let mut state = self.lock();
        state.bounds.x = x;
        state.bounds.y = y;
        state.calls.push("move_to".into());
        Ok(())
    }

    fn resize_to(&self, width: u32, height: u32) -> Result<(), HostError> {
        let mut state = self.lock();
        state.bounds.width = width;
        state.bounds.height = height;
        state.calls.push("resize_to".into());
        Ok(())
    }

    fn set_zoom_level(&self, level: f64) -> Result<(), HostError> {
        let mut state = self.lock();
        state.zoom_level = level;
        state.calls.push("set_zoom_level".into());
        Ok(())
    }

    fn manifest(&self) -> Result<Value, HostError> {
        Ok(self.lock().manifest.clone())
    }

    fn argv(&self) -> Result<ArgvInfo, HostError> {
        Ok(self.lock().argv.clone())
    }

    fn relaunch(&self) -> Result<(), HostError> {
        self.record("relaunch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argv_serializes_camel_case() {
        let info = ArgvInfo {
            argv: vec!["--flag".into()],
            full_argv: vec!["nw".into(), "--flag".into()],
            data_path: "/tmp/data".into(),
        };
        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["fullArgv"][0], "nw");
        assert_eq!(value["dataPath"], "/tmp/data");
    }

    #[tokio::test]
    async fn test_memory_host_tracks_geometry() {
        let host = MemoryHost::new();
        host.move_to(10, 20).unwrap();
        host.resize_to(1024, 768).unwrap();
        assert_eq!(
            host.bounds().unwrap(),
            Bounds {
                x: 10,
                y: 20,
                width: 1024,
                height: 768
            }
        );
        host.capture_page().await.unwrap();
        assert_eq!(host.calls(), vec!["move_to", "resize_to", "capture_page"]);
    }
}
