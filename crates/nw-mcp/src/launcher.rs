//! NW.js App Launcher
//!
//! Backs `nwjs_start_app`: validates the app directory, finds an NW.js
//! executable and spawns it detached. The spawned app is expected to connect
//! back over the WebSocket on its own; the launcher never waits for it.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use nw_core::config::{get_config_opt, read_env_file, ENV_FILE_NAME};
use nw_core::NWJS_PATH_VAR;
use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

const MANIFEST_FILE: &str = "package.json";

/// Launch records kept for `started_apps`; the oldest are dropped first.
pub const MAX_STARTED: usize = 100;

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("App path does not exist: {0}")]
    AppPathMissing(String),

    #[error("No package.json found in: {0}")]
    ManifestMissing(String),

    #[error(
        "NW.js executable not found. Options:\n\
         1. Pass nwPath argument to this tool\n\
         2. Set NWJS_PATH in .env file in app directory\n\
         3. Set NWJS_PATH environment variable\n\
         4. Install \"nw\" package in your project: npm install nw"
    )]
    ExecutableNotFound,

    #[error("Failed to start NW.js app: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Arguments of `nwjs_start_app`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAppArgs {
    pub app_path: String,
    #[serde(default)]
    pub nw_path: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StartedApp {
    pub pid: Option<u32>,
    pub app_path: PathBuf,
    pub started_at: DateTime<Utc>,
}

impl StartedApp {
    pub fn summary(&self) -> String {
        let pid = self
            .pid
            .map(|p| p.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "Started NW.js app: {}\nPID: {}\nWaiting for app to connect...",
            self.app_path.display(),
            pid
        )
    }
}

/// Ordered lookup of the NW.js executable. A candidate only counts if it
/// exists on disk; otherwise the next source is tried.
#[derive(Debug, Clone)]
pub struct NwPathResolver {
    configured: Option<PathBuf>,
    env_value: Option<PathBuf>,
    well_known: Vec<PathBuf>,
}

impl NwPathResolver {
    pub fn new(configured: Option<PathBuf>) -> Self {
        Self {
            configured,
            env_value: get_config_opt(NWJS_PATH_VAR).map(PathBuf::from),
            well_known: well_known_locations(),
        }
    }

    /// Override the value read from the `NWJS_PATH` environment variable.
    pub fn with_env_value(mut self, value: Option<PathBuf>) -> Self {
        self.env_value = value;
        self
    }

    pub fn with_well_known(mut self, paths: Vec<PathBuf>) -> Self {
        self.well_known = paths;
        self
    }

    pub fn resolve(&self, explicit: Option<&Path>, app_path: &Path) -> Option<PathBuf> {
        let env_file = read_env_file(&app_path.join(ENV_FILE_NAME))
            .remove(NWJS_PATH_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        let candidates = [
            ("argument", explicit.map(Path::to_path_buf)),
            ("configured", self.configured.clone()),
            ("environment", self.env_value.clone()),
            ("env file", env_file),
            ("bundled", Some(bundled_runtime(app_path))),
        ];

        for (source, candidate) in candidates {
            if let Some(path) = candidate {
                if path.exists() {
                    debug!(source, path = %path.display(), "Resolved NW.js executable");
                    return Some(path);
                }
                debug!(source, path = %path.display(), "NW.js candidate missing");
            }
        }

        self.well_known.iter().find(|p| p.exists()).cloned()
    }
}

/// Platform binary inside the `nw` npm package of the app.
pub fn bundled_runtime(app_path: &Path) -> PathBuf {
    let base = app_path.join("node_modules").join("nw").join("nwjs");
    if cfg!(windows) {
        base.join("nw.exe")
    } else if cfg!(target_os = "macos") {
        base.join("nwjs.app").join("Contents").join("MacOS").join("nwjs")
    } else {
        base.join("nw")
    }
}

fn well_known_locations() -> Vec<PathBuf> {
    if cfg!(windows) {
        let mut paths = Vec::new();
        for var in ["LOCALAPPDATA", "PROGRAMFILES"] {
            if let Some(dir) = get_config_opt(var) {
                paths.push(PathBuf::from(dir).join("nw").join("nw.exe"));
            }
        }
        paths.push(PathBuf::from(r"C:\nw\nw.exe"));
        paths
    } else if cfg!(target_os = "macos") {
        vec![PathBuf::from("/Applications/nwjs.app/Contents/MacOS/nwjs")]
    } else {
        vec![
            PathBuf::from("/usr/local/bin/nw"),
            PathBuf::from("/usr/bin/nw"),
            PathBuf::from("/opt/nwjs/nw"),
        ]
    }
}

pub struct AppLauncher {
    resolver: NwPathResolver,
    started: Mutex<VecDeque<StartedApp>>,
}

impl AppLauncher {
    pub fn new(resolver: NwPathResolver) -> Self {
        Self {
            resolver,
            started: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn start(&self, args: StartAppArgs) -> Result<StartedApp, LaunchError> {
        let app_path = PathBuf::from(&args.app_path);
        if !app_path.exists() {
            return Err(LaunchError::AppPathMissing(args.app_path));
        }
        if !app_path.join(MANIFEST_FILE).exists() {
            return Err(LaunchError::ManifestMissing(args.app_path));
        }

        let exe = self
            .resolver
            .resolve(args.nw_path.as_deref().map(Path::new), &app_path)
            .ok_or(LaunchError::ExecutableNotFound)?;

        let mut cmd = Command::new(&exe);
        cmd.arg(&app_path)
            .args(&args.args)
            .current_dir(&app_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut cmd);

        // Dropping the handle leaves the process running; tokio reaps it.
        let child = cmd.spawn()?;
        let started = StartedApp {
            pid: child.id(),
            app_path,
            started_at: Utc::now(),
        };
        info!(
            pid = ?started.pid,
            app_path = %started.app_path.display(),
            exe = %exe.display(),
            "Started NW.js app"
        );

        self.record(started.clone());
        Ok(started)
    }

    fn record(&self, started: StartedApp) {
        let mut history = self
            .started
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if history.len() >= MAX_STARTED {
            history.pop_front();
        }
        history.push_back(started);
    }

    pub fn started_apps(&self) -> Vec<StartedApp> {
        self.started
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}
