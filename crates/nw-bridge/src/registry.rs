//! App Registry & Call Router
//!
//! Tracks which apps are connected, which one is active, and every tool call
//! still waiting for its reply.
//!
//! Invariants:
//! - at most one registration is active, and none only when the registry is
//!   empty
//! - a pending call is resolved exactly once, either by the matching
//!   `toolResult` or by its deadline timer, whichever removes it from the
//!   table first
//! - a `toolResult` only resolves a call if it arrives on the connection the
//!   call was sent on; a reconnected app never answers for its predecessor

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nw_core::WireMessage;
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::{AppConnection, ConnectionId};
use crate::error::RouteError;

/// Deadline applied to every forwarded tool call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub call_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Snapshot of one registration, as reported by `nwjs_list_apps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub id: String,
    pub name: String,
    pub active: bool,
}

struct AppRegistration {
    app_id: String,
    name: String,
    connection: AppConnection,
    active: bool,
}

struct PendingCall {
    connection: ConnectionId,
    tool: String,
    reply: oneshot::Sender<Result<Value, RouteError>>,
    deadline: JoinHandle<()>,
}

#[derive(Default)]
struct RegistryState {
    // Registration order; failover picks the first survivor.
    apps: Vec<AppRegistration>,
    pending: HashMap<String, PendingCall>,
}

impl RegistryState {
    fn find_mut(&mut self, app_id: &str) -> Option<&mut AppRegistration> {
        self.apps.iter_mut().find(|app| app.app_id == app_id)
    }

    fn active(&self) -> Option<&AppRegistration> {
        self.apps.iter().find(|app| app.active)
    }
}

pub struct Registry {
    config: RegistryConfig,
    state: Arc<Mutex<RegistryState>>,
    next_call_id: AtomicU64,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(RegistryState::default())),
            next_call_id: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RegistryConfig::default())
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Dispatch one inbound socket message.
    ///
    /// Undecodable or unexpected messages are logged and dropped; they never
    /// close the connection.
    pub async fn handle_message(&self, conn: &AppConnection, text: &str) {
        match WireMessage::parse(text) {
            Ok(WireMessage::Register { app_id, name }) => {
                self.register(conn, app_id, name).await;
            }
            Ok(WireMessage::ToolResult { call_id, result, error }) => {
                self.resolve(conn.id(), &call_id, result, error).await;
            }
            Ok(other) => {
                warn!(connection = %conn.id(), kind = other.kind(), "Unexpected message from app");
            }
            Err(e) => {
                warn!(connection = %conn.id(), error = %e, "Invalid message from app");
            }
        }
    }

    /// Upsert a registration and acknowledge it on `conn`.
    ///
    /// A known `app_id` keeps its name and active flag and only swaps the
    /// connection. Calls already in flight stay bound to the old connection.
    pub async fn register(
        &self,
        conn: &AppConnection,
        app_id: Option<String>,
        name: Option<String>,
    ) -> String {
        let app_id = app_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(generate_app_id);

        let mut state = self.state.lock().await;
        match state.find_mut(&app_id) {
            Some(existing) => {
                existing.connection = conn.clone();
                info!(app_id = %app_id, connection = %conn.id(), "App reconnected");
            }
            None => {
                let name = name.unwrap_or_default();
                info!(app_id = %app_id, name = %name, connection = %conn.id(), "App registered");
                state.apps.push(AppRegistration {
                    app_id: app_id.clone(),
                    name,
                    connection: conn.clone(),
                    active: false,
                });
            }
        }

        if state.active().is_none() {
            if let Some(app) = state.find_mut(&app_id) {
                app.active = true;
                debug!(app_id = %app_id, "Auto-selected app");
            }
        }
        drop(state);

        if let Err(e) = conn.send(&WireMessage::Registered { app_id: app_id.clone() }) {
            warn!(app_id = %app_id, error = %e, "Failed to acknowledge registration");
        }
        app_id
    }

    /// Drop every registration bound to a closed connection.
    ///
    /// A stale connection closing after its app reconnected elsewhere removes
    /// nothing. Pending calls sent on it are left to their deadline.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        let mut state = self.state.lock().await;
        let was_active = state
            .apps
            .iter()
            .any(|app| app.active && app.connection.id() == conn_id);

        state.apps.retain(|app| {
            let bound = app.connection.id() == conn_id;
            if bound {
                info!(app_id = %app.app_id, connection = %conn_id, "App disconnected");
            }
            !bound
        });

        if was_active {
            match state.apps.first_mut() {
                Some(next) => {
                    next.active = true;
                    info!(app_id = %next.app_id, "Active app changed after disconnect");
                }
                None => debug!("No apps left to activate"),
            }
        }
    }

    /// Make `app_id` the active app. Returns false for unknown ids.
    ///
    /// Selecting the app that is already active succeeds.
    pub async fn select_app(&self, app_id: &str) -> bool {
        let mut state = self.state.lock().await;
        if !state.apps.iter().any(|app| app.app_id == app_id) {
            return false;
        }
        for app in state.apps.iter_mut() {
            app.active = app.app_id == app_id;
        }
        info!(app_id = %app_id, "Selected app");
        true
    }

    pub async fn list_apps(&self) -> Vec<AppInfo> {
        let state = self.state.lock().await;
        state
            .apps
            .iter()
            .map(|app| AppInfo {
                id: app.app_id.clone(),
                name: app.name.clone(),
                active: app.active,
            })
            .collect()
    }

    pub async fn active_app_id(&self) -> Option<String> {
        self.state.lock().await.active().map(|app| app.app_id.clone())
    }

    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    /// Forward a tool call to the active app and await its reply.
    ///
    /// Fails immediately when no app is active or its socket is closed.
    /// Otherwise the call resolves with the app's result, the app's error,
    /// or a timeout after the configured deadline.
    pub async fn call_tool(&self, tool: &str, args: Value) -> Result<Value, RouteError> {
        let reply = {
            let mut state = self.state.lock().await;
            let connection = match state.active() {
                Some(app) if app.connection.is_open() => app.connection.clone(),
                Some(_) => return Err(RouteError::ConnectionNotReady),
                None => return Err(RouteError::NoActiveApp),
            };

            let call_id = self.next_call_id();
            let (tx, rx) = oneshot::channel();
            let deadline = self.arm_deadline(call_id.clone());
            state.pending.insert(
                call_id.clone(),
                PendingCall {
                    connection: connection.id(),
                    tool: tool.to_string(),
                    reply: tx,
                    deadline,
                },
            );

            let message = WireMessage::ToolCall {
                call_id: call_id.clone(),
                tool: tool.to_string(),
                args,
            };
            if let Err(e) = connection.send(&message) {
                if let Some(call) = state.pending.remove(&call_id) {
                    call.deadline.abort();
                }
                return Err(e);
            }
            debug!(call_id = %call_id, tool = %tool, connection = %connection.id(), "Forwarded tool call");
            rx
        };

        reply
            .await
            .unwrap_or_else(|_| Err(RouteError::Abandoned("registry shut down".to_string())))
    }

    /// Resolve a pending call from a `toolResult`.
    ///
    /// Returns false when the id is unknown, already expired, or was sent on
    /// a different connection.
    pub async fn resolve(
        &self,
        conn_id: ConnectionId,
        call_id: &str,
        result: Option<Value>,
        error: Option<String>,
    ) -> bool {
        let call = {
            let mut state = self.state.lock().await;
            match state.pending.get(call_id) {
                Some(call) if call.connection == conn_id => {}
                Some(call) => {
                    warn!(
                        call_id = %call_id,
                        sent_on = %call.connection,
                        received_on = %conn_id,
                        "Ignoring result from a different connection"
                    );
                    return false;
                }
                None => {
                    debug!(call_id = %call_id, "Ignoring result for unknown or expired call");
                    return false;
                }
            }
            match state.pending.remove(call_id) {
                Some(call) => call,
                None => return false,
            }
        };

        call.deadline.abort();
        let outcome = match error {
            Some(message) => Err(RouteError::Remote(message)),
            None => Ok(result.unwrap_or(Value::Null)),
        };
        debug!(call_id = %call_id, tool = %call.tool, ok = outcome.is_ok(), "Tool call resolved");
        // The caller may have gone away; the entry is cleaned up either way.
        let _ = call.reply.send(outcome);
        true
    }

    fn next_call_id(&self) -> String {
        let n = self.next_call_id.fetch_add(1, Ordering::Relaxed) + 1;
        format!("call-{}", n)
    }

    fn arm_deadline(&self, call_id: String) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let timeout = self.config.call_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            let expired = state.lock().await.pending.remove(&call_id);
            if let Some(call) = expired {
                warn!(call_id = %call_id, tool = %call.tool, "Tool call timed out");
                let _ = call.reply.send(Err(RouteError::Timeout {
                    call_id,
                    tool: call.tool,
                }));
            }
        })
    }
}

fn generate_app_id() -> String {
    format!("app-{}", uuid::Uuid::new_v4().simple())
}
