//! App connection handle
//!
//! The listener owns the actual socket; the registry only holds this handle,
//! an outbound queue drained by the socket's writer task. Each accepted
//! socket gets a fresh `ConnectionId`, so a reconnect under the same app id
//! is distinguishable from the transport it replaced.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use nw_core::WireMessage;
use tokio::sync::mpsc;

use crate::error::RouteError;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct AppConnection {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
}

impl AppConnection {
    /// Create a handle plus the receiving end the socket writer drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let id = ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
        (Self { id, outbound }, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// False once the writer side has gone away.
    pub fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    pub fn send(&self, message: &WireMessage) -> Result<(), RouteError> {
        let text = message
            .to_json()
            .map_err(|e| RouteError::Abandoned(e.to_string()))?;
        self.outbound
            .send(text)
            .map_err(|_| RouteError::ConnectionNotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let (a, _ra) = AppConnection::channel();
        let (b, _rb) = AppConnection::channel();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_closed_when_receiver_dropped() {
        let (conn, rx) = AppConnection::channel();
        assert!(conn.is_open());
        drop(rx);
        assert!(!conn.is_open());
        let err = conn
            .send(&WireMessage::Registered { app_id: "a".into() })
            .unwrap_err();
        assert_eq!(err, RouteError::ConnectionNotReady);
    }
}
