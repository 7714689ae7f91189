// ABOUTME: Chat platform adapters and their shared connection state.
// ABOUTME: Slack is the only platform; its Socket Mode listener reports state here for /health.

pub mod slack;

use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Connection status of the inbound event transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected { reason: String },
}

/// Shared, cloneable cell holding the current [`ConnectionState`]
#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    inner: Arc<Mutex<ConnectionState>>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new(ConnectionState::Connecting)
    }
}

impl ConnectionStatus {
    pub fn new(initial: ConnectionState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn set(&self, state: ConnectionState) {
        if let Ok(mut current) = self.inner.lock() {
            *current = state;
        }
    }

    pub fn get(&self) -> ConnectionState {
        self.inner
            .lock()
            .map(|state| state.clone())
            .unwrap_or(ConnectionState::Disconnected {
                reason: "connection state lock poisoned".to_string(),
            })
    }

    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_serializes_tagged() {
        let json = serde_json::to_value(ConnectionState::Disconnected {
            reason: "timeout".to_string(),
        })
        .unwrap();
        assert_eq!(json["state"], "disconnected");
        assert_eq!(json["reason"], "timeout");

        let json = serde_json::to_value(ConnectionState::Connected).unwrap();
        assert_eq!(json, serde_json::json!({"state": "connected"}));
    }

    #[test]
    fn test_status_shared_between_clones() {
        let status = ConnectionStatus::default();
        assert_eq!(status.get(), ConnectionState::Connecting);
        let clone = status.clone();
        clone.set(ConnectionState::Connected);
        assert!(status.is_connected());
    }
}
