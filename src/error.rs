//! Error types for the MQTT facade.
//!
//! Every fallible facade operation returns a concrete [`MqttError`] instead of
//! silently timing out: refusals, closed connections and expired ack waits all
//! surface as distinct variants the caller can match on.

use crate::mqtt::connection::{AckKind, ConnectionState};
use std::time::Duration;
use thiserror::Error;

/// Main error type for facade operations
#[derive(Debug, Error)]
pub enum MqttError {
    /// The broker answered CONNACK with a non-success reason code.
    #[error("Broker refused the connection: {reason}")]
    ConnectionRefused { reason: String },

    /// The bounded wait for an acknowledgment expired.
    #[error("Timed out after {timeout:?} waiting for {op} acknowledgment")]
    AckTimeout { op: AckKind, timeout: Duration },

    /// The connection went away before the awaited acknowledgment arrived.
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// The operation needs an active connection and there is none.
    #[error("Not connected to the broker (state: {state:?})")]
    NotConnected { state: ConnectionState },

    /// The rumqttc client rejected a command (publish, subscribe, disconnect).
    #[error("MQTT client command failed: {0}")]
    ClientCommand(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl MqttError {
    /// Create a connection-closed error
    pub fn connection_closed<S: Into<String>>(reason: S) -> Self {
        Self::ConnectionClosed(reason.into())
    }

    /// Create a not-connected error for the given observed state
    pub fn not_connected(state: ConnectionState) -> Self {
        Self::NotConnected { state }
    }

    /// Wrap a rumqttc client command failure
    pub fn client_command<E: std::error::Error + Send + Sync + 'static>(error: E) -> Self {
        Self::ClientCommand(Box::new(error))
    }
}

/// Result type for facade operations
pub type MqttResult<T> = Result<T, MqttError>;
