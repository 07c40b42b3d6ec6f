//! Pure connection-lifecycle state for the MQTT facade.
//!
//! This module contains the connection state machine data, the acknowledgment
//! registry that pairs each lifecycle operation with its broker reply, and
//! transport option building. No I/O happens here.

use crate::config::MqttConfig;
use rumqttc::v5::MqttOptions;
use rumqttc::Transport as RumqttcTransport;
use std::fmt;
use tokio::sync::oneshot;

/// Connection state of the facade.
///
/// Transitions are driven only by broker events observed on the event task,
/// never directly by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No transport exists or the last one is gone.
    #[default]
    Disconnected,
    /// CONNECT sent, CONNACK outstanding.
    Connecting,
    /// CONNACK accepted; publish/subscribe are allowed.
    Connected,
    /// DISCONNECT issued, completion outstanding.
    Disconnecting,
}

impl ConnectionState {
    /// True only in [`ConnectionState::Connected`].
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// The acknowledgment kinds a caller can wait for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AckKind {
    Connect,
    Disconnect,
    Subscribe,
}

impl fmt::Display for AckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AckKind::Connect => "connect",
            AckKind::Disconnect => "disconnect",
            AckKind::Subscribe => "subscribe",
        };
        f.write_str(name)
    }
}

/// Outcome delivered to a waiter when its acknowledgment resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckNotice {
    /// The awaited broker reply arrived and was successful.
    Completed,
    /// CONNACK carried a non-success reason code.
    Refused { reason: String },
    /// The event loop ended before the awaited reply.
    Aborted { reason: String },
}

/// One pending acknowledgment slot per [`AckKind`].
///
/// Arming a kind creates a fresh oneshot channel and drops any previously
/// stored sender, which wakes a superseded waiter immediately. Resolution
/// consumes the slot, so each armed wait is answered at most once and no
/// state carries over between operations.
#[derive(Debug, Default)]
pub struct AckRegistry {
    connect: Option<oneshot::Sender<AckNotice>>,
    disconnect: Option<oneshot::Sender<AckNotice>>,
    subscribe: Option<oneshot::Sender<AckNotice>>,
}

impl AckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: AckKind) -> &mut Option<oneshot::Sender<AckNotice>> {
        match kind {
            AckKind::Connect => &mut self.connect,
            AckKind::Disconnect => &mut self.disconnect,
            AckKind::Subscribe => &mut self.subscribe,
        }
    }

    /// Arm the slot for `kind` and return the receiver to wait on.
    pub fn arm(&mut self, kind: AckKind) -> oneshot::Receiver<AckNotice> {
        let (sender, receiver) = oneshot::channel();
        *self.slot(kind) = Some(sender);
        receiver
    }

    /// Resolve an armed slot with `notice`. Returns false when nothing was
    /// armed for `kind` (an unsolicited or late broker reply).
    pub fn resolve(&mut self, kind: AckKind, notice: AckNotice) -> bool {
        match self.slot(kind).take() {
            Some(sender) => {
                // The waiter may have given up already; that is fine.
                let _ = sender.send(notice);
                true
            }
            None => false,
        }
    }

    /// Resolve every armed slot with an abort notice.
    pub fn abort_all(&mut self, reason: &str) {
        for kind in [AckKind::Connect, AckKind::Disconnect, AckKind::Subscribe] {
            self.resolve(
                kind,
                AckNotice::Aborted {
                    reason: reason.to_string(),
                },
            );
        }
    }

    pub fn is_armed(&self, kind: AckKind) -> bool {
        match kind {
            AckKind::Connect => self.connect.is_some(),
            AckKind::Disconnect => self.disconnect.is_some(),
            AckKind::Subscribe => self.subscribe.is_some(),
        }
    }
}

/// Build rumqttc options from config.
///
/// Called once per connection attempt; without a fixed `client_id` each
/// attempt gets a unique id so a half-dead prior session on the broker never
/// collides with the new connect.
pub fn configure_mqtt_options(config: &MqttConfig) -> MqttOptions {
    let client_id = config
        .client_id
        .clone()
        .unwrap_or_else(generate_client_id);
    let mut mqtt_options = MqttOptions::new(client_id, &config.host, config.port);

    if config.use_tls {
        mqtt_options.set_transport(RumqttcTransport::tls_with_default_config());
    }

    if let Some(username) = &config.username {
        let password = config.password.clone().unwrap_or_default();
        mqtt_options.set_credentials(username, password);
    }

    mqtt_options.set_keep_alive(config.keep_alive());
    mqtt_options
}

fn generate_client_id() -> String {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    format!("airzone-mqtt-{timestamp}")
}
