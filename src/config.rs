//! Broker configuration for the MQTT facade.
//!
//! Configuration is plain data: a TOML-loadable struct with defaults for
//! everything except the broker host. Credentials are stored directly; callers
//! that keep secrets elsewhere fill the fields themselves (see the `basic`
//! example, which reads them from the environment).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Broker connection parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MqttConfig {
    /// Broker hostname or IP address.
    pub host: String,
    /// Broker port (default: 1883; the TLS convention is 8883).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username, if the broker requires authentication.
    pub username: Option<String>,
    /// Password, if the broker requires authentication.
    pub password: Option<String>,
    /// Fixed client identifier. When unset, each connection attempt generates
    /// a unique `airzone-mqtt-{millis}` id so stale broker sessions never
    /// collide with a fresh connect.
    pub client_id: Option<String>,
    /// Use TLS with the platform default trust roots.
    #[serde(default)]
    pub use_tls: bool,
    /// MQTT keep-alive interval in seconds (default: 60).
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    /// Upper bound in seconds on every acknowledgment wait: CONNACK, SUBACK
    /// and disconnect completion (default: 10).
    #[serde(default = "default_ack_timeout_secs")]
    pub ack_timeout_secs: u64,
}

fn default_port() -> u16 {
    1883
}

fn default_keep_alive_secs() -> u64 {
    60
}

fn default_ack_timeout_secs() -> u64 {
    10
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MqttConfig {
    /// Minimal configuration for the given broker, defaults everywhere else.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: default_port(),
            username: None,
            password: None,
            client_id: None,
            use_tls: false,
            keep_alive_secs: default_keep_alive_secs(),
            ack_timeout_secs: default_ack_timeout_secs(),
        }
    }

    /// Load configuration from a TOML file and validate it.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: MqttConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "MQTT broker host must not be empty".to_string(),
            ));
        }
        if self.ack_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "ack_timeout_secs must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }

    /// Acknowledgment wait bound as a [`Duration`].
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_secs(self.ack_timeout_secs)
    }

    /// Keep-alive interval as a [`Duration`].
    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}
