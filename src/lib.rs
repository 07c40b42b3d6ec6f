//! Airzone MQTT connectivity
//!
//! An async MQTT facade for Airzone HVAC installations: awaitable connection
//! lifecycle, typed payload publishing, and a registration seam for inbound
//! message handling.
//!
//! # Overview
//!
//! This crate provides the MQTT plumbing an Airzone integration needs:
//! - Awaitable connect, disconnect and subscribe with bounded acknowledgment waits
//! - Fire-and-forget publish with typed payloads
//! - Message handler registration decoupled from the transport
//! - Retained-message detection with receive timestamps on live messages
//! - TOML configuration loading with validation
//! - Test doubles for the handler and publish seams
//!
//! # Quick Start
//!
//! ```rust
//! use airzone_mqtt::{MqttConfig, Payload};
//!
//! // Broker settings; port, keep-alive and ack timeout have defaults
//! let mut config = MqttConfig::new("broker.local");
//! config.username = Some("airzone".to_string());
//! config.password = Some("secret".to_string());
//! assert!(config.validate().is_ok());
//!
//! // Payloads mirror the value kinds Airzone topics carry
//! let text = Payload::from("test start");
//! let temperature = Payload::from(21.5);
//!
//! assert_eq!(text.into_bytes(), b"test start".to_vec());
//! assert_eq!(temperature.into_bytes(), b"21.5".to_vec());
//! assert!(Payload::Empty.into_bytes().is_empty());
//! ```
//!
//! Connecting and subscribing are shown in [`mqtt`].

pub mod api;
pub mod config;
pub mod error;
pub mod mqtt;
pub mod payload;
pub mod testing;

// Re-export the caller-facing types
pub use api::{AirzoneApi, MessageHandler, PublishSink};
pub use config::{ConfigError, MqttConfig};
pub use error::{MqttError, MqttResult};
pub use mqtt::client::{MqttClient, PublishHandle};
pub use mqtt::connection::{AckKind, ConnectionState};
pub use mqtt::events::InboundMessage;
pub use payload::Payload;

// Publish/subscribe quality of service, re-exported from rumqttc
pub use rumqttc::v5::mqttbytes::QoS;
