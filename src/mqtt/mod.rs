//! Awaitable MQTT connection lifecycle built on rumqttc
//!
//! This module provides a focused, decomposed MQTT facade that separates pure
//! functions from I/O operations for better testability and maintainability.
//!
//! # Architecture
//!
//! The module is split into three focused sub-modules:
//!
//! - [`connection`] - Pure connection state, the acknowledgment registry, and
//!   transport option building
//! - [`events`] - Pure event routing plus the inbound message queue and
//!   dispatcher
//! - [`client`] - Impure I/O operations and coordination
//!
//! # Usage
//!
//! ```rust,no_run
//! use airzone_mqtt::mqtt::MqttClient;
//! use airzone_mqtt::config::MqttConfig;
//! use airzone_mqtt::payload::Payload;
//! use airzone_mqtt::QoS;
//!
//! # tokio_test::block_on(async {
//! let config = MqttConfig::new("localhost");
//!
//! let mut client = MqttClient::new(config).await?;
//! client.connect().await?;
//! client.subscribe("airzone/#").await?;
//! client
//!     .publish("test/airzone", Payload::from("test start"), QoS::AtMostOnce, false)
//!     .await?;
//! client.disconnect().await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

pub mod client;
pub mod connection;
pub mod events;

// Re-export public types for convenience
pub use client::{MqttClient, PublishHandle};
pub use connection::{AckKind, ConnectionState};
pub use events::{EventRoute, InboundMessage};
