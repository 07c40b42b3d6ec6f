//! Application-facing seams: inbound handler and publish capability.
//!
//! This module provides the two connection points between the MQTT facade and
//! the owning application - a handler trait for inbound messages and a sink
//! trait for outbound publishes - plus the `AirzoneApi` placeholder that the
//! Airzone device protocol layer will grow out of.

use crate::error::MqttError;
use crate::mqtt::events::InboundMessage;
use crate::payload::Payload;
use rumqttc::v5::mqttbytes::QoS;
use std::sync::Arc;
use tracing::warn;

/// Handler for inbound MQTT messages.
///
/// Registered on the facade with
/// [`MqttClient::set_message_handler`](crate::mqtt::MqttClient::set_message_handler)
/// and invoked on the dispatcher task, one message at a time, in arrival
/// order. Implementations decide what a message means; the facade never
/// inspects payloads.
pub trait MessageHandler: Send + Sync {
    fn on_message(&self, message: InboundMessage);
}

/// Outbound publish capability.
///
/// Abstraction over the facade's publish path to enable dependency injection
/// and testing.
#[async_trait::async_trait]
pub trait PublishSink: Send + Sync {
    /// Publish `payload` on `topic`, fire-and-forget.
    async fn publish(
        &self,
        topic: &str,
        payload: Payload,
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError>;
}

/// Application-side Airzone API object.
///
/// Holds the publish capability and receives every inbound message. Device
/// and zone handling is not built yet: messages are logged and publishes pass
/// through unchanged.
pub struct AirzoneApi {
    publisher: Arc<dyn PublishSink>,
}

impl AirzoneApi {
    pub fn new(publisher: Arc<dyn PublishSink>) -> Self {
        Self { publisher }
    }

    /// Publish through the capability held by this API object.
    pub async fn publish(
        &self,
        topic: &str,
        payload: Payload,
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        self.publisher.publish(topic, payload, qos, retain).await
    }
}

impl MessageHandler for AirzoneApi {
    // TODO: decode device and zone updates here once the Airzone data model
    // exists. Until then every message is surfaced in the log.
    fn on_message(&self, message: InboundMessage) {
        warn!(
            "Airzone message: topic={} payload={} received_at={:?}",
            message.topic,
            message.payload_utf8_lossy(),
            message.received_at
        );
    }
}
