//! Mock implementations for testing
//!
//! Provides mock MessageHandler and PublishSink implementations to enable
//! testing without an MQTT broker.

use crate::api::{MessageHandler, PublishSink};
use crate::error::MqttError;
use crate::mqtt::connection::ConnectionState;
use crate::mqtt::events::InboundMessage;
use crate::payload::Payload;
use async_trait::async_trait;
use rumqttc::v5::mqttbytes::QoS;
use std::sync::Mutex;

/// One publish call as seen by [`MockPublisher`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPublish {
    pub topic: String,
    pub payload: Payload,
    pub qos: QoS,
    pub retain: bool,
}

/// Message handler that records everything it receives.
///
/// Uses a std `Mutex` because [`MessageHandler::on_message`] is synchronous;
/// the lock is never held across an await point.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    messages: Mutex<Vec<InboundMessage>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, in arrival order.
    pub fn messages(&self) -> Vec<InboundMessage> {
        self.messages
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut seen) = self.messages.lock() {
            seen.clear();
        }
    }
}

impl MessageHandler for RecordingHandler {
    fn on_message(&self, message: InboundMessage) {
        if let Ok(mut seen) = self.messages.lock() {
            seen.push(message);
        }
    }
}

/// Publish sink that records calls instead of talking to a broker.
#[derive(Debug, Default)]
pub struct MockPublisher {
    published: Mutex<Vec<RecordedPublish>>,
    should_fail: bool,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A publisher whose every publish fails as if disconnected.
    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    /// Every recorded publish, in call order.
    pub fn published(&self) -> Vec<RecordedPublish> {
        self.published
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn clear_history(&self) {
        if let Ok(mut calls) = self.published.lock() {
            calls.clear();
        }
    }
}

#[async_trait]
impl PublishSink for MockPublisher {
    async fn publish(
        &self,
        topic: &str,
        payload: Payload,
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        if self.should_fail {
            return Err(MqttError::not_connected(ConnectionState::Disconnected));
        }

        if let Ok(mut calls) = self.published.lock() {
            calls.push(RecordedPublish {
                topic: topic.to_string(),
                payload,
                qos,
                retain,
            });
        }
        Ok(())
    }
}
