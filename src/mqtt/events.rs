//! Pure event routing and inbound message dispatch for the MQTT facade.
//!
//! `route_event` turns raw rumqttc events into routing decisions; the
//! `InboundQueue`/`MessageDispatcher` pair moves inbound publishes off the
//! event task and onto the registered application handler.

use crate::api::MessageHandler;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rumqttc::v5::mqttbytes::v5::Packet;
use rumqttc::v5::Event;
use rumqttc::Outgoing;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

/// An application message delivered by the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    /// Topic the message arrived on.
    pub topic: String,
    /// Raw payload bytes, handed over without validation.
    pub payload: Bytes,
    /// Local receipt time. `None` for retained messages, whose original
    /// publish instant is unknown.
    pub received_at: Option<DateTime<Utc>>,
}

impl InboundMessage {
    /// Build a message from an inbound PUBLISH, deriving the receipt stamp.
    ///
    /// Live messages are stamped with the local wall clock; retained replays
    /// carry no timestamp because the broker does not say when they were
    /// originally published.
    pub fn from_publish(topic: String, payload: Bytes, retain: bool) -> Self {
        let received_at = if retain { None } else { Some(Utc::now()) };
        Self {
            topic,
            payload,
            received_at,
        }
    }

    /// True when this message is a retained replay rather than live traffic.
    pub fn is_retained(&self) -> bool {
        self.received_at.is_none()
    }

    /// Payload decoded as UTF-8 for display, with lossy replacement.
    pub fn payload_utf8_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone)]
pub enum EventRoute {
    /// CONNACK with a success reason code - the session is up.
    ConnectionAccepted,
    /// CONNACK with a non-success reason code.
    ConnectionRefused { reason: String },
    /// Application message received on a subscribed topic.
    MessageReceived {
        topic: String,
        payload: Bytes,
        retain: bool,
    },
    /// The broker closed the session with a DISCONNECT packet.
    BrokerDisconnect,
    /// Our own DISCONNECT packet was flushed to the wire.
    DisconnectFlushed,
    /// SUBACK arrived; grant codes are informational only.
    SubscriptionConfirmed {
        packet_id: u16,
        grants: Vec<String>,
    },
    /// Other inbound infrastructure traffic (PINGRESP, PUBACK, ...).
    Routine(String),
    /// Other outgoing traffic (handled inside rumqttc).
    OutgoingEvent,
}

/// Route an MQTT event to the matching lifecycle decision (pure function).
pub fn route_event(event: &Event) -> EventRoute {
    match event {
        Event::Incoming(incoming) => match incoming {
            Packet::ConnAck(ack) => {
                if matches!(
                    ack.code,
                    rumqttc::v5::mqttbytes::v5::ConnectReturnCode::Success
                ) {
                    EventRoute::ConnectionAccepted
                } else {
                    EventRoute::ConnectionRefused {
                        reason: format!("{:?}", ack.code),
                    }
                }
            }
            Packet::Publish(publish) => EventRoute::MessageReceived {
                topic: String::from_utf8_lossy(&publish.topic).to_string(),
                payload: publish.payload.clone(),
                retain: publish.retain,
            },
            Packet::Disconnect(_) => EventRoute::BrokerDisconnect,
            Packet::SubAck(suback) => EventRoute::SubscriptionConfirmed {
                packet_id: suback.pkid,
                grants: suback
                    .return_codes
                    .iter()
                    .map(|code| format!("{code:?}"))
                    .collect(),
            },
            other => EventRoute::Routine(format!("{other:?}")),
        },
        Event::Outgoing(Outgoing::Disconnect) => EventRoute::DisconnectFlushed,
        Event::Outgoing(_) => EventRoute::OutgoingEvent,
    }
}

/// Producer side of the inbound message queue (impure I/O).
///
/// The event task forwards through this without awaiting, so a slow handler
/// can never stall acknowledgment processing. When the queue is full the
/// message is dropped and logged rather than applying backpressure.
#[derive(Clone)]
pub struct InboundQueue {
    sender: mpsc::Sender<InboundMessage>,
}

impl InboundQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<InboundMessage>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Hand a message to the dispatcher without blocking.
    pub fn forward(&self, message: InboundMessage) {
        match self.sender.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(message)) => {
                warn!(
                    "Inbound queue full - dropping message on topic {}",
                    message.topic
                );
            }
            Err(TrySendError::Closed(message)) => {
                warn!(
                    "Inbound dispatcher stopped - dropping message on topic {}",
                    message.topic
                );
            }
        }
    }
}

/// Consumer side of the inbound queue: invokes the registered handler.
///
/// Runs as its own task so handler execution never shares a thread of control
/// with event-loop polling. The handler is read per message, so registering
/// or replacing it takes effect from the next delivery.
pub struct MessageDispatcher {
    handler: watch::Receiver<Option<Arc<dyn MessageHandler>>>,
}

impl MessageDispatcher {
    pub fn new(handler: watch::Receiver<Option<Arc<dyn MessageHandler>>>) -> Self {
        Self { handler }
    }

    /// Consume the queue until every producer is gone.
    pub async fn run(self, mut inbound: mpsc::Receiver<InboundMessage>) {
        while let Some(message) = inbound.recv().await {
            let handler = self.handler.borrow().clone();
            match handler {
                Some(handler) => {
                    debug!(
                        "Dispatching {} byte message on topic {}",
                        message.payload.len(),
                        message.topic
                    );
                    handler.on_message(message);
                }
                None => {
                    warn!(
                        "Received MQTT message but no handler registered - message dropped (topic: {})",
                        message.topic
                    );
                }
            }
        }
        debug!("Inbound dispatcher stopped");
    }
}
