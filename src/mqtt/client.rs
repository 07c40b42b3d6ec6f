//! Impure I/O coordination for the MQTT facade.
//!
//! `MqttClient` owns the rumqttc transport, the event-delivery task and the
//! inbound dispatcher, and exposes the awaitable lifecycle operations. All
//! connection state changes happen on the event task; callers observe them
//! through a watch channel and per-operation acknowledgment waits.

use super::connection::{
    configure_mqtt_options, AckKind, AckNotice, AckRegistry, ConnectionState,
};
use super::events::{
    route_event, EventRoute, InboundMessage, InboundQueue, MessageDispatcher,
};
use crate::api::{MessageHandler, PublishSink};
use crate::config::MqttConfig;
use crate::error::MqttError;
use crate::payload::Payload;
use async_trait::async_trait;
use rumqttc::v5::{mqttbytes::QoS, AsyncClient, EventLoop};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capacity of the rumqttc request channel.
const REQUEST_CHANNEL_CAPACITY: usize = 10;
/// Inbound dispatch queue depth before load shedding kicks in.
const INBOUND_QUEUE_CAPACITY: usize = 64;
/// Grace period for the event task to wind down after a shutdown signal.
const EVENT_TASK_GRACE: Duration = Duration::from_secs(2);

/// Awaitable connection-lifecycle facade over rumqttc.
///
/// One instance manages at most one broker connection at a time. The
/// lifecycle operations take `&mut self`, so a single caller drives
/// connect/subscribe/disconnect in sequence; publishing takes `&self` and is
/// also available through cloneable [`PublishHandle`]s.
pub struct MqttClient {
    config: MqttConfig,
    client: Arc<Mutex<Option<AsyncClient>>>,
    acks: Arc<Mutex<AckRegistry>>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
    handler_tx: watch::Sender<Option<Arc<dyn MessageHandler>>>,
    inbound: InboundQueue,
    event_task: Option<JoinHandle<()>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    dispatcher_task: Option<JoinHandle<()>>,
}

impl MqttClient {
    /// Create a facade for the given broker. Validates the configuration and
    /// starts the inbound dispatcher; the network is not touched until
    /// [`connect`](Self::connect).
    pub async fn new(config: MqttConfig) -> Result<Self, MqttError> {
        config.validate()?;

        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (handler_tx, handler_rx) = watch::channel(None);
        let (inbound, inbound_rx) = InboundQueue::new(INBOUND_QUEUE_CAPACITY);
        let dispatcher_task = tokio::spawn(MessageDispatcher::new(handler_rx).run(inbound_rx));

        Ok(Self {
            config,
            client: Arc::new(Mutex::new(None)),
            acks: Arc::new(Mutex::new(AckRegistry::new())),
            state_tx,
            state_rx,
            handler_tx,
            inbound,
            event_task: None,
            shutdown_tx: None,
            dispatcher_task: Some(dispatcher_task),
        })
    }

    /// Register the inbound message handler, replacing any previous one.
    /// Takes effect from the next dispatched message.
    pub fn set_message_handler(&self, handler: Arc<dyn MessageHandler>) {
        self.handler_tx.send_replace(Some(handler));
    }

    /// Remove the registered handler; later messages are dropped with a log
    /// entry until a new one is registered.
    pub fn clear_message_handler(&self) {
        self.handler_tx.send_replace(None);
    }

    pub fn has_message_handler(&self) -> bool {
        self.handler_tx.borrow().is_some()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// A cloneable publish capability tied to this facade's connection.
    pub fn publish_handle(&self) -> PublishHandle {
        PublishHandle {
            client: self.client.clone(),
            state_rx: self.state_rx.clone(),
        }
    }

    /// Connect to the broker and wait for its CONNACK.
    ///
    /// Already connected is a no-op. Every attempt builds a fresh transport,
    /// so retrying after a refusal, a closed connection or a timeout is
    /// always safe. The wait is bounded by the configured ack timeout.
    pub async fn connect(&mut self) -> Result<(), MqttError> {
        if self.is_connected() {
            debug!("connect() called while already connected");
            return Ok(());
        }

        // Wind down any transport left over from a failed attempt.
        self.teardown_event_task().await;

        let connect_start = Instant::now();
        let mqtt_options = configure_mqtt_options(&self.config);
        let (client, event_loop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);

        let ack_rx = self.acks.lock().await.arm(AckKind::Connect);
        *self.client.lock().await = Some(client);
        let _ = self.state_tx.send(ConnectionState::Connecting);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        self.shutdown_tx = Some(shutdown_tx);
        self.event_task = Some(tokio::spawn(Self::run_event_loop(
            event_loop,
            self.state_tx.clone(),
            self.acks.clone(),
            self.inbound.clone(),
            shutdown_rx,
        )));

        match Self::wait_for_ack(ack_rx, AckKind::Connect, self.config.ack_timeout()).await {
            Ok(()) => {
                info!(
                    "MQTT connect time: {:?} ({}:{})",
                    connect_start.elapsed(),
                    self.config.host,
                    self.config.port
                );
                Ok(())
            }
            Err(e) => {
                // The attempt is dead; clear the transport so a retry starts clean.
                self.teardown_transport().await;
                Err(e)
            }
        }
    }

    /// Disconnect from the broker and wait for the session to end.
    ///
    /// Without an active transport this is an immediate no-op, so calling it
    /// on a never-connected or already-disconnected facade is safe. The state
    /// is `Disconnected` when this returns, timeout included.
    pub async fn disconnect(&mut self) -> Result<(), MqttError> {
        let maybe_client = self.client.lock().await.clone();
        let Some(client) = maybe_client else {
            debug!("disconnect() called with no active transport");
            return Ok(());
        };

        let disconnect_start = Instant::now();
        let ack_rx = self.acks.lock().await.arm(AckKind::Disconnect);
        let _ = self.state_tx.send(ConnectionState::Disconnecting);

        let result = match client.disconnect().await {
            Ok(()) => {
                Self::wait_for_ack(ack_rx, AckKind::Disconnect, self.config.ack_timeout()).await
            }
            Err(e) => {
                // Request channel gone means the connection is already down.
                debug!("Disconnect request not deliverable: {}", e);
                Ok(())
            }
        };

        self.teardown_transport().await;
        info!("MQTT disconnect time: {:?}", disconnect_start.elapsed());
        result
    }

    /// Subscribe to a topic filter (wildcards pass through untouched) and
    /// wait for the SUBACK. Requires an active connection. Grant codes are
    /// logged, not verified.
    pub async fn subscribe(&mut self, filter: &str) -> Result<(), MqttError> {
        let state = self.state();
        if !state.is_connected() {
            return Err(MqttError::not_connected(state));
        }

        let subscribe_start = Instant::now();
        let ack_rx = self.acks.lock().await.arm(AckKind::Subscribe);

        {
            let client = self.client.lock().await;
            let Some(client) = client.as_ref() else {
                return Err(MqttError::not_connected(ConnectionState::Disconnected));
            };
            client
                .subscribe(filter, QoS::AtMostOnce)
                .await
                .map_err(MqttError::client_command)?;
        }

        Self::wait_for_ack(ack_rx, AckKind::Subscribe, self.config.ack_timeout()).await?;
        info!(
            "MQTT subscribe time: {:?} (filter: {})",
            subscribe_start.elapsed(),
            filter
        );
        Ok(())
    }

    /// Publish a payload, fire-and-forget: no delivery wait beyond handing
    /// the message to the transport. Requires an active connection.
    pub async fn publish(
        &self,
        topic: &str,
        payload: Payload,
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        self.publish_handle().publish(topic, payload, qos, retain).await
    }

    /// Event-delivery task: polls the event loop until shutdown, a fatal
    /// error, or disconnect completion.
    async fn run_event_loop(
        mut event_loop: EventLoop,
        state_tx: watch::Sender<ConnectionState>,
        acks: Arc<Mutex<AckRegistry>>,
        inbound: InboundQueue,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        debug!("MQTT event loop started");
        loop {
            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        debug!("Shutdown signal received, stopping event loop");
                        break;
                    }
                }
                event_result = event_loop.poll() => {
                    match event_result {
                        Ok(event) => {
                            let route = route_event(&event);
                            if !Self::process_event_route(route, &state_tx, &acks, &inbound).await {
                                break;
                            }
                        }
                        Err(e) => {
                            Self::handle_event_loop_error(e, &state_tx, &acks).await;
                            break;
                        }
                    }
                }
            }
        }
        debug!("MQTT event loop stopped");
    }

    /// Apply one routed event. Returns false when the loop should stop.
    /// Extracted from the event task for testability.
    async fn process_event_route(
        route: EventRoute,
        state_tx: &watch::Sender<ConnectionState>,
        acks: &Arc<Mutex<AckRegistry>>,
        inbound: &InboundQueue,
    ) -> bool {
        match route {
            EventRoute::ConnectionAccepted => {
                let _ = state_tx.send(ConnectionState::Connected);
                acks.lock()
                    .await
                    .resolve(AckKind::Connect, AckNotice::Completed);
                info!("MQTT connection acknowledged by broker");
                true
            }
            EventRoute::ConnectionRefused { reason } => {
                warn!("MQTT connection refused: {}", reason);
                let _ = state_tx.send(ConnectionState::Disconnected);
                acks.lock()
                    .await
                    .resolve(AckKind::Connect, AckNotice::Refused { reason });
                false
            }
            EventRoute::MessageReceived {
                topic,
                payload,
                retain,
            } => {
                debug!("Received MQTT message on topic: {}", topic);
                inbound.forward(InboundMessage::from_publish(topic, payload, retain));
                true
            }
            EventRoute::BrokerDisconnect => {
                info!("Broker closed the MQTT session");
                let _ = state_tx.send(ConnectionState::Disconnected);
                let mut acks = acks.lock().await;
                acks.resolve(AckKind::Disconnect, AckNotice::Completed);
                acks.abort_all("broker closed the session");
                false
            }
            EventRoute::DisconnectFlushed => {
                debug!("DISCONNECT flushed to the broker");
                let _ = state_tx.send(ConnectionState::Disconnected);
                let mut acks = acks.lock().await;
                acks.resolve(AckKind::Disconnect, AckNotice::Completed);
                acks.abort_all("disconnected");
                false
            }
            EventRoute::SubscriptionConfirmed { packet_id, grants } => {
                debug!("Subscription confirmed (pkid {}): {:?}", packet_id, grants);
                acks.lock()
                    .await
                    .resolve(AckKind::Subscribe, AckNotice::Completed);
                true
            }
            EventRoute::Routine(event_str) => {
                debug!("MQTT event: {}", event_str);
                true
            }
            EventRoute::OutgoingEvent => true,
        }
    }

    /// Map an event loop failure onto state and pending acknowledgments.
    /// A refused CONNACK surfaces here as an error, not as an event.
    async fn handle_event_loop_error(
        error: rumqttc::v5::ConnectionError,
        state_tx: &watch::Sender<ConnectionState>,
        acks: &Arc<Mutex<AckRegistry>>,
    ) {
        let was_disconnecting = matches!(*state_tx.borrow(), ConnectionState::Disconnecting);
        let reason = error.to_string();
        let _ = state_tx.send(ConnectionState::Disconnected);

        let mut acks = acks.lock().await;
        match &error {
            rumqttc::v5::ConnectionError::ConnectionRefused(code) => {
                warn!("MQTT connection refused by broker: {:?}", code);
                acks.resolve(
                    AckKind::Connect,
                    AckNotice::Refused {
                        reason: format!("{code:?}"),
                    },
                );
            }
            _ if was_disconnecting => {
                debug!("MQTT connection closed while disconnecting: {}", error);
                acks.resolve(AckKind::Disconnect, AckNotice::Completed);
            }
            _ => {
                error!("MQTT event loop error: {}", error);
            }
        }
        acks.abort_all(&reason);
    }

    /// Wait for an armed acknowledgment, bounded by `timeout`.
    async fn wait_for_ack(
        ack_rx: oneshot::Receiver<AckNotice>,
        op: AckKind,
        timeout: Duration,
    ) -> Result<(), MqttError> {
        match tokio::time::timeout(timeout, ack_rx).await {
            Ok(Ok(AckNotice::Completed)) => Ok(()),
            Ok(Ok(AckNotice::Refused { reason })) => Err(MqttError::ConnectionRefused { reason }),
            Ok(Ok(AckNotice::Aborted { reason })) => Err(MqttError::ConnectionClosed(reason)),
            Ok(Err(_)) => Err(MqttError::connection_closed(format!(
                "{op} acknowledgment channel closed"
            ))),
            Err(_) => Err(MqttError::AckTimeout { op, timeout }),
        }
    }

    /// Signal the event task to stop and wait briefly for it to wind down.
    async fn teardown_event_task(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(true);
        }
        if let Some(handle) = self.event_task.take() {
            let abort = handle.abort_handle();
            match tokio::time::timeout(EVENT_TASK_GRACE, handle).await {
                Ok(Ok(())) => debug!("Event loop task shut down gracefully"),
                Ok(Err(e)) if !e.is_cancelled() => {
                    warn!("Event loop task ended with error: {}", e);
                }
                Err(_) => {
                    warn!("Event loop task did not stop in time, aborting");
                    abort.abort();
                }
                _ => {}
            }
        }
    }

    /// Stop the event task, drop the transport and publish `Disconnected`.
    async fn teardown_transport(&mut self) {
        self.teardown_event_task().await;
        *self.client.lock().await = None;
        let _ = self.state_tx.send(ConnectionState::Disconnected);
    }
}

impl Drop for MqttClient {
    fn drop(&mut self) {
        // Stop the background tasks; a clean DISCONNECT packet needs an
        // explicit disconnect() call before dropping.
        if let Some(shutdown_tx) = &self.shutdown_tx {
            let _ = shutdown_tx.send(true);
        }
        if let Some(handle) = self.event_task.take() {
            handle.abort();
        }
        if let Some(handle) = self.dispatcher_task.take() {
            handle.abort();
        }
    }
}

/// Cloneable publish capability handed to the application layer.
///
/// Shares the facade's transport and state, so it observes connects and
/// disconnects as they happen. Publishing while not connected fails the same
/// way it does on the facade.
#[derive(Clone)]
pub struct PublishHandle {
    client: Arc<Mutex<Option<AsyncClient>>>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl PublishHandle {
    /// Publish a payload, fire-and-forget. Requires an active connection.
    pub async fn publish(
        &self,
        topic: &str,
        payload: Payload,
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        let state = *self.state_rx.borrow();
        if !state.is_connected() {
            return Err(MqttError::not_connected(state));
        }

        let kind = payload.kind();
        let client = self.client.lock().await;
        let Some(client) = client.as_ref() else {
            return Err(MqttError::not_connected(ConnectionState::Disconnected));
        };
        client
            .publish(topic, qos, retain, payload.into_bytes())
            .await
            .map_err(MqttError::client_command)?;

        debug!(
            "Published {} payload to {} (qos {:?}, retain {})",
            kind, topic, qos, retain
        );
        Ok(())
    }
}

#[async_trait]
impl PublishSink for PublishHandle {
    async fn publish(
        &self,
        topic: &str,
        payload: Payload,
        qos: QoS,
        retain: bool,
    ) -> Result<(), MqttError> {
        // Delegate to the inherent publish method.
        PublishHandle::publish(self, topic, payload, qos, retain).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn test_config() -> MqttConfig {
        MqttConfig::new("localhost")
    }

    fn test_channels() -> (
        watch::Sender<ConnectionState>,
        watch::Receiver<ConnectionState>,
        Arc<Mutex<AckRegistry>>,
    ) {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Connecting);
        (state_tx, state_rx, Arc::new(Mutex::new(AckRegistry::new())))
    }

    #[tokio::test]
    async fn test_wait_for_ack_completed() {
        let (tx, rx) = oneshot::channel();
        tx.send(AckNotice::Completed).unwrap();

        let result =
            MqttClient::wait_for_ack(rx, AckKind::Connect, Duration::from_millis(100)).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_wait_for_ack_refused() {
        let (tx, rx) = oneshot::channel();
        tx.send(AckNotice::Refused {
            reason: "NotAuthorized".to_string(),
        })
        .unwrap();

        let result =
            MqttClient::wait_for_ack(rx, AckKind::Connect, Duration::from_millis(100)).await;
        match result {
            Err(MqttError::ConnectionRefused { reason }) => assert_eq!(reason, "NotAuthorized"),
            other => panic!("Expected ConnectionRefused, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_for_ack_aborted() {
        let (tx, rx) = oneshot::channel();
        tx.send(AckNotice::Aborted {
            reason: "connection closed".to_string(),
        })
        .unwrap();

        let result =
            MqttClient::wait_for_ack(rx, AckKind::Subscribe, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(MqttError::ConnectionClosed(_))));
    }

    #[tokio::test]
    async fn test_wait_for_ack_timeout() {
        // Keep the sender alive so the wait can only end by timeout.
        let (_tx, rx) = oneshot::channel::<AckNotice>();

        let result =
            MqttClient::wait_for_ack(rx, AckKind::Disconnect, Duration::from_millis(10)).await;
        match result {
            Err(MqttError::AckTimeout { op, timeout }) => {
                assert_eq!(op, AckKind::Disconnect);
                assert_eq!(timeout, Duration::from_millis(10));
            }
            other => panic!("Expected AckTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wait_for_ack_channel_closed() {
        let (tx, rx) = oneshot::channel::<AckNotice>();
        drop(tx);

        let result =
            MqttClient::wait_for_ack(rx, AckKind::Connect, Duration::from_millis(100)).await;
        assert!(matches!(result, Err(MqttError::ConnectionClosed(_))));
    }

    #[tokio::test]
    async fn test_client_creation_starts_disconnected() {
        let client = MqttClient::new(test_config()).await.unwrap();
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_connected());
        assert!(!client.has_message_handler());
    }

    #[tokio::test]
    async fn test_client_creation_rejects_invalid_config() {
        let mut config = test_config();
        config.host = String::new();

        let result = MqttClient::new(config).await;
        assert!(matches!(result, Err(MqttError::Config(_))));
    }

    #[tokio::test]
    async fn test_publish_without_connection_fails() {
        let client = MqttClient::new(test_config()).await.unwrap();

        let result = client
            .publish("test/airzone", Payload::from("test start"), QoS::AtMostOnce, false)
            .await;
        assert!(matches!(
            result,
            Err(MqttError::NotConnected {
                state: ConnectionState::Disconnected
            })
        ));
    }

    #[tokio::test]
    async fn test_publish_handle_without_connection_fails() {
        let client = MqttClient::new(test_config()).await.unwrap();
        let handle = client.publish_handle();

        let result = handle
            .publish("test/airzone", Payload::Empty, QoS::AtMostOnce, false)
            .await;
        assert!(matches!(result, Err(MqttError::NotConnected { .. })));
    }

    #[tokio::test]
    async fn test_subscribe_without_connection_fails() {
        let mut client = MqttClient::new(test_config()).await.unwrap();

        let result = client.subscribe("airzone/#").await;
        assert!(matches!(result, Err(MqttError::NotConnected { .. })));
    }

    #[tokio::test]
    async fn test_disconnect_without_connection_is_noop() {
        let mut client = MqttClient::new(test_config()).await.unwrap();

        let result = client.disconnect().await;
        assert!(result.is_ok());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_handler_registration_and_replacement() {
        let client = MqttClient::new(test_config()).await.unwrap();
        assert!(!client.has_message_handler());

        let recorder = Arc::new(crate::testing::mocks::RecordingHandler::new());
        client.set_message_handler(recorder.clone());
        assert!(client.has_message_handler());

        client.set_message_handler(Arc::new(crate::testing::mocks::RecordingHandler::new()));
        assert!(client.has_message_handler());

        client.clear_message_handler();
        assert!(!client.has_message_handler());
    }

    #[tokio::test]
    async fn test_route_connection_accepted_resolves_connect_ack() {
        let (state_tx, state_rx, acks) = test_channels();
        let (inbound, _inbound_rx) = InboundQueue::new(4);
        let mut ack_rx = acks.lock().await.arm(AckKind::Connect);

        let keep_polling = MqttClient::process_event_route(
            EventRoute::ConnectionAccepted,
            &state_tx,
            &acks,
            &inbound,
        )
        .await;

        assert!(keep_polling);
        assert_eq!(*state_rx.borrow(), ConnectionState::Connected);
        assert_eq!(ack_rx.try_recv(), Ok(AckNotice::Completed));
    }

    #[tokio::test]
    async fn test_route_connection_refused_stops_polling() {
        let (state_tx, state_rx, acks) = test_channels();
        let (inbound, _inbound_rx) = InboundQueue::new(4);
        let mut ack_rx = acks.lock().await.arm(AckKind::Connect);

        let keep_polling = MqttClient::process_event_route(
            EventRoute::ConnectionRefused {
                reason: "NotAuthorized".to_string(),
            },
            &state_tx,
            &acks,
            &inbound,
        )
        .await;

        assert!(!keep_polling);
        assert_eq!(*state_rx.borrow(), ConnectionState::Disconnected);
        assert_eq!(
            ack_rx.try_recv(),
            Ok(AckNotice::Refused {
                reason: "NotAuthorized".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_route_message_received_forwards_to_queue() {
        let (state_tx, _state_rx, acks) = test_channels();
        let (inbound, mut inbound_rx) = InboundQueue::new(4);

        let keep_polling = MqttClient::process_event_route(
            EventRoute::MessageReceived {
                topic: "airzone/zone1/temp".to_string(),
                payload: Bytes::from("21.5"),
                retain: true,
            },
            &state_tx,
            &acks,
            &inbound,
        )
        .await;

        assert!(keep_polling);
        let message = inbound_rx.recv().await.unwrap();
        assert_eq!(message.topic, "airzone/zone1/temp");
        assert!(message.is_retained());
    }

    #[tokio::test]
    async fn test_route_broker_disconnect_completes_ack_and_aborts_rest() {
        let (state_tx, state_rx, acks) = test_channels();
        let (inbound, _inbound_rx) = InboundQueue::new(4);
        let mut disconnect_rx = acks.lock().await.arm(AckKind::Disconnect);
        let mut subscribe_rx = acks.lock().await.arm(AckKind::Subscribe);

        let keep_polling = MqttClient::process_event_route(
            EventRoute::BrokerDisconnect,
            &state_tx,
            &acks,
            &inbound,
        )
        .await;

        assert!(!keep_polling);
        assert_eq!(*state_rx.borrow(), ConnectionState::Disconnected);
        assert_eq!(disconnect_rx.try_recv(), Ok(AckNotice::Completed));
        assert!(matches!(
            subscribe_rx.try_recv(),
            Ok(AckNotice::Aborted { .. })
        ));
    }

    #[tokio::test]
    async fn test_route_suback_resolves_subscribe_ack() {
        let (state_tx, _state_rx, acks) = test_channels();
        let (inbound, _inbound_rx) = InboundQueue::new(4);
        let mut ack_rx = acks.lock().await.arm(AckKind::Subscribe);

        let keep_polling = MqttClient::process_event_route(
            EventRoute::SubscriptionConfirmed {
                packet_id: 1,
                grants: vec!["QoS0".to_string()],
            },
            &state_tx,
            &acks,
            &inbound,
        )
        .await;

        assert!(keep_polling);
        assert_eq!(ack_rx.try_recv(), Ok(AckNotice::Completed));
    }

    #[tokio::test]
    async fn test_event_loop_error_aborts_pending_acks() {
        let (state_tx, state_rx, acks) = test_channels();
        let mut connect_rx = acks.lock().await.arm(AckKind::Connect);

        let error = rumqttc::v5::ConnectionError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset",
        ));
        MqttClient::handle_event_loop_error(error, &state_tx, &acks).await;

        assert_eq!(*state_rx.borrow(), ConnectionState::Disconnected);
        assert!(matches!(
            connect_rx.try_recv(),
            Ok(AckNotice::Aborted { .. })
        ));
    }

    #[tokio::test]
    async fn test_event_loop_error_while_disconnecting_completes_disconnect() {
        let (state_tx, state_rx, acks) = test_channels();
        let _ = state_tx.send(ConnectionState::Disconnecting);
        let mut disconnect_rx = acks.lock().await.arm(AckKind::Disconnect);

        let error = rumqttc::v5::ConnectionError::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionAborted,
            "closed by peer",
        ));
        MqttClient::handle_event_loop_error(error, &state_tx, &acks).await;

        assert_eq!(*state_rx.borrow(), ConnectionState::Disconnected);
        assert_eq!(disconnect_rx.try_recv(), Ok(AckNotice::Completed));
    }

    #[tokio::test]
    async fn test_refusal_error_resolves_connect_ack_with_reason() {
        let (state_tx, _state_rx, acks) = test_channels();
        let mut connect_rx = acks.lock().await.arm(AckKind::Connect);

        let error = rumqttc::v5::ConnectionError::ConnectionRefused(
            rumqttc::v5::mqttbytes::v5::ConnectReturnCode::NotAuthorized,
        );
        MqttClient::handle_event_loop_error(error, &state_tx, &acks).await;

        assert_eq!(
            connect_rx.try_recv(),
            Ok(AckNotice::Refused {
                reason: "NotAuthorized".to_string()
            })
        );
    }
}
