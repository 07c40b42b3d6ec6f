//! Integration tests for the MQTT facade
//!
//! Tests the facade's public surface including:
//! - Client creation and configuration validation
//! - Connection state gating for publish and subscribe
//! - Disconnect idempotence
//! - Message handler registration
//! - The Airzone API layer over the publish seam

use airzone_mqtt::testing::mocks::{MockPublisher, RecordingHandler};
use airzone_mqtt::{
    AirzoneApi, ConnectionState, InboundMessage, MessageHandler, MqttClient, MqttConfig,
    MqttError, Payload, QoS,
};
use bytes::Bytes;
use std::sync::Arc;

fn test_config() -> MqttConfig {
    MqttConfig::new("localhost")
}

fn test_config_with_auth() -> MqttConfig {
    let mut config = MqttConfig::new("localhost");
    config.username = Some("testuser".to_string());
    config.password = Some("testpass".to_string());
    config
}

fn test_config_tls() -> MqttConfig {
    let mut config = MqttConfig::new("localhost");
    config.port = 8883;
    config.use_tls = true;
    config
}

#[tokio::test]
async fn test_client_creation() {
    // Arrange: Create MQTT config
    let config = test_config();

    // Act: Create client
    let result = MqttClient::new(config).await;

    // Assert: Client created successfully but not yet connected
    assert!(result.is_ok(), "Client creation should succeed");
    let client = result.unwrap();
    assert!(
        !client.is_connected(),
        "Client should not be connected until connect() is called"
    );
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_client_creation_with_tls() {
    let result = MqttClient::new(test_config_tls()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_client_creation_with_auth() {
    let result = MqttClient::new(test_config_with_auth()).await;
    assert!(result.is_ok(), "Client with credentials should be created");
}

#[tokio::test]
async fn test_client_creation_rejects_invalid_config() {
    let mut config = test_config();
    config.host = String::new();

    let result = MqttClient::new(config).await;
    assert!(matches!(result, Err(MqttError::Config(_))));
}

#[tokio::test]
async fn test_publish_without_connection() {
    // Arrange: Create disconnected client
    let client = MqttClient::new(test_config()).await.unwrap();

    // Act: Attempt to publish without connecting
    let result = client
        .publish(
            "test/airzone",
            Payload::from("test start"),
            QoS::AtMostOnce,
            false,
        )
        .await;

    // Assert: Publishing without connection MUST return an error, not
    // silently queue the message
    match result {
        Err(MqttError::NotConnected { state }) => {
            assert_eq!(state, ConnectionState::Disconnected);
        }
        other => panic!("Expected NotConnected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_subscribe_without_connection() {
    let mut client = MqttClient::new(test_config()).await.unwrap();

    let result = client.subscribe("airzone/#").await;

    assert!(
        matches!(result, Err(MqttError::NotConnected { .. })),
        "Subscribing without connection should return NotConnected"
    );
}

#[tokio::test]
async fn test_disconnect_without_connection_is_clean_noop() {
    let mut client = MqttClient::new(test_config()).await.unwrap();

    // Never connected: disconnect must return promptly and leave the facade
    // reusable
    assert!(client.disconnect().await.is_ok());
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // And again, to confirm idempotence
    assert!(client.disconnect().await.is_ok());
}

#[tokio::test]
async fn test_publish_handle_clones_share_connection_state() {
    let client = MqttClient::new(test_config()).await.unwrap();
    let handle = client.publish_handle();
    let clone = handle.clone();

    for h in [handle, clone] {
        let result = h
            .publish("airzone/cmd", Payload::Empty, QoS::AtMostOnce, false)
            .await;
        assert!(
            matches!(result, Err(MqttError::NotConnected { .. })),
            "Every handle observes the facade's connection state"
        );
    }
}

#[tokio::test]
async fn test_message_handler_registration_lifecycle() {
    let client = MqttClient::new(test_config()).await.unwrap();
    assert!(!client.has_message_handler());

    client.set_message_handler(Arc::new(RecordingHandler::new()));
    assert!(client.has_message_handler());

    // Re-registering replaces rather than stacks
    client.set_message_handler(Arc::new(RecordingHandler::new()));
    assert!(client.has_message_handler());

    client.clear_message_handler();
    assert!(!client.has_message_handler());
}

#[tokio::test]
async fn test_airzone_api_forwards_publishes_unchanged() {
    // Arrange: API over a recording publish sink
    let publisher = Arc::new(MockPublisher::new());
    let api = AirzoneApi::new(publisher.clone());

    // Act
    api.publish(
        "airzone/zone1/setpoint",
        Payload::from(21.5),
        QoS::AtLeastOnce,
        true,
    )
    .await
    .unwrap();

    // Assert: exactly what was requested reached the sink
    let published = publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "airzone/zone1/setpoint");
    assert_eq!(published[0].payload, Payload::Float(21.5));
    assert_eq!(published[0].qos, QoS::AtLeastOnce);
    assert!(published[0].retain);
}

#[tokio::test]
async fn test_airzone_api_surfaces_publish_failure() {
    let api = AirzoneApi::new(Arc::new(MockPublisher::with_failure()));

    let result = api
        .publish("airzone/zone1/on", Payload::Integer(1), QoS::AtMostOnce, false)
        .await;

    assert!(result.is_err(), "Sink failures must reach the caller");
}

#[tokio::test]
async fn test_airzone_api_consumes_inbound_messages() {
    let api = AirzoneApi::new(Arc::new(MockPublisher::new()));

    // Live messages carry a receive timestamp
    let live = InboundMessage::from_publish(
        "airzone/zone1/temp".to_string(),
        Bytes::from("21.5"),
        false,
    );
    assert!(live.received_at.is_some());
    api.on_message(live);

    // Retained messages replayed by the broker do not
    let retained =
        InboundMessage::from_publish("airzone/mode".to_string(), Bytes::from("heat"), true);
    assert!(retained.received_at.is_none());
    api.on_message(retained);
}
