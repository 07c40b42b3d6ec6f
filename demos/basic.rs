//! Basic connection lifecycle walkthrough
//!
//! Connects to a broker, registers the Airzone message handler, subscribes to
//! the Airzone topic tree, publishes a start marker, listens for a while,
//! then publishes an end marker and disconnects cleanly.
//!
//! Usage:
//!   MQTT_HOST=localhost cargo run --example basic
//!   MQTT_HOST=broker.local MQTT_USER=airzone MQTT_PASS=secret cargo run --example basic

use airzone_mqtt::{AirzoneApi, MqttClient, MqttConfig, Payload, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Topic filter covering the whole Airzone tree.
const DEFAULT_TOPIC_FILTER: &str = "airzone/#";
/// How long to listen for inbound messages before shutting down. Longer than
/// the keep-alive interval, so at least one ping cycle is exercised.
const LISTEN_WINDOW: Duration = Duration::from_secs(65);

fn config_from_env() -> MqttConfig {
    let mut config =
        MqttConfig::new(std::env::var("MQTT_HOST").unwrap_or_else(|_| "localhost".to_string()));
    if let Some(port) = std::env::var("MQTT_PORT").ok().and_then(|p| p.parse().ok()) {
        config.port = port;
    }
    config.username = std::env::var("MQTT_USER").ok();
    config.password = std::env::var("MQTT_PASS").ok();
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = config_from_env();
    let topic_filter =
        std::env::var("MQTT_TOPIC").unwrap_or_else(|_| DEFAULT_TOPIC_FILTER.to_string());

    info!("🔌 Connecting to {}:{}", config.host, config.port);
    let mut client = MqttClient::new(config).await?;

    // Route every inbound message through the Airzone API layer.
    let api = Arc::new(AirzoneApi::new(Arc::new(client.publish_handle())));
    client.set_message_handler(api);

    client.connect().await?;
    client.subscribe(&topic_filter).await?;
    info!("✅ Connected and subscribed to {}", topic_filter);

    client
        .publish("test/airzone", Payload::from("test start"), QoS::AtMostOnce, false)
        .await?;

    info!("👂 Listening for {:?}...", LISTEN_WINDOW);
    tokio::time::sleep(LISTEN_WINDOW).await;

    client
        .publish("test/airzone", Payload::from("test end"), QoS::AtMostOnce, false)
        .await?;

    client.disconnect().await?;
    info!("✅ Demo complete");

    Ok(())
}
