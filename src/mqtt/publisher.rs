/// Publishing gateway messages to MQTT
use log::{debug, error};
use std::future::Future;

use rumqttc::{AsyncClient, QoS};
use tokio::task::JoinHandle;

use crate::config::SimulatorConfig;
use crate::models::GatewayEnvelope;
use crate::mqtt::connection::connect;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to serialize gateway message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to publish to topic {topic}: {reason}")]
    Transport { topic: String, reason: String },
}

/// Anything that can deliver a payload to a topic
pub trait Publisher {
    fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// Publisher backed by a broker connection
pub struct MqttPublisher {
    client: AsyncClient,
    event_loop: JoinHandle<()>,
}

impl MqttPublisher {
    pub fn new(config: &SimulatorConfig) -> Self {
        let (client, event_loop) = connect(
            &config.mqtt_host,
            config.mqtt_port,
            &config.mqtt_client_id,
        );
        Self { client, event_loop }
    }

    /// Disconnect from the broker and stop the event loop
    pub async fn shutdown(self) {
        if let Err(e) = self.client.disconnect().await {
            error!("Failed to disconnect from MQTT broker: {}", e);
        }
        self.event_loop.abort();
    }
}

impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let len = payload.len();
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| PublishError::Transport {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Queued {} bytes for {}", len, topic);
        Ok(())
    }
}

/// Serialize a gateway message to JSON and publish it
pub async fn publish_envelope<P: Publisher>(
    publisher: &P,
    topic: &str,
    envelope: &GatewayEnvelope,
) -> Result<(), PublishError> {
    let payload = serde_json::to_vec(envelope)?;
    publisher.publish(topic, payload).await
}
