use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet};
use tokio::task::JoinHandle;
use tokio::time::Duration;

const KEEP_ALIVE_SECS: u64 = 60;
const REQUEST_CHANNEL_CAPACITY: usize = 10;
const WAIT_BETWEEN_RETRIES: u64 = 5;

/// Create an MQTT client and drive its event loop on a background task
///
/// The broker connection is established lazily by the event loop. Connection
/// errors are logged and the loop waits before polling again, which makes
/// rumqttc reconnect; queued publishes are sent once the broker is back.
pub fn connect(host: &str, port: u16, client_id: &str) -> (AsyncClient, JoinHandle<()>) {
    let mut options = MqttOptions::new(client_id, host, port);
    options.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));

    let (client, mut event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
    let broker = format!("{}:{}", host, port);

    let handle = tokio::spawn(async move {
        loop {
            match event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        info!("Connected to MQTT broker at {}", broker);
                    } else {
                        error!(
                            "Failed to connect to MQTT broker, return code: {:?}",
                            ack.code
                        );
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    warn!("MQTT broker at {} closed the session", broker);
                }
                Ok(notification) => {
                    debug!("MQTT notification: {:?}", notification);
                }
                Err(e) => {
                    error!("MQTT connection error: {}", e);
                    tokio::time::sleep(Duration::from_secs(WAIT_BETWEEN_RETRIES)).await;
                }
            }
        }
    });

    (client, handle)
}
