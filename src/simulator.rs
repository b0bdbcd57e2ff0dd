/// Publish loop driving the simulated sensors
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use time::OffsetDateTime;
use tokio::time::sleep;

use crate::config::SimulatorConfig;
use crate::gateway::simulate_sensor;
use crate::mqtt::{publish_envelope, Publisher};
use crate::utils::{format_datetime, preview, unix_now};

const LOG_DATA_CHARS: usize = 20;

/// Publish one message for every configured sensor
///
/// Failures are logged and do not stop the round. Returns the number of
/// messages handed to the publisher.
pub async fn publish_round<P, R>(config: &SimulatorConfig, publisher: &P, rng: &mut R) -> usize
where
    P: Publisher,
    R: Rng + ?Sized,
{
    let mut published = 0;

    for sensor in &config.sensor_macs {
        let message = simulate_sensor(sensor, &config.gateway_mac, unix_now(), rng);

        match publish_envelope(publisher, &config.mqtt_topic, &message).await {
            Ok(()) => {
                published += 1;
                info!(
                    "Published to {} for sensor {}: RSSI: {}, Data: {}...",
                    config.mqtt_topic,
                    sensor,
                    message.rssi,
                    preview(&message.data, LOG_DATA_CHARS)
                );
            }
            Err(e) => error!("Failed to publish message for sensor {}: {}", sensor, e),
        }

        // Small delay between sensors to avoid flooding
        if !config.sensor_delay.is_zero() {
            sleep(config.sensor_delay).await;
        }
    }

    published
}

/// Publish rounds forever, one every `publish_interval`
pub async fn run<P: Publisher>(config: &SimulatorConfig, publisher: &P) {
    let mut rng = StdRng::from_os_rng();

    loop {
        info!(
            "Starting publish round at: {}",
            format_datetime(&OffsetDateTime::now_utc())
        );

        let published = publish_round(config, publisher, &mut rng).await;
        if published == 0 {
            warn!("No messages were published during this round!");
        }

        sleep(config.publish_interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mqtt::publisher::tests::RecordingPublisher;
    use crate::sensor::format5::decode;
    use crate::sensor::AdvertisementFrame;

    fn config() -> SimulatorConfig {
        SimulatorConfig::from_lookup(|key| match key {
            "SENSOR_DELAY" => Some("0".to_string()),
            "MQTT_TOPIC" => Some("ruuvi/test".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_round_publishes_every_sensor() {
        let config = config();
        let publisher = RecordingPublisher::default();
        let mut rng = StdRng::seed_from_u64(11);

        let published = publish_round(&config, &publisher, &mut rng).await;
        assert_eq!(published, 3);

        let messages = publisher.messages.lock().unwrap();
        assert_eq!(messages.len(), 3);
        for ((topic, payload), sensor) in messages.iter().zip(&config.sensor_macs) {
            assert_eq!(topic, "ruuvi/test");

            let json: serde_json::Value = serde_json::from_slice(payload).unwrap();
            assert_eq!(json["gw_mac"], "AA:BB:CC:DD:EE:FF");
            let rssi = json["rssi"].as_i64().unwrap();
            assert!((-90..=-60).contains(&rssi));

            let data = json["data"].as_str().unwrap();
            let decoded = decode(&AdvertisementFrame::parse_hex(data).unwrap());
            assert_eq!(&decoded.mac, sensor);
            assert!(decoded.reading().is_some());
        }
    }

    #[tokio::test]
    async fn test_round_survives_publish_failures() {
        let config = config();
        let publisher = RecordingPublisher {
            fail: true,
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(11);

        assert_eq!(publish_round(&config, &publisher, &mut rng).await, 0);
        assert!(publisher.messages.lock().unwrap().is_empty());
    }
}
