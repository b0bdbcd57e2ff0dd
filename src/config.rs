use log::debug;
use std::env;
use std::time::Duration;
use url::Url;

use crate::models::MacAddress;

const DEFAULT_BROKER: &str = "mosquitto";
const DEFAULT_PORT: u16 = 1883;
const DEFAULT_TOPIC: &str = "ruuvi/gateway/data";
const DEFAULT_CLIENT_ID: &str = "ruuvi-gateway-simulator";
const DEFAULT_PUBLISH_INTERVAL_SECS: f64 = 5.0;
const DEFAULT_SENSOR_DELAY_SECS: f64 = 0.5;
const DEFAULT_NUM_SENSORS: usize = 3;
// Bogus default, real gateway addresses should not end up in published configs
const DEFAULT_GATEWAY_MAC: &str = "AA:BB:CC:DD:EE:FF";

/// Built-in tag addresses, fixed so simulated sensors keep their identity across runs
const SENSOR_MACS: [&str; 5] = [
    "C6:99:AB:11:22:33",
    "C6:99:AB:44:55:66",
    "C6:99:AB:77:88:99",
    "C6:99:AB:AA:BB:CC",
    "C6:99:AB:DD:EE:FF",
];

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_topic: String,
    pub mqtt_client_id: String,
    pub publish_interval: Duration,
    pub sensor_delay: Duration,
    pub gateway_mac: MacAddress,
    pub sensor_macs: Vec<MacAddress>,
}

impl SimulatorConfig {
    /// Load configuration from the process environment and an optional `.env` file
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        // Load environment variables
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Box<dyn std::error::Error>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = match var("MQTT_PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|e| format!("Invalid MQTT_PORT '{}': {}", port, e))?,
            None => DEFAULT_PORT,
        };
        let broker = var("MQTT_BROKER").unwrap_or_else(|| DEFAULT_BROKER.to_string());
        let (mqtt_host, mqtt_port) = parse_broker(&broker, port)?;

        let publish_interval = parse_seconds(
            "PUBLISH_INTERVAL",
            var("PUBLISH_INTERVAL"),
            DEFAULT_PUBLISH_INTERVAL_SECS,
        )?;
        if publish_interval.is_zero() {
            return Err("PUBLISH_INTERVAL must be greater than zero".into());
        }
        let sensor_delay = parse_seconds(
            "SENSOR_DELAY",
            var("SENSOR_DELAY"),
            DEFAULT_SENSOR_DELAY_SECS,
        )?;

        let gateway_mac = var("GATEWAY_MAC")
            .unwrap_or_else(|| DEFAULT_GATEWAY_MAC.to_string())
            .parse::<MacAddress>()
            .map_err(|e| format!("Invalid GATEWAY_MAC: {}", e))?;

        let sensor_macs = match var("SENSOR_MACS") {
            Some(list) => parse_sensor_list(&list)?,
            None => {
                let count = match var("NUM_SENSORS") {
                    Some(count) => count
                        .parse::<usize>()
                        .map_err(|e| format!("Invalid NUM_SENSORS '{}': {}", count, e))?,
                    None => DEFAULT_NUM_SENSORS,
                };
                if count == 0 || count > SENSOR_MACS.len() {
                    return Err(format!(
                        "NUM_SENSORS must be between 1 and {}, got {}",
                        SENSOR_MACS.len(),
                        count
                    )
                    .into());
                }
                SENSOR_MACS[..count]
                    .iter()
                    .map(|mac| mac.parse::<MacAddress>())
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(SimulatorConfig {
            mqtt_host,
            mqtt_port,
            mqtt_topic: var("MQTT_TOPIC").unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
            mqtt_client_id: var("MQTT_CLIENT_ID").unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            publish_interval,
            sensor_delay,
            gateway_mac,
            sensor_macs,
        })
    }
}

/// Accept either a bare host name or an `mqtt://` / `tcp://` URL
///
/// A port in the URL wins over `MQTT_PORT`.
fn parse_broker(broker: &str, default_port: u16) -> Result<(String, u16), Box<dyn std::error::Error>> {
    if !broker.contains("://") {
        return Ok((broker.to_string(), default_port));
    }

    let url = Url::parse(broker).map_err(|e| format!("Invalid MQTT_BROKER '{}': {}", broker, e))?;
    if !matches!(url.scheme(), "mqtt" | "tcp") {
        return Err(format!(
            "Unsupported MQTT_BROKER scheme '{}' (expected mqtt:// or tcp://)",
            url.scheme()
        )
        .into());
    }
    let host = url
        .host_str()
        .ok_or_else(|| format!("MQTT_BROKER '{}' has no host", broker))?;

    Ok((host.to_string(), url.port().unwrap_or(default_port)))
}

fn parse_seconds(
    key: &str,
    value: Option<String>,
    default: f64,
) -> Result<Duration, Box<dyn std::error::Error>> {
    let Some(value) = value else {
        return Ok(Duration::from_secs_f64(default));
    };
    let secs = value
        .parse::<f64>()
        .map_err(|e| format!("Invalid {} '{}': {}", key, value, e))?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| format!("Invalid {} '{}': {}", key, value, e).into())
}

fn parse_sensor_list(list: &str) -> Result<Vec<MacAddress>, Box<dyn std::error::Error>> {
    let mut macs = Vec::new();
    for entry in list.split(',') {
        let entry = entry.trim();
        debug!("Processing sensor entry: '{}'", entry);
        if entry.is_empty() {
            continue;
        }
        let mac = entry
            .parse::<MacAddress>()
            .map_err(|e| format!("Invalid SENSOR_MACS entry: {}", e))?;
        if !macs.contains(&mac) {
            macs.push(mac);
        }
    }

    if macs.is_empty() {
        return Err("SENSOR_MACS is set but contains no sensor addresses".into());
    }
    Ok(macs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<SimulatorConfig, Box<dyn std::error::Error>> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SimulatorConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.mqtt_host, "mosquitto");
        assert_eq!(config.mqtt_port, 1883);
        assert_eq!(config.mqtt_topic, "ruuvi/gateway/data");
        assert_eq!(config.mqtt_client_id, "ruuvi-gateway-simulator");
        assert_eq!(config.publish_interval, Duration::from_secs(5));
        assert_eq!(config.sensor_delay, Duration::from_millis(500));
        assert_eq!(config.gateway_mac.to_string(), "AA:BB:CC:DD:EE:FF");
        let macs: Vec<String> = config.sensor_macs.iter().map(|m| m.to_string()).collect();
        assert_eq!(
            macs,
            ["C6:99:AB:11:22:33", "C6:99:AB:44:55:66", "C6:99:AB:77:88:99"]
        );
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("MQTT_BROKER", "localhost"),
            ("MQTT_PORT", "1884"),
            ("MQTT_TOPIC", "test/topic"),
            ("PUBLISH_INTERVAL", "0.25"),
            ("SENSOR_DELAY", "0"),
            ("NUM_SENSORS", "5"),
            ("GATEWAY_MAC", "11:22:33:44:55:66"),
        ])
        .unwrap();
        assert_eq!(config.mqtt_host, "localhost");
        assert_eq!(config.mqtt_port, 1884);
        assert_eq!(config.mqtt_topic, "test/topic");
        assert_eq!(config.publish_interval, Duration::from_millis(250));
        assert_eq!(config.sensor_delay, Duration::ZERO);
        assert_eq!(config.sensor_macs.len(), 5);
        assert_eq!(config.gateway_mac.to_string(), "11:22:33:44:55:66");
    }

    #[test]
    fn test_broker_url() {
        let config = load(&[("MQTT_BROKER", "mqtt://broker.local:8883")]).unwrap();
        assert_eq!(config.mqtt_host, "broker.local");
        assert_eq!(config.mqtt_port, 8883);

        let config = load(&[("MQTT_BROKER", "tcp://10.0.0.2"), ("MQTT_PORT", "1999")]).unwrap();
        assert_eq!(config.mqtt_host, "10.0.0.2");
        assert_eq!(config.mqtt_port, 1999);

        assert!(load(&[("MQTT_BROKER", "http://broker.local")]).is_err());
    }

    #[test]
    fn test_sensor_list_overrides_count() {
        let config = load(&[
            ("SENSOR_MACS", " f7:97:e3:6e:d8:11 , ,C6:99:AB:11:22:33,F7:97:E3:6E:D8:11"),
            ("NUM_SENSORS", "1"),
        ])
        .unwrap();
        let macs: Vec<String> = config.sensor_macs.iter().map(|m| m.to_string()).collect();
        assert_eq!(macs, ["F7:97:E3:6E:D8:11", "C6:99:AB:11:22:33"]);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(load(&[("MQTT_PORT", "not-a-port")]).is_err());
        assert!(load(&[("PUBLISH_INTERVAL", "0")]).is_err());
        assert!(load(&[("PUBLISH_INTERVAL", "-1")]).is_err());
        assert!(load(&[("SENSOR_DELAY", "soon")]).is_err());
        assert!(load(&[("NUM_SENSORS", "0")]).is_err());
        assert!(load(&[("NUM_SENSORS", "6")]).is_err());
        assert!(load(&[("GATEWAY_MAC", "AA:BB:CC")]).is_err());
        assert!(load(&[("SENSOR_MACS", "C6:99:AB:11:22:GG")]).is_err());
        assert!(load(&[("SENSOR_MACS", " , ")]).is_err());
    }
}
