use log::{error, info};

use ruuvi_gateway_simulator::config::SimulatorConfig;
use ruuvi_gateway_simulator::mqtt::MqttPublisher;
use ruuvi_gateway_simulator::simulator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging, RUST_LOG overrides the default level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match SimulatorConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    let sensors: Vec<String> = config.sensor_macs.iter().map(|mac| mac.to_string()).collect();
    info!("Starting Ruuvi Gateway MQTT Simulator");
    info!("MQTT Broker: {}:{}", config.mqtt_host, config.mqtt_port);
    info!("MQTT Topic: {}", config.mqtt_topic);
    info!(
        "Publishing interval: {:.1} seconds",
        config.publish_interval.as_secs_f64()
    );
    info!("Number of sensors: {}", config.sensor_macs.len());
    info!("Gateway MAC: {}", config.gateway_mac);
    info!("Sensor MACs: {}", sensors.join(", "));

    let publisher = MqttPublisher::new(&config);

    // Run the publish loop until Ctrl+C
    tokio::select! {
        _ = simulator::run(&config, &publisher) => {}
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Simulator stopped by user"),
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        }
    }

    publisher.shutdown().await;
    info!("Disconnected from MQTT broker");

    Ok(())
}
