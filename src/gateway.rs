/// Ruuvi Gateway message assembly
///
/// Turns a simulated advertisement into the flat JSON message a Ruuvi Gateway
/// publishes to MQTT for every tag it hears.
use rand::Rng;

use crate::models::{GatewayEnvelope, MacAddress};
use crate::sensor::{encode, generate, AdvertisementFrame, MeasurementCounters};

const RSSI_CEILING_DBM: i16 = -60;
const RSSI_SPREAD_DBM: i16 = 30;

/// Build the gateway message for one advertisement
///
/// RSSI is drawn from [-90, -60] dBm; both timestamps are `now_secs`.
pub fn assemble<R: Rng + ?Sized>(
    gateway: &MacAddress,
    frame: &AdvertisementFrame,
    now_secs: i64,
    rng: &mut R,
) -> GatewayEnvelope {
    GatewayEnvelope {
        gw_mac: *gateway,
        rssi: RSSI_CEILING_DBM - rng.random_range(0..=RSSI_SPREAD_DBM),
        aoa: Vec::new(),
        gwts: now_secs,
        ts: now_secs,
        data: frame.to_hex(),
        coords: String::new(),
    }
}

/// Run one publish tick for a sensor: reading, payload, advertisement, message
///
/// The reading is reproducible per sensor and 10-second bucket; `rng` only
/// supplies the per-message noise (counters and RSSI).
pub fn simulate_sensor<R: Rng + ?Sized>(
    sensor: &MacAddress,
    gateway: &MacAddress,
    now_secs: i64,
    rng: &mut R,
) -> GatewayEnvelope {
    let reading = generate(sensor, now_secs);
    let payload = encode(&reading, sensor, MeasurementCounters::random(rng));
    let frame = AdvertisementFrame::wrap(&payload);
    assemble(gateway, &frame, now_secs, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::format5::decode;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const NOW: i64 = 1_700_000_003;

    fn sensor() -> MacAddress {
        "C6:99:AB:11:22:33".parse().unwrap()
    }

    fn gateway() -> MacAddress {
        "AA:BB:CC:DD:EE:FF".parse().unwrap()
    }

    #[test]
    fn test_gateway_message_structure() {
        let mut rng = StdRng::seed_from_u64(42);
        let message = simulate_sensor(&sensor(), &gateway(), NOW, &mut rng);

        assert_eq!(message.gw_mac, gateway());
        assert!((-90..=-60).contains(&message.rssi));
        assert!(message.aoa.is_empty());
        assert_eq!(message.gwts, NOW);
        assert_eq!(message.ts, NOW);
        assert!(message.coords.is_empty());
        assert!(message.data.starts_with("0201061BFF9904"));
        assert_eq!(message.data.len(), 62);
        assert!(message
            .data
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_message_carries_sensor_reading() {
        let mut rng = StdRng::seed_from_u64(42);
        let message = simulate_sensor(&sensor(), &gateway(), NOW, &mut rng);

        let payload = AdvertisementFrame::parse_hex(&message.data).unwrap();
        let decoded = decode(&payload);
        let expected = generate(&sensor(), NOW);

        assert_eq!(decoded.mac, sensor());
        assert!((decoded.temperature.unwrap() - expected.temperature).abs() < 0.005);
        assert!((decoded.humidity.unwrap() - expected.humidity).abs() < 0.0025);
        assert!((decoded.pressure.unwrap() - expected.pressure).abs() <= 0.5);
        assert_eq!(decoded.tx_power_dbm, Some(4));
    }

    #[test]
    fn test_rssi_covers_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let frame = AdvertisementFrame::wrap(&encode(
            &generate(&sensor(), NOW),
            &sensor(),
            MeasurementCounters {
                movement_counter: 0,
                sequence_number: 0,
            },
        ));

        let rssis: Vec<i16> = (0..2000)
            .map(|_| assemble(&gateway(), &frame, NOW, &mut rng).rssi)
            .collect();
        assert!(rssis.iter().all(|rssi| (-90..=-60).contains(rssi)));
        assert!(rssis.contains(&-90));
        assert!(rssis.contains(&-60));
    }

    #[test]
    fn test_json_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        let message = simulate_sensor(&sensor(), &gateway(), NOW, &mut rng);
        let json: serde_json::Value = serde_json::to_value(&message).unwrap();

        let object = json.as_object().unwrap();
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, ["aoa", "coords", "data", "gw_mac", "gwts", "rssi", "ts"]);

        assert_eq!(json["gw_mac"], "AA:BB:CC:DD:EE:FF");
        assert_eq!(json["aoa"], serde_json::json!([]));
        assert_eq!(json["gwts"], NOW);
        assert_eq!(json["ts"], NOW);
        assert_eq!(json["coords"], "");
        assert!(json["rssi"].is_i64());
    }
}
