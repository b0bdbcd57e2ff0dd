/// Reproducible simulated readings for a sensor
///
/// Readings are derived from the sensor address and a coarse 10-second time
/// bucket, so every call for the same sensor within one bucket yields the same
/// values. Each call owns its seeded generator; nothing leaks into the RNG the
/// caller uses for RSSI and counters.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{Acceleration, MacAddress, SensorReading};

/// Length of one deterministic time bucket
pub const BUCKET_SECS: i64 = 10;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a hash
pub fn fnv1a_64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Seed for a sensor at a given Unix time: `fnv1a(mac) % 1000 + floor(now / 10)`
pub fn seed_for(identity: &MacAddress, now_secs: i64) -> u64 {
    let identity_seed = fnv1a_64(&identity.octets()) % 1000;
    let bucket = now_secs.div_euclid(BUCKET_SECS) as u64;
    identity_seed.wrapping_add(bucket)
}

/// Generate physically plausible readings around room conditions
pub fn generate(identity: &MacAddress, now_secs: i64) -> SensorReading {
    let mut rng = StdRng::seed_from_u64(seed_for(identity, now_secs));

    // Draw order is part of the reproducibility contract
    let temperature = 21.0 + rng.random_range(-5.0..=5.0);
    let humidity = 50.0 + rng.random_range(-10.0..=10.0);
    let pressure = 101_325.0 + rng.random_range(-1000.0..=1000.0);
    let x = rng.random_range(-0.1..=0.1);
    let y = rng.random_range(-0.1..=0.1);
    let z = 1.0 + rng.random_range(-0.1..=0.1);
    let battery = 2.9 + rng.random_range(0.0..=0.6);

    SensorReading {
        temperature,
        humidity,
        pressure,
        acceleration: Acceleration { x, y, z },
        battery,
    }
}
