/// RuuviTag data format 5 (RAWv2) encoding and decoding
///
/// Data format 5 is a 24-byte big-endian payload:
/// - Byte 0: Data format (5)
/// - Bytes 1-2: Temperature (signed 16-bit, 0.005°C resolution)
/// - Bytes 3-4: Humidity (unsigned 16-bit, 0.0025% resolution)
/// - Bytes 5-6: Pressure (unsigned 16-bit, +50000 Pa offset, 1 Pa resolution)
/// - Bytes 7-8: Acceleration X (signed 16-bit, 0.001 g resolution)
/// - Bytes 9-10: Acceleration Y (signed 16-bit, 0.001 g resolution)
/// - Bytes 11-12: Acceleration Z (signed 16-bit, 0.001 g resolution)
/// - Bytes 13-14: Battery voltage (11 bits, +1600 mV) and TX power (5 bits, -40 dBm, 2 dBm steps)
/// - Byte 15: Movement counter
/// - Bytes 16-17: Measurement sequence number
/// - Bytes 18-23: MAC address
///
/// The maximum value of every field (minimum for signed fields) is reserved as
/// "not available". The encoder clamps to the valid window so it never emits them.
use rand::Rng;

use crate::models::{Acceleration, MacAddress, SensorReading};

pub const DATA_FORMAT: u8 = 5;
pub const PAYLOAD_LEN: usize = 24;

/// Transmit power reported by simulated tags
pub const TX_POWER_DBM: i8 = 4;

const TEMPERATURE_SCALE: f64 = 200.0;
const HUMIDITY_SCALE: f64 = 400.0;
const PRESSURE_OFFSET_PA: f64 = 50_000.0;
const ACCELERATION_SCALE: f64 = 1000.0;

const I16_INVALID: i16 = i16::MIN;
const U16_INVALID: u16 = u16::MAX;
const U8_INVALID: u8 = u8::MAX;

const BATTERY_BITS: u32 = 11;
const TX_POWER_BITS: u32 = 5;
const _: () = assert!(BATTERY_BITS + TX_POWER_BITS == u16::BITS);

const BATTERY_RAW_MAX: u16 = (1 << BATTERY_BITS) - 1;
const TX_POWER_RAW_MAX: u8 = (1 << TX_POWER_BITS) - 1;
const BATTERY_OFFSET_MV: f64 = 1600.0;
const TX_POWER_OFFSET_DBM: i32 = -40;
const TX_POWER_STEP_DBM: i32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Format5Error {
    #[error("Data format 5 payload must be {PAYLOAD_LEN} bytes, got {0}")]
    InvalidLength(usize),

    #[error("Unsupported data format {0}, expected {DATA_FORMAT}")]
    UnsupportedFormat(u8),
}

/// The packed battery voltage / TX power field
///
/// Both parts are kept within their bit widths at construction, so packing can
/// never spill one field into the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerInfo {
    battery_raw: u16,
    tx_power_raw: u8,
}

impl PowerInfo {
    pub fn from_physical(battery_volts: f64, tx_power_dbm: i8) -> Self {
        let battery_raw = ((battery_volts * 1000.0).round_ties_even() - BATTERY_OFFSET_MV)
            .clamp(0.0, f64::from(BATTERY_RAW_MAX)) as u16;
        let tx_power_raw = (i32::from(tx_power_dbm) - TX_POWER_OFFSET_DBM)
            .div_euclid(TX_POWER_STEP_DBM)
            .clamp(0, i32::from(TX_POWER_RAW_MAX)) as u8;

        Self {
            battery_raw,
            tx_power_raw,
        }
    }

    pub fn pack(self) -> u16 {
        (self.battery_raw << TX_POWER_BITS) | u16::from(self.tx_power_raw)
    }

    pub fn unpack(raw: u16) -> Self {
        Self {
            battery_raw: raw >> TX_POWER_BITS,
            tx_power_raw: (raw & u16::from(TX_POWER_RAW_MAX)) as u8,
        }
    }

    /// Battery voltage in millivolts, `None` when the tag reports it unavailable
    pub fn battery_mv(self) -> Option<u16> {
        (self.battery_raw != BATTERY_RAW_MAX).then(|| self.battery_raw + BATTERY_OFFSET_MV as u16)
    }

    pub fn tx_power_dbm(self) -> Option<i8> {
        (self.tx_power_raw != TX_POWER_RAW_MAX).then(|| {
            (TX_POWER_OFFSET_DBM + i32::from(self.tx_power_raw) * TX_POWER_STEP_DBM) as i8
        })
    }
}

/// Per-advertisement counters that are not derived from the reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementCounters {
    pub movement_counter: u8,
    pub sequence_number: u16,
}

impl MeasurementCounters {
    /// Draw both counters uniformly from their valid (non-sentinel) range
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            movement_counter: rng.random_range(0..U8_INVALID),
            sequence_number: rng.random_range(0..U16_INVALID),
        }
    }
}

/// An encoded 24-byte data format 5 payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Format5Payload([u8; PAYLOAD_LEN]);

impl Format5Payload {
    pub fn as_bytes(&self) -> &[u8; PAYLOAD_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl TryFrom<&[u8]> for Format5Payload {
    type Error = Format5Error;

    fn try_from(data: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; PAYLOAD_LEN] = data
            .try_into()
            .map_err(|_| Format5Error::InvalidLength(data.len()))?;
        if bytes[0] != DATA_FORMAT {
            return Err(Format5Error::UnsupportedFormat(bytes[0]));
        }
        Ok(Self(bytes))
    }
}

/// Decoded contents of a payload; `None` marks a field reported as unavailable
#[derive(Debug, Clone, PartialEq)]
pub struct Format5Data {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    /// Pa
    pub pressure: Option<f64>,
    pub acceleration: Option<Acceleration>,
    /// V
    pub battery: Option<f64>,
    pub tx_power_dbm: Option<i8>,
    pub movement_counter: Option<u8>,
    pub sequence_number: Option<u16>,
    pub mac: MacAddress,
}

impl Format5Data {
    /// The physical reading, if every field of it is available
    pub fn reading(&self) -> Option<SensorReading> {
        Some(SensorReading {
            temperature: self.temperature?,
            humidity: self.humidity?,
            pressure: self.pressure?,
            acceleration: self.acceleration?,
            battery: self.battery?,
        })
    }
}

fn scale_i16(value: f64, scale: f64) -> i16 {
    (value * scale)
        .round_ties_even()
        .clamp(-f64::from(i16::MAX), f64::from(i16::MAX)) as i16
}

fn scale_u16(value: f64) -> u16 {
    value.clamp(0.0, f64::from(U16_INVALID - 1)) as u16
}

/// Encode a reading for the given tag
///
/// TX power is fixed at [`TX_POWER_DBM`].
pub fn encode(
    reading: &SensorReading,
    identity: &MacAddress,
    counters: MeasurementCounters,
) -> Format5Payload {
    let temperature = scale_i16(reading.temperature, TEMPERATURE_SCALE);
    let humidity = scale_u16((reading.humidity * HUMIDITY_SCALE).round_ties_even());
    let pressure = scale_u16(reading.pressure.round_ties_even() - PRESSURE_OFFSET_PA);
    let acc_x = scale_i16(reading.acceleration.x, ACCELERATION_SCALE);
    let acc_y = scale_i16(reading.acceleration.y, ACCELERATION_SCALE);
    let acc_z = scale_i16(reading.acceleration.z, ACCELERATION_SCALE);
    let power_info = PowerInfo::from_physical(reading.battery, TX_POWER_DBM).pack();

    let mut bytes = [0u8; PAYLOAD_LEN];
    bytes[0] = DATA_FORMAT;
    bytes[1..3].copy_from_slice(&temperature.to_be_bytes());
    bytes[3..5].copy_from_slice(&humidity.to_be_bytes());
    bytes[5..7].copy_from_slice(&pressure.to_be_bytes());
    bytes[7..9].copy_from_slice(&acc_x.to_be_bytes());
    bytes[9..11].copy_from_slice(&acc_y.to_be_bytes());
    bytes[11..13].copy_from_slice(&acc_z.to_be_bytes());
    bytes[13..15].copy_from_slice(&power_info.to_be_bytes());
    bytes[15] = counters.movement_counter.min(U8_INVALID - 1);
    bytes[16..18].copy_from_slice(&counters.sequence_number.min(U16_INVALID - 1).to_be_bytes());
    bytes[18..24].copy_from_slice(&identity.octets());

    Format5Payload(bytes)
}

/// Decode a payload back into physical units
pub fn decode(payload: &Format5Payload) -> Format5Data {
    let data = payload.as_bytes();
    let i16_at = |i: usize| i16::from_be_bytes([data[i], data[i + 1]]);
    let u16_at = |i: usize| u16::from_be_bytes([data[i], data[i + 1]]);

    let temperature = i16_at(1);
    let humidity = u16_at(3);
    let pressure = u16_at(5);
    let (acc_x, acc_y, acc_z) = (i16_at(7), i16_at(9), i16_at(11));
    let power = PowerInfo::unpack(u16_at(13));
    let movement_counter = data[15];
    let sequence_number = u16_at(16);

    let mut mac = [0u8; 6];
    mac.copy_from_slice(&data[18..24]);

    let acceleration = [acc_x, acc_y, acc_z]
        .iter()
        .all(|&axis| axis != I16_INVALID)
        .then(|| Acceleration {
            x: f64::from(acc_x) / ACCELERATION_SCALE,
            y: f64::from(acc_y) / ACCELERATION_SCALE,
            z: f64::from(acc_z) / ACCELERATION_SCALE,
        });

    Format5Data {
        temperature: (temperature != I16_INVALID)
            .then(|| f64::from(temperature) / TEMPERATURE_SCALE),
        humidity: (humidity != U16_INVALID).then(|| f64::from(humidity) / HUMIDITY_SCALE),
        pressure: (pressure != U16_INVALID).then(|| f64::from(pressure) + PRESSURE_OFFSET_PA),
        acceleration,
        battery: power.battery_mv().map(|mv| f64::from(mv) / 1000.0),
        tx_power_dbm: power.tx_power_dbm(),
        movement_counter: (movement_counter != U8_INVALID).then_some(movement_counter),
        sequence_number: (sequence_number != U16_INVALID).then_some(sequence_number),
        mac: MacAddress::new(mac),
    }
}
