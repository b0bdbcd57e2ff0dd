use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Errors produced when parsing a sensor or gateway MAC address
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacParseError {
    #[error("MAC address '{0}' must contain exactly 12 hex digits")]
    InvalidLength(String),

    #[error("MAC address '{address}' has an invalid octet '{octet}'")]
    InvalidOctet { address: String, octet: String },
}

/// 6-byte hardware address of a RuuviTag or gateway
///
/// Parsed from `C6:99:AB:11:22:33` (any case) or the bare `C699AB112233` form,
/// always displayed as uppercase colon-separated pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let pairs: Vec<&str> = if trimmed.contains(':') {
            trimmed.split(':').collect()
        } else if trimmed.len() == 12 && trimmed.is_ascii() {
            (0..6).map(|i| &trimmed[i * 2..i * 2 + 2]).collect()
        } else {
            return Err(MacParseError::InvalidLength(s.to_string()));
        };

        if pairs.len() != 6 || pairs.iter().any(|pair| pair.len() != 2) {
            return Err(MacParseError::InvalidLength(s.to_string()));
        }

        let mut bytes = [0u8; 6];
        for (byte, pair) in bytes.iter_mut().zip(pairs) {
            let invalid = || MacParseError::InvalidOctet {
                address: s.to_string(),
                octet: pair.to_string(),
            };
            // from_str_radix alone would accept a leading '+'
            if !pair.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *byte = u8::from_str_radix(pair, 16).map_err(|_| invalid())?;
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl Serialize for MacAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acceleration {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One simulated measurement, in physical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    /// Absolute pressure, Pa
    pub pressure: f64,
    /// Acceleration per axis, G
    pub acceleration: Acceleration,
    /// Battery voltage, V
    pub battery: f64,
}

/// Message published by a Ruuvi Gateway for a single advertisement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayEnvelope {
    pub gw_mac: MacAddress,
    pub rssi: i16,
    pub aoa: Vec<i16>,
    pub gwts: i64,
    pub ts: i64,
    pub data: String,
    pub coords: String,
}
