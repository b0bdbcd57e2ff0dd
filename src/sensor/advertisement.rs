/// BLE advertisement framing of data format 5 payloads
///
/// A Ruuvi Gateway forwards the raw advertisement as a sequence of
/// length-prefixed AD structures: a flags structure followed by the
/// manufacturer specific data structure carrying the sensor payload.
use crate::sensor::format5::{Format5Error, Format5Payload, PAYLOAD_LEN};

// RuuviTag protocol constants
const RUUVITAG_MANUFACTURER_ID: u16 = 0x0499; // Ruuvi Innovations Ltd. manufacturer ID
const AD_TYPE_FLAGS: u8 = 0x01;
const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;
const FLAGS_LE_GENERAL_DISCOVERABLE_NO_BR_EDR: u8 = 0x06;

const FLAGS_CHUNK: [u8; 3] = [0x02, AD_TYPE_FLAGS, FLAGS_LE_GENERAL_DISCOVERABLE_NO_BR_EDR];
// type byte + company id + payload
const MANUFACTURER_CHUNK_LEN: usize = 1 + 2 + PAYLOAD_LEN;
const FRAME_LEN: usize = FLAGS_CHUNK.len() + 1 + MANUFACTURER_CHUNK_LEN;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdvertisementError {
    #[error("Advertisement is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("Advertisement structure at offset {offset} overruns the frame")]
    Truncated { offset: usize },

    #[error("Advertisement has no Ruuvi manufacturer data")]
    NoManufacturerData,

    #[error("Invalid Ruuvi payload: {0}")]
    Payload(#[from] Format5Error),
}

/// Flags + manufacturer data advertisement carrying one payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementFrame([u8; FRAME_LEN]);

impl AdvertisementFrame {
    pub fn wrap(payload: &Format5Payload) -> Self {
        let mut frame = [0u8; FRAME_LEN];
        let (flags, rest) = frame.split_at_mut(FLAGS_CHUNK.len());
        flags.copy_from_slice(&FLAGS_CHUNK);

        rest[0] = MANUFACTURER_CHUNK_LEN as u8;
        rest[1] = AD_TYPE_MANUFACTURER_DATA;
        // Company identifiers are little-endian on air
        rest[2..4].copy_from_slice(&RUUVITAG_MANUFACTURER_ID.to_le_bytes());
        rest[4..].copy_from_slice(payload.as_bytes());

        Self(frame)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Uppercase hex without separators, as found in the gateway `data` field
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// Extract the Ruuvi payload from a gateway `data` hex string
    pub fn parse_hex(data: &str) -> Result<Format5Payload, AdvertisementError> {
        let bytes = hex::decode(data)?;
        let mut offset = 0;

        while offset < bytes.len() {
            let len = usize::from(bytes[offset]);
            if len == 0 {
                // Zero length marks early termination of the significant part
                break;
            }
            let structure = bytes
                .get(offset + 1..offset + 1 + len)
                .ok_or(AdvertisementError::Truncated { offset })?;

            if let [AD_TYPE_MANUFACTURER_DATA, id_lo, id_hi, payload @ ..] = structure {
                if u16::from_le_bytes([*id_lo, *id_hi]) == RUUVITAG_MANUFACTURER_ID {
                    return Ok(Format5Payload::try_from(payload)?);
                }
            }

            offset += 1 + len;
        }

        Err(AdvertisementError::NoManufacturerData)
    }
}
