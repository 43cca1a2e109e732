//! Service data decoding for Bot advertisements.
//!
//! Service data layout:
//! - Byte 0: Device signature (`0x48` plain, `0xc8` encrypted)
//! - Byte 1: Bit 7 mode (press/switch), bit 6 state
//! - Byte 2: Bits 0-6 battery percentage

use crate::error::{Error, Result};

/// Signature byte of an unencrypted Bot advertisement.
pub const PLAIN_SIGNATURE: u8 = 0x48;
/// Signature byte of an encrypted Bot advertisement.
pub const ENCRYPTED_SIGNATURE: u8 = 0xc8;

const MODE_BIT: u8 = 0x80;
const STATE_BIT: u8 = 0x40;
const BATTERY_MASK: u8 = 0x7f;

/// Flags extracted from Bot service data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdvertisementFlags {
    /// Whether the payload is encrypted.
    pub is_encrypted: bool,
    /// Advertised mode bit.
    pub mode: bool,
    /// Advertised state bit.
    pub state: bool,
    /// Advertised battery level, when present.
    pub battery_percent: Option<u8>,
}

/// Decode Bot service data.
///
/// A leading byte other than one of the two signatures is not a Bot and
/// yields [`Error::MalformedFrame`]. Missing trailing bytes leave the
/// corresponding flags unset.
pub fn decode_advertisement_flags(service_data: &[u8]) -> Result<AdvertisementFlags> {
    let is_encrypted = match service_data.first() {
        Some(&PLAIN_SIGNATURE) => false,
        Some(&ENCRYPTED_SIGNATURE) => true,
        Some(other) => {
            return Err(Error::MalformedFrame {
                context: format!("Unknown service data signature {:#04x}", other),
            })
        }
        None => {
            return Err(Error::MalformedFrame {
                context: "Empty service data".to_string(),
            })
        }
    };

    let flags_byte = service_data.get(1).copied().unwrap_or(0);

    Ok(AdvertisementFlags {
        is_encrypted,
        mode: flags_byte & MODE_BIT != 0,
        state: flags_byte & STATE_BIT != 0,
        battery_percent: service_data.get(2).map(|b| b & BATTERY_MASK),
    })
}
