//! Advertisement filtering.
//!
//! Decides whether a broadcast packet comes from a Bot and turns matching
//! packets into [`DeviceHandle`]s.

use std::hash::{Hash, Hasher};

use btleplug::api::BDAddr;
use uuid::Uuid;

use crate::ble::uuids::PRODUCT_SERVICE_DATA_UUID;
use crate::protocol::{decode_advertisement_flags, AdvertisementFlags};

/// One received advertisement packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Link-layer address of the sender.
    pub address: BDAddr,
    /// Service data entries as (UUID, payload) pairs.
    pub service_data: Vec<(Uuid, Vec<u8>)>,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
    /// Advertised local name.
    pub local_name: Option<String>,
}

impl Advertisement {
    /// Create an advertisement with only service data.
    pub fn new(address: BDAddr, service_data: Vec<(Uuid, Vec<u8>)>) -> Self {
        Self {
            address,
            service_data,
            rssi: None,
            local_name: None,
        }
    }
}

/// A Bot seen during a scan.
///
/// Two handles are equal when they refer to the same address, regardless of
/// the advertised flags.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceHandle {
    /// Link-layer address.
    pub address: BDAddr,
    /// Whether the advertisement payload is encrypted.
    pub is_encrypted: bool,
    /// Advertised mode bit (`true` = press mode).
    pub mode: bool,
    /// Advertised state bit.
    pub state: bool,
    /// Advertised battery level.
    pub battery_percent: Option<u8>,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
    /// Advertised local name.
    pub local_name: Option<String>,
}

impl DeviceHandle {
    /// Build a handle from an address and decoded flags.
    pub fn new(address: BDAddr, flags: AdvertisementFlags) -> Self {
        Self {
            address,
            is_encrypted: flags.is_encrypted,
            mode: flags.mode,
            state: flags.state,
            battery_percent: flags.battery_percent,
            rssi: None,
            local_name: None,
        }
    }
}

impl PartialEq for DeviceHandle {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for DeviceHandle {}

impl Hash for DeviceHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl std::fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)?;
        if self.is_encrypted {
            write!(f, " (encrypted)")?;
        }
        Ok(())
    }
}

/// Predicate and extractor over advertisement packets.
///
/// Scan admission and data extraction both go through [`AdvertisementFilter::extract`]
/// so they can never disagree.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvertisementFilter;

impl AdvertisementFilter {
    /// Create a new filter.
    pub fn new() -> Self {
        Self
    }

    /// Decode the flags of the first matching service data entry.
    pub fn extract(&self, advertisement: &Advertisement) -> Option<AdvertisementFlags> {
        if advertisement.service_data.is_empty() {
            return None;
        }

        advertisement
            .service_data
            .iter()
            .filter(|(uuid, _)| *uuid == PRODUCT_SERVICE_DATA_UUID)
            .find_map(|(_, data)| decode_advertisement_flags(data).ok())
    }

    /// Whether the packet comes from a Bot.
    pub fn matches(&self, advertisement: &Advertisement) -> bool {
        self.extract(advertisement).is_some()
    }

    /// Turn a matching packet into a device handle.
    pub fn classify(&self, advertisement: &Advertisement) -> Option<DeviceHandle> {
        self.extract(advertisement).map(|flags| {
            let mut handle = DeviceHandle::new(advertisement.address, flags);
            handle.rssi = advertisement.rssi;
            handle.local_name = advertisement.local_name.clone();
            handle
        })
    }
}
