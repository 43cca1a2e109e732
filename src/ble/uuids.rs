//! BLE Service, Characteristic and Descriptor UUIDs.
//!
//! Contains all UUID constants used for Bot communication.

use uuid::Uuid;

// Advertisement
/// Service data UUID identifying the product family (16-bit `0xfd3d`,
/// broadcast little-endian as `3d fd`).
pub const PRODUCT_SERVICE_DATA_UUID: Uuid =
    Uuid::from_u128(0x0000_fd3d_0000_1000_8000_00805f9b34fb);

// Communication Service (vendor custom)
/// Bot communication service UUID.
pub const COMMUNICATION_SERVICE_UUID: Uuid =
    Uuid::from_u128(0xcba2_0d00_224d_11e6_9fb8_0002a5d5c51b);
/// Write characteristic UUID (commands to the Bot).
pub const WRITE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xcba2_0002_224d_11e6_9fb8_0002a5d5c51b);
/// Notify characteristic UUID (responses from the Bot).
pub const NOTIFY_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xcba2_0003_224d_11e6_9fb8_0002a5d5c51b);

// Standard descriptors
/// Client Characteristic Configuration Descriptor UUID (`0x2902`).
pub const CCCD_UUID: Uuid = Uuid::from_u128(0x0000_2902_0000_1000_8000_00805f9b34fb);
/// Value written to the CCCD to enable notifications.
pub const CCCD_ENABLE_NOTIFY: [u8; 1] = [0x01];

/// Check if a characteristic UUID belongs to the communication service.
pub fn is_communication_characteristic(uuid: &Uuid) -> bool {
    *uuid == NOTIFY_CHARACTERISTIC_UUID || *uuid == WRITE_CHARACTERISTIC_UUID
}
