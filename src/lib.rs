// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # switchbot-bot-ble
//!
//! A cross-platform Rust library for discovering and controlling SwitchBot
//! Bot (button pusher) devices via Bluetooth Low Energy.
//!
//! ## Features
//!
//! - **Bot Discovery**: Time-bounded scans that recognise Bots by their
//!   advertised service data, including encrypted, mode and state flags
//! - **Status Query**: Battery, firmware, push strength, calibration and
//!   timer information over the notify/write characteristics
//! - **Actions**: Press, turn on and turn off
//! - **Deterministic cleanup**: Every operation releases its connection,
//!   including on timeout and cancellation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use switchbot_bot_ble::{BotManager, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = BotManager::new().await?;
//!
//!     for bot in manager.discover().await? {
//!         println!("Found Bot: {}", bot);
//!
//!         let status = manager.query_status(bot.address).await?;
//!         println!("  Battery: {}%", status.battery_percent);
//!         println!("  Firmware: {:.1}", status.firmware_version);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod bot_manager;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod protocol;

// Re-exports for convenience
pub use bot_manager::BotManager;
pub use config::BotConfig;
pub use error::{Error, OperationStep, Result};
pub use orchestrator::CommandOrchestrator;

// Re-export commonly used types from submodules
pub use ble::advertising::{Advertisement, AdvertisementFilter, DeviceHandle};
pub use ble::connection::SessionState;
pub use ble::transport::{BleCentral, GattConnection};
pub use btleplug::api::BDAddr;
pub use protocol::{
    decode_advertisement_flags, decode_status, decode_status_with_layout, encode_action,
    encode_query, encode_status, AdvertisementFlags, BotAction, CommandFrame, StatusLayout,
    StatusRecord,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<BotManager>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<BotConfig>();
        let _ = std::any::TypeId::of::<DeviceHandle>();
        let _ = std::any::TypeId::of::<StatusRecord>();
        let _ = std::any::TypeId::of::<CommandFrame>();
    }

    #[test]
    fn test_query_frame_bytes() {
        assert_eq!(encode_query().as_bytes(), &[0x57, 0x02]);
    }
}
