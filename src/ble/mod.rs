//! BLE communication module.
//!
//! This module provides low-level Bluetooth Low Energy functionality
//! for discovering and talking to SwitchBot Bots.

pub mod advertising;
pub mod btleplug_backend;
pub mod connection;
pub(crate) mod guard;
pub mod notification;
pub mod resolver;
pub mod scanner;
pub mod transport;
pub mod uuids;

#[cfg(test)]
pub(crate) mod fake;

pub use advertising::{Advertisement, AdvertisementFilter, DeviceHandle};
pub use btleplug_backend::{BtleplugCentral, BtleplugConnection};
pub use connection::{Session, SessionRegistry, SessionState};
pub use notification::{NotificationChannel, PendingResponse};
pub use resolver::{CommunicationCharacteristics, ServiceResolver};
pub use scanner::AdvertisementScanner;
pub use transport::{AdvertisementStream, BleCentral, GattConnection, NotificationStream};
pub use uuids::*;
