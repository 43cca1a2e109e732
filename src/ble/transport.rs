//! Platform BLE seam.
//!
//! The core only talks to the radio through these traits. The `btleplug`
//! backend implements them for real adapters; tests plug in fakes.

use std::pin::Pin;

use async_trait::async_trait;
use btleplug::api::{BDAddr, Characteristic, Descriptor, Service, WriteType};
use futures::stream::Stream;

use crate::ble::advertising::Advertisement;
use crate::error::Result;

/// Stream of advertisements received while scanning.
pub type AdvertisementStream = Pin<Box<dyn Stream<Item = Advertisement> + Send>>;

/// Stream of notified frames from one characteristic.
pub type NotificationStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// A BLE central able to scan and open connections.
#[async_trait]
pub trait BleCentral: Send + Sync {
    /// Connection type produced by [`BleCentral::connect`].
    type Connection: GattConnection + 'static;

    /// Start a continuous scan and return the advertisement stream.
    async fn start_scan(&self) -> Result<AdvertisementStream>;

    /// Stop a running scan.
    async fn stop_scan(&self) -> Result<()>;

    /// Connect to the device advertising `address`.
    ///
    /// Implementations may wait indefinitely for the device to appear; the
    /// caller bounds this call with its connect timeout.
    async fn connect(&self, address: BDAddr) -> Result<Self::Connection>;
}

/// An open GATT connection to one device.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GattConnection: Send + Sync {
    /// Address of the connected device.
    fn address(&self) -> BDAddr;

    /// Discover services whose UUID is in `uuids`.
    async fn discover_services(&self, uuids: &[uuid::Uuid]) -> Result<Vec<Service>>;

    /// Discover characteristics of `service` whose UUID is in `uuids`.
    ///
    /// The returned order is unspecified.
    async fn discover_characteristics(
        &self,
        uuids: &[uuid::Uuid],
        service: &Service,
    ) -> Result<Vec<Characteristic>>;

    /// Discover descriptors of `characteristic` whose UUID is in `uuids`.
    async fn discover_descriptors(
        &self,
        uuids: &[uuid::Uuid],
        characteristic: &Characteristic,
    ) -> Result<Vec<Descriptor>>;

    /// Subscribe to notifications from `characteristic`.
    async fn subscribe(&self, characteristic: &Characteristic) -> Result<NotificationStream>;

    /// Write `data` to `characteristic`.
    async fn write_characteristic(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: WriteType,
    ) -> Result<()>;

    /// Write `data` to `descriptor`.
    async fn write_descriptor(&self, descriptor: &Descriptor, data: &[u8]) -> Result<()>;

    /// Tear down the connection.
    async fn disconnect(&self) -> Result<()>;
}
