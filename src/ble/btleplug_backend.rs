//! `btleplug` implementation of the platform seam.

use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    BDAddr, Central, CentralEvent, Characteristic, Descriptor, Manager as _, Peripheral as _,
    ScanFilter, Service, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::stream::StreamExt;
use tracing::{debug, info, trace};
use uuid::Uuid;

use crate::ble::advertising::Advertisement;
use crate::ble::guard::{spawn_cleanup, CleanupGuard};
use crate::ble::transport::{AdvertisementStream, BleCentral, GattConnection, NotificationStream};
use crate::ble::uuids::{CCCD_ENABLE_NOTIFY, CCCD_UUID};
use crate::error::{Error, Result};

/// How often `connect` re-checks the adapter for the target device.
const PERIPHERAL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// BLE central backed by the first system adapter.
#[derive(Clone)]
pub struct BtleplugCentral {
    adapter: Adapter,
}

impl BtleplugCentral {
    /// Open the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AdapterUnavailable`] if there is no adapter.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::AdapterUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::AdapterUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self { adapter })
    }

    /// Use a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }

    async fn find_peripheral(&self, address: BDAddr) -> Result<Option<Peripheral>> {
        for peripheral in self.adapter.peripherals().await? {
            if peripheral.address() == address {
                return Ok(Some(peripheral));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl BleCentral for BtleplugCentral {
    type Connection = BtleplugConnection;

    async fn start_scan(&self) -> Result<AdvertisementStream> {
        let events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let adapter = self.adapter.clone();
        let advertisements = events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move {
                let CentralEvent::ServiceDataAdvertisement { id, service_data } = event else {
                    return None;
                };

                let peripheral = match adapter.peripheral(&id).await {
                    Ok(p) => p,
                    Err(e) => {
                        trace!("Failed to get peripheral: {}", e);
                        return None;
                    }
                };

                let mut advertisement =
                    Advertisement::new(peripheral.address(), service_data.into_iter().collect());
                if let Ok(Some(properties)) = peripheral.properties().await {
                    advertisement.rssi = properties.rssi;
                    advertisement.local_name = properties.local_name;
                }

                Some(advertisement)
            }
        });

        let stream: AdvertisementStream = Box::pin(advertisements);
        Ok(stream)
    }

    async fn stop_scan(&self) -> Result<()> {
        self.adapter.stop_scan().await?;
        Ok(())
    }

    async fn connect(&self, address: BDAddr) -> Result<BtleplugConnection> {
        self.adapter.start_scan(ScanFilter::default()).await?;

        // Dropped by the caller's connect timeout while searching
        let scan_guard = CleanupGuard::new({
            let adapter = self.adapter.clone();
            move || {
                spawn_cleanup("stop connect scan", async move {
                    if let Err(e) = adapter.stop_scan().await {
                        debug!("Failed to stop scan cleanly: {}", e);
                    }
                })
            }
        });

        let peripheral = loop {
            if let Some(peripheral) = self.find_peripheral(address).await? {
                break peripheral;
            }
            tokio::time::sleep(PERIPHERAL_POLL_INTERVAL).await;
        };

        scan_guard.disarm();
        if let Err(e) = self.adapter.stop_scan().await {
            debug!("Failed to stop scan cleanly: {}", e);
        }

        // The host stack may still bring the link up after we give up on it
        let link_guard = CleanupGuard::new({
            let peripheral = peripheral.clone();
            move || {
                spawn_cleanup("disconnect abandoned link", async move {
                    if let Err(e) = peripheral.disconnect().await {
                        debug!("Failed to disconnect abandoned link {}: {}", address, e);
                    }
                })
            }
        });

        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }
        link_guard.disarm();

        Ok(BtleplugConnection { peripheral })
    }
}

/// An open connection to a `btleplug` peripheral.
pub struct BtleplugConnection {
    peripheral: Peripheral,
}

impl BtleplugConnection {
    /// Find the characteristic a descriptor belongs to.
    fn owning_characteristic(&self, descriptor: &Descriptor) -> Result<Characteristic> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| {
                c.uuid == descriptor.characteristic_uuid
                    && c.service_uuid == descriptor.service_uuid
            })
            .ok_or_else(|| Error::CharacteristicNotFound {
                uuid: descriptor.characteristic_uuid.to_string(),
            })
    }
}

#[async_trait]
impl GattConnection for BtleplugConnection {
    fn address(&self) -> BDAddr {
        self.peripheral.address()
    }

    async fn discover_services(&self, uuids: &[Uuid]) -> Result<Vec<Service>> {
        self.peripheral.discover_services().await?;

        Ok(self
            .peripheral
            .services()
            .into_iter()
            .filter(|s| uuids.contains(&s.uuid))
            .collect())
    }

    async fn discover_characteristics(
        &self,
        uuids: &[Uuid],
        service: &Service,
    ) -> Result<Vec<Characteristic>> {
        Ok(service
            .characteristics
            .iter()
            .filter(|c| uuids.contains(&c.uuid))
            .cloned()
            .collect())
    }

    async fn discover_descriptors(
        &self,
        uuids: &[Uuid],
        characteristic: &Characteristic,
    ) -> Result<Vec<Descriptor>> {
        Ok(characteristic
            .descriptors
            .iter()
            .filter(|d| uuids.contains(&d.uuid))
            .cloned()
            .collect())
    }

    async fn subscribe(&self, characteristic: &Characteristic) -> Result<NotificationStream> {
        let uuid = characteristic.uuid;
        let notifications = self.peripheral.notifications().await?;

        let frames = notifications.filter_map(move |notification| async move {
            (notification.uuid == uuid).then_some(notification.value)
        });

        let stream: NotificationStream = Box::pin(frames);
        Ok(stream)
    }

    async fn write_characteristic(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: WriteType,
    ) -> Result<()> {
        self.peripheral
            .write(characteristic, data, write_type)
            .await
            .map_err(Error::Bluetooth)?;

        trace!(
            "Wrote {} bytes to characteristic {}",
            data.len(),
            characteristic.uuid
        );

        Ok(())
    }

    async fn write_descriptor(&self, descriptor: &Descriptor, data: &[u8]) -> Result<()> {
        // The host stack owns the CCCD; enabling goes through its subscribe call
        if descriptor.uuid == CCCD_UUID && data == CCCD_ENABLE_NOTIFY.as_slice() {
            let characteristic = self.owning_characteristic(descriptor)?;
            self.peripheral.subscribe(&characteristic).await?;
            return Ok(());
        }

        self.peripheral.write_descriptor(descriptor, data).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if self.peripheral.is_connected().await? {
            self.peripheral.disconnect().await?;
        }
        Ok(())
    }
}
