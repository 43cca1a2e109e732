//! In-memory BLE central used by unit tests.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{BDAddr, CharPropFlags, Characteristic, Descriptor, Service, WriteType};
use futures::channel::mpsc;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::ble::advertising::Advertisement;
use crate::ble::guard::CleanupGuard;
use crate::ble::transport::{AdvertisementStream, BleCentral, GattConnection, NotificationStream};
use crate::ble::uuids::*;
use crate::error::{Error, Result};
use crate::protocol::command::{COMMAND_MAGIC, QUERY_COMMAND};

/// Build a Bot advertisement with the given signature and flags byte.
pub(crate) fn bot_advertisement(address: BDAddr, signature: u8, flags: u8) -> Advertisement {
    Advertisement::new(
        address,
        vec![(PRODUCT_SERVICE_DATA_UUID, vec![signature, flags, 0x5A])],
    )
}

/// A bare communication characteristic.
pub(crate) fn characteristic(uuid: Uuid) -> Characteristic {
    Characteristic {
        uuid,
        service_uuid: COMMUNICATION_SERVICE_UUID,
        properties: CharPropFlags::empty(),
        descriptors: BTreeSet::new(),
    }
}

/// A descriptor under `characteristic_uuid`.
pub(crate) fn descriptor(characteristic_uuid: Uuid, uuid: Uuid) -> Descriptor {
    Descriptor {
        uuid,
        service_uuid: COMMUNICATION_SERVICE_UUID,
        characteristic_uuid,
    }
}

/// The complete communication service of a Bot.
pub(crate) fn communication_service() -> Service {
    let mut notify = characteristic(NOTIFY_CHARACTERISTIC_UUID);
    notify.properties = CharPropFlags::NOTIFY;
    notify
        .descriptors
        .insert(descriptor(NOTIFY_CHARACTERISTIC_UUID, CCCD_UUID));

    let mut write = characteristic(WRITE_CHARACTERISTIC_UUID);
    write.properties = CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE;

    Service {
        uuid: COMMUNICATION_SERVICE_UUID,
        primary: true,
        characteristics: [notify, write].into_iter().collect(),
    }
}

/// Scripted behaviour of one fake device.
#[derive(Debug, Clone)]
pub(crate) struct FakeDevice {
    services: Vec<Service>,
    response: Option<Vec<u8>>,
    discovery_delay: Option<Duration>,
    connect_delay: Option<Duration>,
    reject_writes: bool,
    reverse_discovery: bool,
}

impl FakeDevice {
    /// A Bot with the standard layout that never answers.
    pub(crate) fn bot() -> Self {
        Self {
            services: vec![communication_service()],
            response: None,
            discovery_delay: None,
            connect_delay: None,
            reject_writes: false,
            reverse_discovery: false,
        }
    }

    /// Notify `frame` after a status query is written.
    pub(crate) fn with_response(mut self, frame: Vec<u8>) -> Self {
        self.response = Some(frame);
        self
    }

    /// Only show up to a connect scan after `delay`.
    pub(crate) fn with_discovery_delay(mut self, delay: Duration) -> Self {
        self.discovery_delay = Some(delay);
        self
    }

    /// Take `delay` to bring up the link once found.
    pub(crate) fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub(crate) fn with_services(mut self, services: Vec<Service>) -> Self {
        self.services = services;
        self
    }

    pub(crate) fn rejecting_writes(mut self) -> Self {
        self.reject_writes = true;
        self
    }

    /// Report discovered characteristics in reverse UUID order.
    pub(crate) fn with_reversed_discovery(mut self) -> Self {
        self.reverse_discovery = true;
        self
    }
}

/// One GATT operation seen by a fake link.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LinkEvent {
    DescriptorWrite(Uuid, Vec<u8>),
    Subscribe(Uuid),
    Write(Uuid, Vec<u8>, WriteType),
}

/// What happened on one device's link.
#[derive(Debug, Default)]
pub(crate) struct FakeLink {
    disconnects: AtomicUsize,
    connect_scans_started: AtomicUsize,
    connect_scans_stopped: AtomicUsize,
    events: Mutex<Vec<LinkEvent>>,
}

impl FakeLink {
    fn record(&self, event: LinkEvent) {
        self.events.lock().push(event);
    }
}

/// In-memory central.
#[derive(Default)]
pub(crate) struct FakeCentral {
    advertisements: Vec<Advertisement>,
    advertisement_interval: Option<Duration>,
    devices: HashMap<BDAddr, FakeDevice>,
    links: HashMap<BDAddr, Arc<FakeLink>>,
    scan_stops: AtomicUsize,
}

impl FakeCentral {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_advertisements(mut self, advertisements: Vec<Advertisement>) -> Self {
        self.advertisements = advertisements;
        self
    }

    /// Delay each advertisement by `interval`.
    pub(crate) fn with_advertisement_interval(mut self, interval: Duration) -> Self {
        self.advertisement_interval = Some(interval);
        self
    }

    pub(crate) fn with_device(mut self, address: BDAddr, device: FakeDevice) -> Self {
        self.devices.insert(address, device);
        self.links.insert(address, Arc::new(FakeLink::default()));
        self
    }

    pub(crate) fn scan_stops(&self) -> usize {
        self.scan_stops.load(Ordering::SeqCst)
    }

    pub(crate) fn disconnects(&self, address: BDAddr) -> usize {
        self.links
            .get(&address)
            .map(|link| link.disconnects.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Scans started and stopped while connecting, as (started, stopped).
    pub(crate) fn connect_scans(&self, address: BDAddr) -> (usize, usize) {
        self.links
            .get(&address)
            .map(|link| {
                (
                    link.connect_scans_started.load(Ordering::SeqCst),
                    link.connect_scans_stopped.load(Ordering::SeqCst),
                )
            })
            .unwrap_or((0, 0))
    }

    /// Every GATT operation on the link, in order.
    pub(crate) fn events(&self, address: BDAddr) -> Vec<LinkEvent> {
        self.links
            .get(&address)
            .map(|link| link.events.lock().clone())
            .unwrap_or_default()
    }

    pub(crate) fn subscriptions(&self, address: BDAddr) -> usize {
        self.events(address)
            .iter()
            .filter(|e| matches!(e, LinkEvent::Subscribe(_)))
            .count()
    }

    /// Characteristic writes as (uuid, data, write type).
    pub(crate) fn writes(&self, address: BDAddr) -> Vec<(Uuid, Vec<u8>, WriteType)> {
        self.events(address)
            .into_iter()
            .filter_map(|e| match e {
                LinkEvent::Write(uuid, data, write_type) => Some((uuid, data, write_type)),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn descriptor_writes(&self, address: BDAddr) -> Vec<(Uuid, Vec<u8>)> {
        self.events(address)
            .into_iter()
            .filter_map(|e| match e {
                LinkEvent::DescriptorWrite(uuid, data) => Some((uuid, data)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl BleCentral for FakeCentral {
    type Connection = FakeConnection;

    async fn start_scan(&self) -> Result<AdvertisementStream> {
        let advertisements = stream::iter(self.advertisements.clone());

        let stream: AdvertisementStream = match self.advertisement_interval {
            Some(interval) => Box::pin(advertisements.then(move |adv| async move {
                tokio::time::sleep(interval).await;
                adv
            })),
            None => Box::pin(advertisements),
        };
        Ok(stream)
    }

    async fn stop_scan(&self) -> Result<()> {
        self.scan_stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn connect(&self, address: BDAddr) -> Result<FakeConnection> {
        let (device, link) = match (self.devices.get(&address), self.links.get(&address)) {
            (Some(device), Some(link)) => (device.clone(), link.clone()),
            _ => return Err(Error::Internal(format!("{} is not advertising", address))),
        };

        link.connect_scans_started.fetch_add(1, Ordering::SeqCst);
        let scan_guard = CleanupGuard::new({
            let link = link.clone();
            move || {
                link.connect_scans_stopped.fetch_add(1, Ordering::SeqCst);
            }
        });
        if let Some(delay) = device.discovery_delay {
            tokio::time::sleep(delay).await;
        }
        scan_guard.disarm();
        link.connect_scans_stopped.fetch_add(1, Ordering::SeqCst);

        let link_guard = CleanupGuard::new({
            let link = link.clone();
            move || {
                link.disconnects.fetch_add(1, Ordering::SeqCst);
            }
        });
        if let Some(delay) = device.connect_delay {
            tokio::time::sleep(delay).await;
        }
        link_guard.disarm();

        Ok(FakeConnection {
            address,
            device,
            link,
            notify_tx: Mutex::new(None),
        })
    }
}

/// Connection to a [`FakeDevice`].
pub(crate) struct FakeConnection {
    address: BDAddr,
    device: FakeDevice,
    link: Arc<FakeLink>,
    notify_tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
}

#[async_trait]
impl GattConnection for FakeConnection {
    fn address(&self) -> BDAddr {
        self.address
    }

    async fn discover_services(&self, uuids: &[Uuid]) -> Result<Vec<Service>> {
        Ok(self
            .device
            .services
            .iter()
            .filter(|s| uuids.contains(&s.uuid))
            .cloned()
            .collect())
    }

    async fn discover_characteristics(
        &self,
        uuids: &[Uuid],
        service: &Service,
    ) -> Result<Vec<Characteristic>> {
        let mut found: Vec<Characteristic> = service
            .characteristics
            .iter()
            .filter(|c| uuids.contains(&c.uuid))
            .cloned()
            .collect();
        if self.device.reverse_discovery {
            found.reverse();
        }
        Ok(found)
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
        let (tx, rx) = mpsc::unbounded();
        *self.notify_tx.lock() = Some(tx);
        self.link.record(LinkEvent::Subscribe(characteristic.uuid));
        Ok(Box::pin(rx))
    }

    async fn write_characteristic(
        &self,
        characteristic: &Characteristic,
        data: &[u8],
        write_type: WriteType,
    ) -> Result<()> {
        if self.device.reject_writes {
            return Err(Error::Internal("write rejected".to_string()));
        }

        self.link.record(LinkEvent::Write(
            characteristic.uuid,
            data.to_vec(),
            write_type,
        ));

        if data == [COMMAND_MAGIC, QUERY_COMMAND] {
            if let (Some(frame), Some(tx)) = (&self.device.response, &*self.notify_tx.lock()) {
                let _ = tx.unbounded_send(frame.clone());
            }
        }

        Ok(())
    }

    async fn write_descriptor(&self, descriptor: &Descriptor, data: &[u8]) -> Result<()> {
        self.link
            .record(LinkEvent::DescriptorWrite(descriptor.uuid, data.to_vec()));
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.link.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
