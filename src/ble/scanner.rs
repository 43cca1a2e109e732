//! BLE scanning functionality.
//!
//! Provides the time-bounded scanner for discovering Bots.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::StreamExt;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

use crate::ble::advertising::{AdvertisementFilter, DeviceHandle};
use crate::ble::guard::{spawn_cleanup, CleanupGuard};
use crate::ble::transport::BleCentral;
use crate::error::{Error, Result};

/// Time-bounded scanner collecting Bot advertisements.
pub struct AdvertisementScanner<B: BleCentral> {
    /// The central used for scanning.
    central: Arc<B>,
    /// Admission filter applied to every packet.
    filter: AdvertisementFilter,
}

impl<B: BleCentral + 'static> AdvertisementScanner<B> {
    /// Create a scanner over a central.
    pub fn new(central: Arc<B>) -> Self {
        Self {
            central,
            filter: AdvertisementFilter::new(),
        }
    }

    /// Scan for `duration` and return every matching advertisement.
    ///
    /// Results are in arrival order. A device advertising repeatedly shows up
    /// once per packet. Returns an empty list when nothing matched.
    pub async fn scan(&self, duration: Duration) -> Result<Vec<DeviceHandle>> {
        info!("Starting BLE scan for Bots ({:?})", duration);

        let mut advertisements = self.central.start_scan().await?;

        // Stops the radio scan if the caller drops this future mid-scan
        let scan_guard = CleanupGuard::new({
            let central = self.central.clone();
            move || {
                spawn_cleanup("stop abandoned scan", async move {
                    if let Err(e) = central.stop_scan().await {
                        warn!("Failed to stop abandoned scan: {}", e);
                    }
                })
            }
        });

        let found: Arc<Mutex<Vec<DeviceHandle>>> = Arc::new(Mutex::new(Vec::new()));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let filter = self.filter;
        let sink = found.clone();
        let listener = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    next = advertisements.next() => {
                        let Some(advertisement) = next else {
                            debug!("Advertisement stream ended");
                            break;
                        };
                        if let Some(handle) = filter.classify(&advertisement) {
                            let mut devices = sink.lock();
                            devices.push(handle);
                            trace!(
                                "Bot #{} advertised: {}",
                                devices.len(),
                                advertisement.address
                            );
                        }
                    }
                }
            }

            debug!("Scan listener ended");
        });

        tokio::time::sleep(duration).await;

        // The listener must be fully stopped before the results are read
        let _ = stop_tx.send(());
        let joined = listener.await;

        scan_guard.disarm();
        info!("Stopping BLE scan");
        self.central.stop_scan().await?;

        joined.map_err(|e| Error::Internal(format!("Scan listener failed: {}", e)))?;

        let devices = std::mem::take(&mut *found.lock());
        info!("Scan found {} Bot advertisement(s)", devices.len());

        Ok(devices)
    }
}
