//! Device manager for discovering and controlling SwitchBot Bots.
//!
//! Wraps a [`CommandOrchestrator`] over the system Bluetooth adapter.

use std::sync::Arc;
use std::time::Duration;

use btleplug::api::BDAddr;
use tracing::info;

use crate::ble::advertising::DeviceHandle;
use crate::ble::btleplug_backend::BtleplugCentral;
use crate::ble::scanner::AdvertisementScanner;
use crate::ble::transport::BleCentral;
use crate::config::BotConfig;
use crate::error::{Error, Result};
use crate::orchestrator::CommandOrchestrator;
use crate::protocol::{BotAction, StatusRecord};

/// Central entry point for working with Bots.
pub struct BotManager<B: BleCentral = BtleplugCentral> {
    /// Central shared by scans and operations.
    central: Arc<B>,
    /// Sequences every connected operation.
    orchestrator: CommandOrchestrator<B>,
}

impl BotManager<BtleplugCentral> {
    /// Create a manager on the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        Self::with_config(BotConfig::default()).await
    }

    /// Create a manager with a custom configuration.
    pub async fn with_config(config: BotConfig) -> Result<Self> {
        let central = BtleplugCentral::new().await?;
        Self::with_central(Arc::new(central), config)
    }
}

impl<B: BleCentral + 'static> BotManager<B> {
    /// Create a manager over any central.
    pub fn with_central(central: Arc<B>, config: BotConfig) -> Result<Self> {
        let orchestrator = CommandOrchestrator::with_config(central.clone(), config)?;
        Ok(Self {
            central,
            orchestrator,
        })
    }

    /// Get the active configuration.
    pub fn config(&self) -> &BotConfig {
        self.orchestrator.config()
    }

    /// Scan for the configured duration.
    pub async fn scan(&self) -> Result<Vec<DeviceHandle>> {
        self.orchestrator.scan().await
    }

    /// Scan for a specific duration.
    pub async fn scan_for(&self, duration: Duration) -> Result<Vec<DeviceHandle>> {
        if duration.is_zero() {
            return Err(Error::InvalidParameter {
                name: "duration".to_string(),
                value: format!("{:?}", duration),
            });
        }

        AdvertisementScanner::new(self.central.clone()).scan(duration).await
    }

    /// Scan and return each Bot once, keeping its latest advertisement.
    pub async fn discover(&self) -> Result<Vec<DeviceHandle>> {
        let mut unique: Vec<DeviceHandle> = Vec::new();

        for handle in self.scan().await? {
            match unique.iter_mut().find(|h| **h == handle) {
                Some(existing) => *existing = handle,
                None => unique.push(handle),
            }
        }

        info!("Discovered {} unique Bot(s)", unique.len());
        Ok(unique)
    }

    /// Read the status of the Bot at `address`.
    pub async fn query_status(&self, address: BDAddr) -> Result<StatusRecord> {
        self.orchestrator.query_status(address).await
    }

    /// Press the Bot (press mode).
    pub async fn press(&self, address: BDAddr) -> Result<()> {
        self.orchestrator.perform(address, BotAction::Press).await
    }

    /// Switch the Bot on (switch mode).
    pub async fn turn_on(&self, address: BDAddr) -> Result<()> {
        self.orchestrator.perform(address, BotAction::TurnOn).await
    }

    /// Switch the Bot off (switch mode).
    pub async fn turn_off(&self, address: BDAddr) -> Result<()> {
        self.orchestrator.perform(address, BotAction::TurnOff).await
    }

    /// Send the action matching the advertised `mode` and `state` flags.
    pub async fn perform_action(&self, address: BDAddr, mode: bool, state: bool) -> Result<()> {
        self.orchestrator.perform_action(address, mode, state).await
    }

    /// Send the action matching a scanned handle's flags.
    pub async fn toggle(&self, device: &DeviceHandle) -> Result<()> {
        self.perform_action(device.address, device.mode, !device.state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::fake::{bot_advertisement, FakeCentral, FakeDevice};

    fn address() -> BDAddr {
        BDAddr::from([0xE5, 0, 0, 0, 0, 7])
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_deduplicates_by_address() {
        let other = BDAddr::from([0xE5, 0, 0, 0, 0, 8]);
        let central = Arc::new(FakeCentral::new().with_advertisements(vec![
            bot_advertisement(address(), 0x48, 0x00),
            bot_advertisement(other, 0x48, 0x00),
            bot_advertisement(address(), 0x48, 0x40),
        ]));
        let manager = BotManager::with_central(central, BotConfig::default()).unwrap();

        let devices = manager.discover().await.unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].address, address());
        assert!(devices[0].state);
    }

    #[tokio::test]
    async fn test_scan_for_rejects_zero_duration() {
        let manager =
            BotManager::with_central(Arc::new(FakeCentral::new()), BotConfig::default()).unwrap();

        let result = manager.scan_for(Duration::ZERO).await;
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }

    #[tokio::test]
    async fn test_toggle_switch_mode() {
        let central = Arc::new(FakeCentral::new().with_device(address(), FakeDevice::bot()));
        let manager = BotManager::with_central(central.clone(), BotConfig::default()).unwrap();

        let mut handle = DeviceHandle::new(address(), Default::default());
        handle.state = true;
        manager.toggle(&handle).await.unwrap();
        manager.press(address()).await.unwrap();

        let frames: Vec<Vec<u8>> = central
            .writes(address())
            .into_iter()
            .map(|(_, data, _)| data)
            .collect();
        assert_eq!(frames, vec![vec![0x57, 0x01, 0x02], vec![0x57, 0x01, 0x00]]);
    }
}
