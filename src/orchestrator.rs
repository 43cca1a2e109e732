//! Operation sequencing.
//!
//! A [`CommandOrchestrator`] drives one operation end to end: connect,
//! resolve, (enable notifications), write, (await the response), disconnect.

use std::sync::Arc;

use btleplug::api::{BDAddr, WriteType};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::ble::advertising::DeviceHandle;
use crate::ble::connection::{Session, SessionRegistry, SessionState};
use crate::ble::notification::NotificationChannel;
use crate::ble::resolver::ServiceResolver;
use crate::ble::scanner::AdvertisementScanner;
use crate::ble::transport::{BleCentral, GattConnection};
use crate::config::BotConfig;
use crate::error::{Error, Result};
use crate::protocol::{
    decode_status_with_layout, encode_query, BotAction, CommandFrame, StatusRecord,
};

/// Runs status queries and action commands against Bots.
///
/// Every operation opens its own connection and releases it before
/// returning, whatever the outcome.
pub struct CommandOrchestrator<B: BleCentral> {
    /// The central all operations go through.
    central: Arc<B>,
    /// Timeouts and decoding options.
    config: BotConfig,
    /// Addresses with an operation in flight.
    registry: SessionRegistry,
}

impl<B: BleCentral + 'static> CommandOrchestrator<B> {
    /// Create an orchestrator with the default configuration.
    pub fn new(central: Arc<B>) -> Self {
        Self {
            central,
            config: BotConfig::default(),
            registry: SessionRegistry::new(),
        }
    }

    /// Create an orchestrator with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the configuration is invalid.
    pub fn with_config(central: Arc<B>, config: BotConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            central,
            config,
            registry: SessionRegistry::new(),
        })
    }

    /// Get the active configuration.
    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Get the session registry.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Scan for the configured duration.
    pub async fn scan(&self) -> Result<Vec<DeviceHandle>> {
        AdvertisementScanner::new(self.central.clone())
            .scan(self.config.scan_duration)
            .await
    }

    /// Read the status of the Bot at `address`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResponseTimeout`] if no response arrives within the
    /// response timeout, [`Error::ResponseStatus`] if the Bot reports a
    /// failure, or the error of whichever step failed.
    pub async fn query_status(&self, address: BDAddr) -> Result<StatusRecord> {
        let deadline = Instant::now() + self.config.response_timeout;

        let session = Session::open(
            self.central.as_ref(),
            &self.registry,
            address,
            self.config.connect_timeout,
        )
        .await?;

        let outcome = match self.run_query(&session, deadline).await {
            Err(Error::ResponseTimeout { .. }) => Err(Error::ResponseTimeout {
                timeout: self.config.response_timeout,
            }),
            other => other,
        };

        match &outcome {
            Ok(record) => {
                session.set_state(SessionState::Completed);
                info!(
                    "Bot {} status: battery {}%, firmware {:.1}",
                    address, record.battery_percent, record.firmware_version
                );
            }
            Err(Error::ResponseTimeout { timeout }) => {
                session.set_state(SessionState::TimedOut);
                warn!("Bot {} did not respond within {:?}", address, timeout);
            }
            Err(Error::ResponseStatus { code }) => {
                session.set_state(SessionState::Failed);
                warn!("Bot {} response status error: {:#04x}", address, code);
            }
            Err(e) => {
                session.set_state(SessionState::Failed);
                warn!("Status query to {} failed: {}", address, e);
            }
        }

        session.release().await;
        outcome
    }

    /// Send the action selected by the advertised `mode` and `state` flags.
    pub async fn perform_action(&self, address: BDAddr, mode: bool, state: bool) -> Result<()> {
        self.perform(address, BotAction::from_flags(mode, state)).await
    }

    /// Send `action` to the Bot at `address`.
    ///
    /// Completes once the write is acknowledged; no response is awaited.
    pub async fn perform(&self, address: BDAddr, action: BotAction) -> Result<()> {
        let session = Session::open(
            self.central.as_ref(),
            &self.registry,
            address,
            self.config.connect_timeout,
        )
        .await?;

        let outcome = Self::run_action(&session, action).await;

        match &outcome {
            Ok(()) => {
                session.set_state(SessionState::Completed);
                info!("Sent {} to Bot {}", action, address);
            }
            Err(e) => {
                session.set_state(SessionState::Failed);
                warn!("Action {} to {} failed: {}", action, address, e);
            }
        }

        session.release().await;
        outcome
    }

    async fn run_query(
        &self,
        session: &Session<B::Connection>,
        deadline: Instant,
    ) -> Result<StatusRecord> {
        let connection = session.connection();

        let characteristics = ServiceResolver::resolve(connection).await?;
        session.set_state(SessionState::Resolved);

        NotificationChannel::enable(connection, &characteristics.notify).await?;
        session.set_state(SessionState::NotifyEnabled);

        // Subscribe before writing so the response cannot slip past
        let pending = NotificationChannel::await_once(connection, &characteristics.notify).await?;

        Self::write_frame(connection, &characteristics.write, &encode_query()).await?;
        session.set_state(SessionState::Awaiting);

        let frame = pending.wait_until(deadline).await?;
        trace!(
            "Status frame from {}: {} bytes, data: {:02X?}",
            session.address(),
            frame.len(),
            frame
        );

        decode_status_with_layout(&frame, self.config.status_layout)
    }

    async fn run_action(session: &Session<B::Connection>, action: BotAction) -> Result<()> {
        let connection = session.connection();

        let characteristics = ServiceResolver::resolve(connection).await?;
        session.set_state(SessionState::Resolved);

        Self::write_frame(connection, &characteristics.write, &CommandFrame::action(action)).await
    }

    async fn write_frame(
        connection: &B::Connection,
        write: &btleplug::api::Characteristic,
        frame: &CommandFrame,
    ) -> Result<()> {
        connection
            .write_characteristic(write, frame.as_bytes(), WriteType::WithResponse)
            .await
            .map_err(|e| Error::WriteFailed {
                uuid: write.uuid.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Wrote {:02X?} to {}", frame.as_bytes(), write.uuid);
        Ok(())
    }
}
