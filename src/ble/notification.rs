//! Notification handling.
//!
//! Enables notifications on the Bot's notify characteristic and exposes a
//! single-shot signal carrying the first notified frame.

use btleplug::api::Characteristic;
use futures::stream::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::ble::resolver::ServiceResolver;
use crate::ble::transport::GattConnection;
use crate::ble::uuids::CCCD_ENABLE_NOTIFY;
use crate::error::{Error, Result};

/// Enables and listens for notifications on a connection.
pub struct NotificationChannel;

impl NotificationChannel {
    /// Write the enable value to the notify characteristic's CCCD.
    ///
    /// Must complete before any write that expects a notified response.
    pub async fn enable<C>(connection: &C, notify: &Characteristic) -> Result<()>
    where
        C: GattConnection + ?Sized,
    {
        let descriptor = ServiceResolver::resolve_notify_descriptor(connection, notify).await?;

        connection
            .write_descriptor(&descriptor, &CCCD_ENABLE_NOTIFY)
            .await
            .map_err(|e| Error::NotifyFailed {
                uuid: notify.uuid.to_string(),
                reason: e.to_string(),
            })?;

        debug!("Notifications enabled on {}", notify.uuid);
        Ok(())
    }

    /// Subscribe to `notify` and resolve on the first frame only.
    pub async fn await_once<C>(connection: &C, notify: &Characteristic) -> Result<PendingResponse>
    where
        C: GattConnection + ?Sized,
    {
        let mut notifications =
            connection
                .subscribe(notify)
                .await
                .map_err(|e| Error::NotifyFailed {
                    uuid: notify.uuid.to_string(),
                    reason: e.to_string(),
                })?;

        let (frame_tx, frame_rx) = oneshot::channel();
        let uuid = notify.uuid;

        let listener = tokio::spawn(async move {
            if let Some(frame) = notifications.next().await {
                trace!(
                    "Notification received from {}: {} bytes, data: {:02X?}",
                    uuid,
                    frame.len(),
                    frame
                );
                let _ = frame_tx.send(frame);
            } else {
                debug!("Notification stream for {} ended without a frame", uuid);
            }
        });

        Ok(PendingResponse { frame_rx, listener })
    }
}

/// A subscription waiting for its single response frame.
///
/// Dropping it stops listening.
pub struct PendingResponse {
    frame_rx: oneshot::Receiver<Vec<u8>>,
    listener: JoinHandle<()>,
}

impl PendingResponse {
    /// Wait for the frame until `deadline`.
    ///
    /// Exactly one outcome is produced: the frame, [`Error::ResponseTimeout`]
    /// once the deadline passes, or [`Error::ConnectionLost`] if the stream
    /// ends first. The deadline timer is dropped as soon as a frame arrives.
    pub async fn wait_until(mut self, deadline: Instant) -> Result<Vec<u8>> {
        let started = Instant::now();

        match tokio::time::timeout_at(deadline, &mut self.frame_rx).await {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(_)) => Err(Error::ConnectionLost),
            Err(_) => Err(Error::ResponseTimeout {
                timeout: deadline.saturating_duration_since(started),
            }),
        }
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
