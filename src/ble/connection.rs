//! Connection sessions.
//!
//! A [`Session`] binds one device connection to one operation. It is opened
//! per operation, never reused, and always disconnected on the way out.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use btleplug::api::BDAddr;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::ble::guard::spawn_cleanup;
use crate::ble::transport::{BleCentral, GattConnection};
use crate::error::{Error, Result};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No connection.
    #[default]
    Disconnected,
    /// Connection being established.
    Connecting,
    /// Link established.
    Connected,
    /// Communication characteristics resolved.
    Resolved,
    /// Notifications enabled on the notify characteristic.
    NotifyEnabled,
    /// Command written, waiting for the response.
    Awaiting,
    /// Operation finished successfully.
    Completed,
    /// No response before the deadline.
    TimedOut,
    /// Operation failed.
    Failed,
}

impl SessionState {
    /// Check if the session holds a live connection.
    pub fn is_connected(&self) -> bool {
        !matches!(self, Self::Disconnected | Self::Connecting)
    }

    /// Check if the operation has reached an outcome.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Resolved => write!(f, "Resolved"),
            Self::NotifyEnabled => write!(f, "NotifyEnabled"),
            Self::Awaiting => write!(f, "Awaiting"),
            Self::Completed => write!(f, "Completed"),
            Self::TimedOut => write!(f, "TimedOut"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// Addresses that currently have an open session.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    active: Arc<Mutex<HashSet<BDAddr>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if `address` has an open session.
    pub fn is_active(&self, address: &BDAddr) -> bool {
        self.active.lock().contains(address)
    }

    fn acquire(&self, address: BDAddr) -> Result<SessionLease> {
        if !self.active.lock().insert(address) {
            return Err(Error::SessionBusy {
                address: address.to_string(),
            });
        }

        Ok(SessionLease {
            address,
            active: self.active.clone(),
        })
    }
}

/// Marks an address busy until dropped.
struct SessionLease {
    address: BDAddr,
    active: Arc<Mutex<HashSet<BDAddr>>>,
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.active.lock().remove(&self.address);
    }
}

/// One connection owned by one operation.
pub struct Session<C: GattConnection + 'static> {
    /// The open connection.
    connection: Arc<C>,
    /// Address of the device.
    address: BDAddr,
    /// Current lifecycle state.
    state: RwLock<SessionState>,
    /// Whether the connection has been released.
    released: AtomicBool,
    /// Keeps the address marked busy while the session lives.
    _lease: SessionLease,
}

impl<C: GattConnection + 'static> Session<C> {
    /// Connect to `address`, bounded by `timeout`.
    pub async fn open<B>(
        central: &B,
        registry: &SessionRegistry,
        address: BDAddr,
        timeout: Duration,
    ) -> Result<Self>
    where
        B: BleCentral<Connection = C>,
    {
        let lease = registry.acquire(address)?;

        debug!("Session {} state changed: Disconnected -> Connecting", address);
        info!("Connecting to Bot {}", address);

        let connection = match tokio::time::timeout(timeout, central.connect(address)).await {
            Ok(Ok(connection)) => connection,
            Ok(Err(e)) => {
                warn!("Connection to {} failed: {}", address, e);
                return Err(Error::ConnectFailed {
                    address: address.to_string(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!("Connection to {} timed out after {:?}", address, timeout);
                return Err(Error::ConnectTimeout {
                    address: address.to_string(),
                    timeout,
                });
            }
        };

        let session = Self {
            connection: Arc::new(connection),
            address,
            state: RwLock::new(SessionState::Connecting),
            released: AtomicBool::new(false),
            _lease: lease,
        };
        session.set_state(SessionState::Connected);
        info!("Connected to Bot {}", address);

        Ok(session)
    }

    /// Address of the connected device.
    pub fn address(&self) -> BDAddr {
        self.address
    }

    /// The underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Get the current state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Update the state, logging the transition.
    pub fn set_state(&self, new_state: SessionState) {
        let old_state = {
            let mut state = self.state.write();
            let old = *state;
            *state = new_state;
            old
        };

        if old_state != new_state {
            debug!(
                "Session {} state changed: {} -> {}",
                self.address, old_state, new_state
            );
        }
    }

    /// Disconnect and consume the session.
    ///
    /// The connection is torn down exactly once; a failed disconnect is
    /// logged, not returned, so it never masks the operation outcome.
    pub async fn release(self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        match self.connection.disconnect().await {
            Ok(()) => info!("Disconnected from Bot {}", self.address),
            Err(e) => warn!("Failed to disconnect from {}: {}", self.address, e),
        }

        self.set_state(SessionState::Disconnected);
    }
}

impl<C: GattConnection + 'static> Drop for Session<C> {
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }

        // Dropped mid-operation, e.g. the caller cancelled the future
        warn!("Session {} dropped while connected, disconnecting", self.address);
        let connection = self.connection.clone();
        let address = self.address;
        spawn_cleanup("disconnect dropped session", async move {
            if let Err(e) = connection.disconnect().await {
                warn!("Failed to disconnect from {}: {}", address, e);
            }
        });
    }
}
