//! Error types for the switchbot-bot-ble crate.

use std::time::Duration;

use thiserror::Error;

/// The step of an operation an error originated from.
///
/// Lets callers tell radio problems (scan, connect) apart from GATT layout
/// problems (discovery, notify) and device-side problems (write, response).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStep {
    /// Adapter setup or advertisement scanning.
    Scan,
    /// Establishing the link-layer connection.
    Connect,
    /// Service, characteristic or descriptor discovery.
    Discovery,
    /// Enabling or subscribing to notifications.
    Notify,
    /// Writing a command frame.
    Write,
    /// Waiting for or decoding the notified response.
    Response,
}

impl std::fmt::Display for OperationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Scan => write!(f, "scan"),
            Self::Connect => write!(f, "connect"),
            Self::Discovery => write!(f, "discovery"),
            Self::Notify => write!(f, "notify"),
            Self::Write => write!(f, "write"),
            Self::Response => write!(f, "response"),
        }
    }
}

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// No usable Bluetooth adapter on this system.
    #[error("Bluetooth adapter not available or disabled")]
    AdapterUnavailable,

    /// Failed to establish a connection to the device.
    #[error("Connection to {address} failed: {reason}")]
    ConnectFailed {
        /// Address of the device.
        address: String,
        /// Description of why the connection failed.
        reason: String,
    },

    /// The device did not accept a connection before the connect timeout.
    #[error("Connection to {address} timed out after {timeout:?}")]
    ConnectTimeout {
        /// Address of the device.
        address: String,
        /// The connect timeout that elapsed.
        timeout: Duration,
    },

    /// Service not found on the device.
    #[error("Service not found: {uuid}")]
    ServiceNotFound {
        /// The UUID of the service that was not found.
        uuid: String,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// Descriptor not found under a characteristic.
    #[error("Descriptor not found: {uuid}")]
    DescriptorNotFound {
        /// The UUID of the descriptor that was not found.
        uuid: String,
    },

    /// The platform failed while running a discovery request.
    #[error("Discovery of {uuid} failed: {reason}")]
    DiscoveryFailed {
        /// The UUID being discovered.
        uuid: String,
        /// Description of the platform failure.
        reason: String,
    },

    /// Enabling notifications failed.
    #[error("Enabling notifications on {uuid} failed: {reason}")]
    NotifyFailed {
        /// The characteristic UUID.
        uuid: String,
        /// Description of the failure.
        reason: String,
    },

    /// Writing a command frame failed.
    #[error("Write to {uuid} failed: {reason}")]
    WriteFailed {
        /// The characteristic UUID.
        uuid: String,
        /// Description of the failure.
        reason: String,
    },

    /// No notification arrived before the operation deadline.
    #[error("No response within {timeout:?}")]
    ResponseTimeout {
        /// The response timeout that elapsed.
        timeout: Duration,
    },

    /// The device answered with a non-success status byte.
    #[error("Device reported status {code:#04x}")]
    ResponseStatus {
        /// The status byte received.
        code: u8,
    },

    /// A frame was too short or otherwise unreadable.
    #[error("Malformed frame: {context}")]
    MalformedFrame {
        /// Description of what was wrong with the frame.
        context: String,
    },

    /// The notification stream ended before a response arrived.
    #[error("Connection lost")]
    ConnectionLost,

    /// Another session is already open for this device.
    #[error("Device {address} already has an active session")]
    SessionBusy {
        /// Address of the device.
        address: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The operation step this error belongs to, if any.
    pub fn step(&self) -> Option<OperationStep> {
        match self {
            Self::AdapterUnavailable => Some(OperationStep::Scan),
            Self::ConnectFailed { .. } | Self::ConnectTimeout { .. } | Self::SessionBusy { .. } => {
                Some(OperationStep::Connect)
            }
            Self::ServiceNotFound { .. }
            | Self::CharacteristicNotFound { .. }
            | Self::DescriptorNotFound { .. }
            | Self::DiscoveryFailed { .. } => Some(OperationStep::Discovery),
            Self::NotifyFailed { .. } => Some(OperationStep::Notify),
            Self::WriteFailed { .. } => Some(OperationStep::Write),
            Self::ResponseTimeout { .. }
            | Self::ResponseStatus { .. }
            | Self::MalformedFrame { .. }
            | Self::ConnectionLost => Some(OperationStep::Response),
            Self::Bluetooth(_) | Self::InvalidParameter { .. } | Self::Internal(_) => None,
        }
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
