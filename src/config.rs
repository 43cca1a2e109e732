//! Timeouts and protocol options for Bot operations.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::StatusLayout;

/// Configuration shared by the scanner and the command orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BotConfig {
    /// How long a discovery scan listens for advertisements.
    pub scan_duration: Duration,
    /// Upper bound on establishing a connection.
    pub connect_timeout: Duration,
    /// Overall deadline for a notified response, measured from connect.
    pub response_timeout: Duration,
    /// Wire layout used to decode status responses.
    pub status_layout: StatusLayout,
}

impl BotConfig {
    /// Default scan duration (2 seconds).
    pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(2);
    /// Default connect timeout (2 seconds).
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
    /// Default response timeout (20 seconds).
    pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(20);

    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan duration.
    pub fn with_scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the status response layout.
    pub fn with_status_layout(mut self, layout: StatusLayout) -> Self {
        self.status_layout = layout;
        self
    }

    /// Check that every duration is non-zero.
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("scan_duration", self.scan_duration),
            ("connect_timeout", self.connect_timeout),
            ("response_timeout", self.response_timeout),
        ];

        for (name, value) in durations {
            if value.is_zero() {
                return Err(Error::InvalidParameter {
                    name: name.to_string(),
                    value: format!("{:?}", value),
                });
            }
        }

        Ok(())
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            scan_duration: Self::DEFAULT_SCAN_DURATION,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            response_timeout: Self::DEFAULT_RESPONSE_TIMEOUT,
            status_layout: StatusLayout::default(),
        }
    }
}
