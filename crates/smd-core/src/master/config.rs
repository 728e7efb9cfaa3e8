//! Master configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::protocol::serial::validate_baud_rate;
use crate::protocol::{ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS, SCAN_TIMEOUT_MS};

/// Bus master configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Acknowledgment read timeout in milliseconds
    pub timeout_ms: u64,
    /// Read timeout while scanning for drivers
    pub scan_timeout_ms: u64,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            scan_timeout_ms: SCAN_TIMEOUT_MS,
        }
    }
}

impl MasterConfig {
    /// Configuration for `port_name` at `baud_rate`, other fields defaulted
    pub fn new(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Acknowledgment read timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Read timeout used while scanning
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_millis(self.scan_timeout_ms)
    }

    /// Check the configuration before opening a port
    pub fn validate(&self) -> Result<(), ProtocolError> {
        validate_baud_rate(self.baud_rate)?;
        if self.timeout_ms == 0 || self.scan_timeout_ms == 0 {
            return Err(ProtocolError::Validation(
                "timeouts must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
