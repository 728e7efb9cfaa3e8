//! Cached driver identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hardware and software versions reported by a driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverInfo {
    /// Board revision, `major.minor.patch`
    pub hardware_version: String,
    /// Firmware version, `major.minor.patch`
    pub software_version: String,
}

impl DriverInfo {
    /// Format the raw version registers
    pub fn from_raw(hardware: u32, software: u32) -> Self {
        Self {
            hardware_version: format_version(hardware),
            software_version: format_version(software),
        }
    }
}

impl fmt::Display for DriverInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HW {} / SW {}", self.hardware_version, self.software_version)
    }
}

/// Format a packed version register as `major.minor.patch`.
/// Byte 3 is reserved and not shown.
pub fn format_version(raw: u32) -> String {
    let [patch, minor, major, _] = raw.to_le_bytes();
    format!("{}.{}.{}", major, minor, patch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_version() {
        assert_eq!(format_version(0x0001_0203), "1.2.3");
        assert_eq!(format_version(0xFF00_0A00), "0.10.0");
    }

    #[test]
    fn test_driver_info_display() {
        let info = DriverInfo::from_raw(0x0001_0000, 0x0000_0405);
        assert_eq!(info.to_string(), "HW 1.0.0 / SW 0.4.5");
    }
}
