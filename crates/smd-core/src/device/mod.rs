//! Device Registry
//!
//! Tracks which drivers the master knows about and mirrors their registers.

mod info;
mod registry;

pub use info::{format_version, DriverInfo};
pub use registry::{Device, DeviceRegistry, SLOT_COUNT};
