//! # SMD Core Library
//!
//! Host-side driver stack for SMD Red motor driver boards.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The Red register layout and a typed register table per driver
//! - The binary frame codec (header, payload, CRC32/MPEG-2)
//! - Request building with the acknowledgment length it solicits
//! - A device registry keyed by bus address
//! - A bus master running request/acknowledgment transactions
//!
//! ## Example
//!
//! ```rust,ignore
//! use smd_core::prelude::*;
//!
//! let mut master = Master::open(MasterConfig::new("/dev/ttyUSB0", 115200))?;
//! for id in master.scan()? {
//!     println!("{}: {}", id, master.get_driver_info(id)?);
//! }
//!
//! master.set_operation_mode(0, OperationMode::Velocity)?;
//! master.enable_torque(0, true)?;
//! master.set_velocity(0, 120.0)?;
//! ```

pub mod device;
pub mod master;
pub mod protocol;
pub mod register;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::device::{DeviceRegistry, DriverInfo};
    pub use crate::master::{ControlLoop, ControlParameters, Master, MasterConfig, TransactionState};
    pub use crate::protocol::{Command, ProtocolError, SerialTransport, Transport};
    pub use crate::register::{Index, OperationMode, RegisterTable, RegisterValue, TuningMethod};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
