//! Serial Protocol Communication
//!
//! Implements the SMD binary frame protocol: a six-byte header, a
//! command-specific payload and a trailing CRC32/MPEG-2.

pub mod command_builder;
pub mod commands;
mod error;
pub mod packet;
pub mod serial;
pub mod transport;

pub use command_builder::{AckLength, CommandBuilder, Request};
pub use commands::Command;
pub use error::ProtocolError;
pub use packet::{Frame, FrameHeader, PacketBuilder};
pub use serial::{configure_port, open_port, validate_baud_rate};
pub use transport::{SerialTransport, Transport};

/// Frame marker, register 0 of every table
pub const HEADER: u8 = 0x55;

/// Product/family identifier of the Red driver
pub const PRODUCT_TYPE: u8 = 0xBA;

/// Broadcast / unassigned device ID
pub const BROADCAST_ID: u8 = 0xFF;

/// Highest addressable device ID
pub const MAX_DEVICE_ID: u8 = 254;

/// Marker through status
pub const HEADER_SIZE: usize = 6;

/// Trailing CRC32
pub const CRC_SIZE: usize = 4;

/// Header plus CRC, the size of a frame with no payload
pub const ENVELOPE_SIZE: usize = HEADER_SIZE + CRC_SIZE;

/// The size byte caps frames at 255 bytes
pub const MAX_FRAME_SIZE: usize = u8::MAX as usize;

/// Default baud rate for driver communication
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Lowest baud rate the drivers accept
pub const MIN_BAUD_RATE: u32 = 3_053;

/// Highest baud rate the drivers accept
pub const MAX_BAUD_RATE: u32 = 12_500_000;

/// Default read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

/// Read timeout used while scanning the bus, most IDs never answer
pub const SCAN_TIMEOUT_MS: u64 = 15;

/// Time a driver needs to scan its sensor sub-bus
pub const SENSOR_SCAN_DELAY_MS: u64 = 1500;
