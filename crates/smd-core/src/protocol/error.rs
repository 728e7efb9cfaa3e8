//! Protocol errors

use thiserror::Error;

use super::Command;
use crate::register::RegisterError;

/// Errors that can occur while talking to drivers on the bus
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Request rejected before anything was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Trailing CRC does not match the frame
    #[error("CRC mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// CRC computed over the received bytes
        expected: u32,
        /// CRC carried by the frame
        actual: u32,
    },

    /// Received length disagrees with the expected one
    #[error("Length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Bytes the request solicited
        expected: usize,
        /// Bytes received
        actual: usize,
    },

    /// No driver attached at this ID
    #[error("No driver attached at ID {0}")]
    UnknownDevice(u8),

    /// Well-formed frame that does not answer the request
    #[error("Invalid response from driver")]
    InvalidResponse,

    /// Frame would exceed 255 bytes
    #[error("Frame too large: {0} bytes does not fit the size byte")]
    FrameTooLarge(usize),

    /// Reserved command
    #[error("Command {0:?} is not implemented")]
    Unsupported(Command),

    /// Register-level failure
    #[error("Register error: {0}")]
    Register(#[from] RegisterError),

    /// Port could not be opened or configured
    #[error("Serial port error: {0}")]
    SerialError(String),

    /// Transport I/O failure
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ProtocolError {
    /// True for acknowledgment frames that failed the length or CRC check
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            ProtocolError::ChecksumMismatch { .. }
                | ProtocolError::LengthMismatch { .. }
                | ProtocolError::InvalidResponse
        )
    }
}
