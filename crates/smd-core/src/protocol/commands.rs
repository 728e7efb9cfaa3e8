//! Protocol commands
//!
//! Opcodes understood by the driver firmware.

use serde::{Deserialize, Serialize};

use super::ProtocolError;

/// Protocol commands for driver communication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// Presence check, answered with an empty acknowledgment
    Ping,

    /// Write registers without acknowledgment
    Write,

    /// Read registers
    Read,

    /// Write registers and acknowledge
    WriteAck,

    /// Write one register on several drivers in one frame
    SyncWrite,

    /// Reserved, not implemented by the host
    SyncRead,

    /// Reserved, not implemented by the host
    BulkWrite,

    /// Reserved, not implemented by the host
    BulkRead,

    /// Restart the driver firmware
    Reboot,

    /// Clear the persisted configuration
    HardReset,

    /// Persist the current configuration
    EepromWrite,

    /// Persist the current configuration and acknowledge
    EepromWriteAck,

    /// Jump to the bootloader
    EnterBootloader,

    /// Zero the encoder count
    ResetEncoder,

    /// Scan the driver's sensor sub-bus
    ScanSensors,
}

impl Command {
    /// All commands, in opcode order
    pub const ALL: [Command; 15] = [
        Command::Ping,
        Command::Write,
        Command::Read,
        Command::WriteAck,
        Command::SyncWrite,
        Command::SyncRead,
        Command::BulkWrite,
        Command::BulkRead,
        Command::Reboot,
        Command::HardReset,
        Command::EepromWrite,
        Command::EepromWriteAck,
        Command::EnterBootloader,
        Command::ResetEncoder,
        Command::ScanSensors,
    ];

    /// Opcode byte placed in the frame's command field
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Ping => 0x00,
            Command::Write => 0x01,
            Command::Read => 0x02,
            Command::WriteAck => 0x03,
            Command::SyncWrite => 0x04,
            Command::SyncRead => 0x05,
            Command::BulkWrite => 0x06,
            Command::BulkRead => 0x07,
            Command::Reboot => 0x10,
            Command::HardReset => 0x11,
            Command::EepromWrite => 0x12,
            Command::EepromWriteAck => 0x13,
            Command::EnterBootloader => 0x14,
            Command::ResetEncoder => 0x15,
            Command::ScanSensors => 0x16,
        }
    }

    /// Look up a command by opcode
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.opcode() == opcode)
    }

    /// Check if the driver answers this command
    pub fn expects_ack(&self) -> bool {
        matches!(
            self,
            Command::Ping
                | Command::Read
                | Command::WriteAck
                | Command::EepromWriteAck
                | Command::ResetEncoder
                | Command::ScanSensors
        )
    }

    /// Commands whose request carries no payload
    pub fn is_maintenance(&self) -> bool {
        matches!(
            self,
            Command::Ping
                | Command::Reboot
                | Command::HardReset
                | Command::EepromWrite
                | Command::EepromWriteAck
                | Command::EnterBootloader
                | Command::ResetEncoder
                | Command::ScanSensors
        )
    }

    /// Reserved opcodes the host cannot build yet
    pub fn is_reserved(&self) -> bool {
        matches!(
            self,
            Command::SyncRead | Command::BulkWrite | Command::BulkRead
        )
    }

    pub(crate) fn ensure_supported(self) -> Result<Self, ProtocolError> {
        if self.is_reserved() {
            return Err(ProtocolError::Unsupported(self));
        }
        Ok(self)
    }
}
