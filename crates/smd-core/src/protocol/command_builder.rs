//! Command Builder
//!
//! Assembles request frames per command kind. Each request is returned
//! together with the acknowledgment length it solicits, so the reader never
//! works from a stale prediction.
//!
//! Payload shapes:
//! - WRITE / WRITE_ACK : (index:1, value:sized)*
//! - READ              : index:1*
//! - SYNC_WRITE        : index:1, (device id:1, value:sized)*
//! - maintenance       : empty

use super::packet::PacketBuilder;
use super::{Command, ProtocolError, BROADCAST_ID, ENVELOPE_SIZE, MAX_DEVICE_ID, MAX_FRAME_SIZE};
use crate::register::{Index, RegisterError, RegisterTable, RegisterValue};

/// How many bytes the driver answers with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckLength {
    /// Fire-and-forget, nothing is read back
    None,
    /// Exactly this many bytes
    Exact(usize),
    /// A self-describing frame of at most this many bytes
    UpTo(usize),
}

impl AckLength {
    /// Number of bytes to request from the transport
    pub fn read_len(&self) -> Option<usize> {
        match self {
            AckLength::None => None,
            AckLength::Exact(n) | AckLength::UpTo(n) => Some(*n),
        }
    }
}

/// A fully built request frame and its acknowledgment contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command carried by the frame
    pub command: Command,
    /// Addressed device
    pub device_id: u8,
    /// Encoded frame, CRC included
    pub bytes: Vec<u8>,
    /// Expected acknowledgment
    pub ack: AckLength,
    /// Registers referenced by the request, in request order
    pub indices: Vec<Index>,
}

/// Build request frames against a driver's register table
pub struct CommandBuilder;

impl CommandBuilder {
    /// Build a WRITE (or WRITE_ACK) frame
    ///
    /// Values are stored into `table` first; the frame is then built from the
    /// table so the mirror and the wire agree.
    pub fn write(
        table: &mut RegisterTable,
        pairs: &[(Index, RegisterValue)],
        ack: bool,
    ) -> Result<Request, ProtocolError> {
        if pairs.is_empty() {
            return Err(ProtocolError::Validation(
                "index/value list is empty".to_string(),
            ));
        }

        // Stage on a copy; the mirror only changes once the frame is built
        let mut staged = table.clone();
        for (index, value) in pairs {
            if index.is_header() {
                return Err(ProtocolError::Validation(format!(
                    "{} is a frame header register",
                    index.name()
                )));
            }
            staged.set(*index, *value)?;
        }

        let command = if ack { Command::WriteAck } else { Command::Write };
        let mut builder = PacketBuilder::new(&staged, command);
        for (index, _) in pairs {
            builder = builder.register(*index, &staged.get(*index));
        }
        let bytes = builder.build()?;
        *table = staged;

        Ok(Request {
            command,
            device_id: table.device_id(),
            bytes,
            ack: if ack {
                AckLength::Exact(ENVELOPE_SIZE)
            } else {
                AckLength::None
            },
            indices: pairs.iter().map(|(index, _)| *index).collect(),
        })
    }

    /// Build a READ frame
    pub fn read(table: &RegisterTable, indices: &[Index]) -> Result<Request, ProtocolError> {
        if indices.is_empty() {
            return Err(ProtocolError::Validation("index list is empty".to_string()));
        }

        let ack_len = ENVELOPE_SIZE
            + indices
                .iter()
                .map(|index| 1 + index.byte_width())
                .sum::<usize>();
        if ack_len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge(ack_len));
        }

        let mut builder = PacketBuilder::new(table, Command::Read);
        for index in indices {
            builder = builder.byte(index.ordinal());
        }

        Ok(Request {
            command: Command::Read,
            device_id: table.device_id(),
            bytes: builder.build()?,
            ack: AckLength::Exact(ack_len),
            indices: indices.to_vec(),
        })
    }

    /// Build a SYNC_WRITE frame setting `index` on every listed device
    ///
    /// Built against a scratch table addressed to the broadcast ID.
    pub fn sync_write(index: Index, targets: &[(u8, RegisterValue)]) -> Result<Request, ProtocolError> {
        if targets.is_empty() {
            return Err(ProtocolError::Validation(
                "device id/value list is empty".to_string(),
            ));
        }
        if index.is_fixed() {
            return Err(RegisterError::ReadOnly(index).into());
        }
        if index.is_header() {
            return Err(ProtocolError::Validation(format!(
                "{} is a frame header register",
                index.name()
            )));
        }

        let scratch = RegisterTable::broadcast();
        let mut builder = PacketBuilder::new(&scratch, Command::SyncWrite).byte(index.ordinal());
        for (device_id, value) in targets {
            validate_device_id(*device_id)?;
            if value.encoding() != index.encoding() {
                return Err(RegisterError::TypeMismatch {
                    index,
                    expected: index.encoding(),
                    actual: value.encoding(),
                }
                .into());
            }
            builder = builder.byte(*device_id).value(value);
        }

        Ok(Request {
            command: Command::SyncWrite,
            device_id: BROADCAST_ID,
            bytes: builder.build()?,
            ack: AckLength::None,
            indices: vec![index],
        })
    }

    /// Build a payload-less maintenance frame
    pub fn maintenance(table: &RegisterTable, command: Command) -> Result<Request, ProtocolError> {
        let command = command.ensure_supported()?;
        if !command.is_maintenance() {
            return Err(ProtocolError::Validation(format!(
                "{:?} carries a payload",
                command
            )));
        }

        let ack = match command {
            Command::ScanSensors => AckLength::UpTo(MAX_FRAME_SIZE),
            c if c.expects_ack() => AckLength::Exact(ENVELOPE_SIZE),
            _ => AckLength::None,
        };

        Ok(Request {
            command,
            device_id: table.device_id(),
            bytes: PacketBuilder::new(table, command).build()?,
            ack,
            indices: Vec::new(),
        })
    }

    /// Build a WRITE that moves the driver to `new_id`
    ///
    /// The table is left untouched; re-registering the driver under its new
    /// ID is up to the caller.
    pub fn update_device_id(table: &RegisterTable, new_id: u8) -> Result<Request, ProtocolError> {
        validate_device_id(new_id)?;

        let bytes = PacketBuilder::new(table, Command::Write)
            .register(Index::DeviceId, &RegisterValue::U8(new_id))
            .build()?;

        Ok(Request {
            command: Command::Write,
            device_id: table.device_id(),
            bytes,
            ack: AckLength::None,
            indices: vec![Index::DeviceId],
        })
    }
}

/// Reject the broadcast sentinel where an individual driver is required
pub fn validate_device_id(id: u8) -> Result<(), ProtocolError> {
    if id > MAX_DEVICE_ID {
        return Err(ProtocolError::Validation(format!(
            "{} is not a valid device ID (0..={})",
            id, MAX_DEVICE_ID
        )));
    }
    Ok(())
}
