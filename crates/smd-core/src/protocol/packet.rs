//! Frame encoding/decoding
//!
//! Frame format (all integers little-endian):
//! - 1 byte: marker (0x55)
//! - 1 byte: device ID
//! - 1 byte: product type
//! - 1 byte: total frame size, CRC included
//! - 1 byte: command opcode
//! - 1 byte: status
//! - N bytes: command-specific payload
//! - 4 bytes: CRC32/MPEG-2 over every preceding byte

use byteorder::{ByteOrder, LittleEndian};
use crc::{Crc, CRC_32_MPEG_2};

use super::{Command, ProtocolError, CRC_SIZE, ENVELOPE_SIZE, HEADER, HEADER_SIZE, MAX_FRAME_SIZE};
use crate::register::{Index, RegisterError, RegisterTable, RegisterValue};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// CRC32/MPEG-2 of `data`
pub fn checksum(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}

/// The fixed six-byte frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame marker, always 0x55 on a valid frame
    pub marker: u8,
    /// Addressed (or answering) device
    pub device_id: u8,
    /// Product/family identifier
    pub product_type: u8,
    /// Total frame length in bytes
    pub size: u8,
    /// Raw command opcode
    pub command: u8,
    /// Status byte
    pub status: u8,
}

impl FrameHeader {
    fn parse(data: &[u8]) -> Self {
        Self {
            marker: data[0],
            device_id: data[1],
            product_type: data[2],
            size: data[3],
            command: data[4],
            status: data[5],
        }
    }
}

/// A validated protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Header fields
    pub header: FrameHeader,
    /// Raw payload between the header and the CRC
    pub payload: Vec<u8>,
    /// Trailing CRC
    pub crc: u32,
}

impl Frame {
    /// Validate a received frame against the length the caller expects
    ///
    /// The transport has no delimiter, so `expected_len` comes from the
    /// request that solicited this frame rather than from the frame itself.
    pub fn decode_and_validate(data: &[u8], expected_len: usize) -> Result<Self, ProtocolError> {
        if data.len() != expected_len {
            return Err(ProtocolError::LengthMismatch {
                expected: expected_len,
                actual: data.len(),
            });
        }

        if data.len() < ENVELOPE_SIZE {
            return Err(ProtocolError::LengthMismatch {
                expected: ENVELOPE_SIZE,
                actual: data.len(),
            });
        }

        let header = FrameHeader::parse(data);
        if header.size as usize != data.len() {
            return Err(ProtocolError::LengthMismatch {
                expected: header.size as usize,
                actual: data.len(),
            });
        }

        let body_len = data.len() - CRC_SIZE;
        let received_crc = LittleEndian::read_u32(&data[body_len..]);
        let expected_crc = checksum(&data[..body_len]);
        if received_crc != expected_crc {
            return Err(ProtocolError::ChecksumMismatch {
                expected: expected_crc,
                actual: received_crc,
            });
        }

        if header.marker != HEADER {
            return Err(ProtocolError::InvalidResponse);
        }

        Ok(Self {
            header,
            payload: data[HEADER_SIZE..body_len].to_vec(),
            crc: received_crc,
        })
    }

    /// Validate a frame whose length is only known from its own size byte
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        let claimed = data.get(3).copied().unwrap_or(0) as usize;
        Self::decode_and_validate(data, claimed)
    }

    /// Decoded command, if the opcode is known
    pub fn command(&self) -> Option<Command> {
        Command::from_opcode(self.header.command)
    }

    /// True when the frame carries more than the bare header and CRC
    pub fn has_data(&self) -> bool {
        self.header.size as usize > ENVELOPE_SIZE
    }

    /// Split the payload into (index, value) pairs
    pub fn register_pairs(&self) -> Result<Vec<(Index, RegisterValue)>, RegisterError> {
        decode_pairs(&self.payload)
    }

    /// Re-encode the frame
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_size());
        bytes.extend_from_slice(&[
            self.header.marker,
            self.header.device_id,
            self.header.product_type,
            self.header.size,
            self.header.command,
            self.header.status,
        ]);
        bytes.extend_from_slice(&self.payload);
        bytes.extend_from_slice(&self.crc.to_le_bytes());
        bytes
    }

    /// Get the total encoded size
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + self.payload.len() + CRC_SIZE
    }
}

/// Decode a run of (index byte, sized value) pairs
pub fn decode_pairs(payload: &[u8]) -> Result<Vec<(Index, RegisterValue)>, RegisterError> {
    let mut pairs = Vec::new();
    let mut i = 0;

    while i < payload.len() {
        let index = Index::try_from(payload[i])?;
        let value = index.encoding().decode(&payload[i + 1..])?;
        pairs.push((index, value));
        i += 1 + index.byte_width();
    }

    Ok(pairs)
}

/// Builder for constructing frames
///
/// Header fields come from the addressed driver's register table; the size
/// byte and CRC are filled in by [`PacketBuilder::build`].
pub struct PacketBuilder {
    bytes: Vec<u8>,
}

impl PacketBuilder {
    /// Start a frame for `command` addressed with `table`'s header registers
    pub fn new(table: &RegisterTable, command: Command) -> Self {
        let mut bytes = Vec::with_capacity(MAX_FRAME_SIZE);
        for index in [
            Index::Header,
            Index::DeviceId,
            Index::DeviceFamily,
            Index::PackageSize,
        ] {
            table.get(index).write_le(&mut bytes);
        }
        bytes.push(command.opcode());
        table.get(Index::Status).write_le(&mut bytes);
        Self { bytes }
    }

    /// Add a single byte
    pub fn byte(mut self, b: u8) -> Self {
        self.bytes.push(b);
        self
    }

    /// Add a register value in its wire encoding
    pub fn value(mut self, value: &RegisterValue) -> Self {
        value.write_le(&mut self.bytes);
        self
    }

    /// Add an (index, value) pair
    pub fn register(self, index: Index, value: &RegisterValue) -> Self {
        self.byte(index.ordinal()).value(value)
    }

    /// Add raw bytes
    pub fn bytes(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    /// Patch the size byte and append the CRC
    pub fn build(mut self) -> Result<Vec<u8>, ProtocolError> {
        let total = self.bytes.len() + CRC_SIZE;
        if total > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge(total));
        }

        self.bytes[Index::PackageSize as usize] = total as u8;
        let crc = checksum(&self.bytes);
        self.bytes.extend_from_slice(&crc.to_le_bytes());
        Ok(self.bytes)
    }
}

/// Encode a frame for `table` with a raw payload
pub fn encode(table: &RegisterTable, command: Command, payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    PacketBuilder::new(table, command).bytes(payload).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_frame_layout() {
        let table = RegisterTable::new(5);
        let bytes = encode(&table, Command::Ping, &[]).unwrap();

        assert_eq!(bytes.len(), ENVELOPE_SIZE);
        assert_eq!(&bytes[..6], &[0x55, 5, 0xBA, 10, Command::Ping.opcode(), 0]);
        let crc = LittleEndian::read_u32(&bytes[6..]);
        assert_eq!(crc, checksum(&bytes[..6]));
    }

    #[test]
    fn test_packet_roundtrip() {
        let table = RegisterTable::new(12);
        let payload = [Index::SetPosition.ordinal(), 0, 0, 0x80, 0x3F];
        let encoded = encode(&table, Command::Write, &payload).unwrap();
        let decoded = Frame::decode_and_validate(&encoded, encoded.len()).expect("Should decode successfully");

        assert_eq!(decoded.header.device_id, 12);
        assert_eq!(decoded.header.size as usize, encoded.len());
        assert_eq!(decoded.command(), Some(Command::Write));
        assert_eq!(decoded.payload, payload.to_vec());
        assert_eq!(decoded.to_bytes(), encoded);
    }

    #[test]
    fn test_crc_known_vector() {
        // CRC-32/MPEG-2 check value
        assert_eq!(checksum(b"123456789"), 0x0376E6E7);
    }

    #[test]
    fn test_crc_verification() {
        let table = RegisterTable::new(1);
        let mut encoded = encode(&table, Command::Read, &[6, 7]).unwrap();

        // Corrupt a payload byte
        encoded[6] ^= 0xFF;

        let err = Frame::decode_and_validate(&encoded, encoded.len()).unwrap_err();
        assert!(matches!(err, ProtocolError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_short_read_is_length_mismatch() {
        let table = RegisterTable::new(1);
        let encoded = encode(&table, Command::Ping, &[]).unwrap();

        let err = Frame::decode_and_validate(&encoded[..7], encoded.len()).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::LengthMismatch {
                expected: 10,
                actual: 7
            }
        ));
    }

    #[test]
    fn test_size_byte_disagreement() {
        let table = RegisterTable::new(1);
        let mut encoded = encode(&table, Command::Ping, &[]).unwrap();
        encoded[3] = 11;

        let err = Frame::decode_and_validate(&encoded, encoded.len()).unwrap_err();
        assert!(matches!(err, ProtocolError::LengthMismatch { .. }));
    }

    #[test]
    fn test_frame_too_large() {
        let table = RegisterTable::new(1);
        let payload = vec![0u8; 246];
        assert!(matches!(
            encode(&table, Command::Write, &payload),
            Err(ProtocolError::FrameTooLarge(256))
        ));
        assert!(encode(&table, Command::Write, &payload[..245]).is_ok());
    }

    #[test]
    fn test_decode_pairs() {
        let mut payload = vec![Index::TorqueLimit.ordinal(), 0x10, 0x27];
        payload.push(Index::MinimumPositionLimit.ordinal());
        payload.extend_from_slice(&(-10i32).to_le_bytes());

        let pairs = decode_pairs(&payload).unwrap();
        assert_eq!(
            pairs,
            vec![
                (Index::TorqueLimit, RegisterValue::U16(10000)),
                (Index::MinimumPositionLimit, RegisterValue::I32(-10)),
            ]
        );
    }

    #[test]
    fn test_decode_pairs_rejects_garbage() {
        assert_eq!(decode_pairs(&[150, 0]), Err(RegisterError::UnknownIndex(150)));
        assert!(matches!(
            decode_pairs(&[Index::Baudrate.ordinal(), 1, 2]),
            Err(RegisterError::Truncated { .. })
        ));
    }
}
